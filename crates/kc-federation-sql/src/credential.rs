//! Password credentials stored in the external database.
//!
//! Two schemes are supported, chosen by the configured hash function name:
//!
//! - **Iterated digest**: `hash = HEX(digest(password + salt))`, then
//!   `hash = HEX(digest(hash + salt))` for [`HASH_ITERATIONS`] more rounds.
//!   Hex is uppercase, the salt is [`SALT_LENGTH`] random bytes in standard
//!   base64, and verification is an exact string comparison.
//! - **Argon2id**: the hash column holds a PHC string carrying its own salt
//!   and parameters; the salt column is written empty.
//!
//! ## Security
//!
//! Passwords, hashes and salts are never logged.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use kc_crypto::{hex_digest_upper, random_base64, random_bytes, DigestAlgorithm};
use serde::{Deserialize, Serialize};

use crate::error::{SqlFederationError, SqlResult};

/// Extra digest rounds applied after the first one.
pub const HASH_ITERATIONS: usize = 1024;

/// Random salt length in bytes, before base64 encoding.
pub const SALT_LENGTH: usize = 16;

/// Case-insensitive marker that selects Argon2 in a hash function name.
pub const ARGON2_MARKER: &str = "argon2";

// OWASP minimums for Argon2id.
const ARGON2_MEMORY_KIB: u32 = 19 * 1024;
const ARGON2_TIME_COST: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;

/// How passwords are hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PasswordScheme {
    /// Iterated salted digest with the given algorithm.
    IteratedDigest(DigestAlgorithm),
    /// Argon2id PHC strings.
    Argon2,
}

impl Default for PasswordScheme {
    fn default() -> Self {
        Self::IteratedDigest(DigestAlgorithm::Sha512)
    }
}

impl PasswordScheme {
    /// Resolves a configured hash function name.
    ///
    /// # Errors
    ///
    /// Returns [`SqlFederationError::UnsupportedAlgorithm`] for names with no
    /// digest implementation.
    pub fn from_name(name: &str) -> SqlResult<Self> {
        if name.to_ascii_lowercase().contains(ARGON2_MARKER) {
            return Ok(Self::Argon2);
        }
        Ok(Self::IteratedDigest(DigestAlgorithm::from_name(name)?))
    }

    /// Hashes a password with a fresh salt.
    ///
    /// # Errors
    ///
    /// Returns [`SqlFederationError::Credential`] if Argon2 hashing fails.
    pub fn generate(self, password: &str) -> SqlResult<CredentialRecord> {
        match self {
            Self::IteratedDigest(algorithm) => {
                let salt = random_base64(SALT_LENGTH);
                let hash = iterated_digest(algorithm, password, &salt);
                Ok(CredentialRecord { hash, salt })
            }
            Self::Argon2 => {
                let salt = SaltString::encode_b64(&random_bytes(SALT_LENGTH))
                    .map_err(|e| SqlFederationError::Credential(e.to_string()))?;
                let hash = argon2_hasher()?
                    .hash_password(password.as_bytes(), &salt)
                    .map_err(|e| SqlFederationError::Credential(e.to_string()))?;
                Ok(CredentialRecord {
                    hash: hash.to_string(),
                    salt: String::new(),
                })
            }
        }
    }

    /// Checks a password against a stored hash and salt.
    ///
    /// An empty stored hash never validates.
    #[must_use]
    pub fn validate(self, password: &str, salt: &str, stored_hash: &str) -> bool {
        if stored_hash.is_empty() {
            return false;
        }
        match self {
            Self::IteratedDigest(algorithm) => {
                iterated_digest(algorithm, password, salt) == stored_hash
            }
            Self::Argon2 => match PasswordHash::new(stored_hash) {
                Ok(parsed) => Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok(),
                Err(e) => {
                    tracing::warn!(error = %e, "Stored Argon2 hash is not a PHC string");
                    false
                }
            },
        }
    }
}

/// A stored password: hash and salt as written to the database.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Encoded hash.
    pub hash: String,
    /// Encoded salt; empty for self-salting schemes.
    pub salt: String,
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("hash", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .finish()
    }
}

fn iterated_digest(algorithm: DigestAlgorithm, password: &str, salt: &str) -> String {
    let mut hash = hex_digest_upper(algorithm, format!("{password}{salt}").as_bytes());
    for _ in 0..HASH_ITERATIONS {
        hash.push_str(salt);
        hash = hex_digest_upper(algorithm, hash.as_bytes());
    }
    hash
}

fn argon2_hasher() -> SqlResult<Argon2<'static>> {
    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_TIME_COST, ARGON2_PARALLELISM, None)
        .map_err(|e| SqlFederationError::Credential(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}
