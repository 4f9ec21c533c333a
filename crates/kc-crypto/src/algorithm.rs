//! Message digest algorithm definitions.
//!
//! Names follow the Java Cryptography Architecture standard names
//! (`SHA-256`, `SHA3-512`, `SHA-512/224`, ...) because those are the names
//! operators find in existing user tables and configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for algorithm operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlgorithmError {
    /// Unknown algorithm.
    #[error("unknown algorithm: {0}")]
    Unknown(String),

    /// Algorithm is recognised but has no implementation.
    #[error("algorithm '{0}' is not supported")]
    Unsupported(String),
}

/// Message digest algorithms available for legacy password hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// MD5.
    #[serde(rename = "MD5")]
    Md5,

    /// SHA-1.
    #[serde(rename = "SHA-1")]
    Sha1,

    /// SHA-224.
    #[serde(rename = "SHA-224")]
    Sha224,

    /// SHA-256.
    #[serde(rename = "SHA-256")]
    Sha256,

    /// SHA-384.
    #[serde(rename = "SHA-384")]
    Sha384,

    /// SHA-512.
    #[serde(rename = "SHA-512")]
    Sha512,

    /// SHA-512 truncated to 224 bits.
    #[serde(rename = "SHA-512/224")]
    Sha512_224,

    /// SHA-512 truncated to 256 bits.
    #[serde(rename = "SHA-512/256")]
    Sha512_256,

    /// SHA3-224.
    #[serde(rename = "SHA3-224")]
    Sha3_224,

    /// SHA3-256.
    #[serde(rename = "SHA3-256")]
    Sha3_256,

    /// SHA3-384.
    #[serde(rename = "SHA3-384")]
    Sha3_384,

    /// SHA3-512.
    #[serde(rename = "SHA3-512")]
    Sha3_512,
}

impl DigestAlgorithm {
    /// All implemented digest algorithms.
    pub const ALL: [Self; 12] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha224,
        Self::Sha256,
        Self::Sha384,
        Self::Sha512,
        Self::Sha512_224,
        Self::Sha512_256,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
    ];

    /// Returns the standard algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
            Self::Sha512_224 => "SHA-512/224",
            Self::Sha512_256 => "SHA-512/256",
            Self::Sha3_224 => "SHA3-224",
            Self::Sha3_256 => "SHA3-256",
            Self::Sha3_384 => "SHA3-384",
            Self::Sha3_512 => "SHA3-512",
        }
    }

    /// Returns the output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha224 | Self::Sha512_224 | Self::Sha3_224 => 28,
            Self::Sha256 | Self::Sha512_256 | Self::Sha3_256 => 32,
            Self::Sha384 | Self::Sha3_384 => 48,
            Self::Sha512 | Self::Sha3_512 => 64,
        }
    }

    /// Resolves an algorithm from its name.
    ///
    /// Matching is case-insensitive. The hyphen-less spellings `SHA`,
    /// `SHA1`, `SHA224`, `SHA256`, `SHA384` and `SHA512` are accepted too.
    ///
    /// # Errors
    ///
    /// Returns [`AlgorithmError::Unsupported`] for `MD2`, which is a valid
    /// standard name without an implementation here, and
    /// [`AlgorithmError::Unknown`] for anything else.
    pub fn from_name(name: &str) -> Result<Self, AlgorithmError> {
        let normalized = name.trim().to_ascii_uppercase();
        let algorithm = match normalized.as_str() {
            "MD5" => Self::Md5,
            "SHA" | "SHA1" | "SHA-1" => Self::Sha1,
            "SHA224" | "SHA-224" => Self::Sha224,
            "SHA256" | "SHA-256" => Self::Sha256,
            "SHA384" | "SHA-384" => Self::Sha384,
            "SHA512" | "SHA-512" => Self::Sha512,
            "SHA-512/224" | "SHA512/224" => Self::Sha512_224,
            "SHA-512/256" | "SHA512/256" => Self::Sha512_256,
            "SHA3-224" => Self::Sha3_224,
            "SHA3-256" => Self::Sha3_256,
            "SHA3-384" => Self::Sha3_384,
            "SHA3-512" => Self::Sha3_512,
            "MD2" => return Err(AlgorithmError::Unsupported(name.to_string())),
            _ => return Err(AlgorithmError::Unknown(name.to_string())),
        };
        Ok(algorithm)
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = AlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
