//! Credentials presented to federation providers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of credential a user presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialType {
    /// Password.
    Password,
    /// Time-based one-time code; stored under the name `otp`.
    #[serde(rename = "otp")]
    Totp,
}

impl CredentialType {
    /// Name the host stores credentials under.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Password => "password",
            Self::Totp => "otp",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A secret a user presented, tagged with its type.
///
/// The plaintext is kept private, left out of `Debug` and never serialized.
#[derive(Clone)]
pub struct CredentialInput {
    /// Type of the presented secret.
    pub credential_type: CredentialType,
    value: String,
}

impl CredentialInput {
    /// Wraps a presented secret.
    #[must_use]
    pub fn new(credential_type: CredentialType, value: impl Into<String>) -> Self {
        Self {
            credential_type,
            value: value.into(),
        }
    }

    /// Wraps a presented password.
    #[must_use]
    pub fn password(value: impl Into<String>) -> Self {
        Self::new(CredentialType::Password, value)
    }

    /// The plaintext secret.
    #[must_use]
    pub fn challenge_response(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInput")
            .field("credential_type", &self.credential_type)
            .finish_non_exhaustive()
    }
}
