//! Storage ids for federated users.
//!
//! Federated users are addressed as `f:<component id>:<external id>`.
//! Anything without the `f:` prefix is a local user id.

use std::fmt;

const FEDERATED_PREFIX: &str = "f:";

/// A parsed user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageId {
    provider_id: Option<String>,
    external_id: String,
}

impl StorageId {
    /// Creates a storage id for a user owned by `provider_id`.
    #[must_use]
    pub fn new(provider_id: impl Into<String>, external_id: impl Into<String>) -> Self {
        Self {
            provider_id: Some(provider_id.into()),
            external_id: external_id.into(),
        }
    }

    /// Parses a user id.
    ///
    /// The external id is everything after the second colon, so it may
    /// itself contain colons.
    #[must_use]
    pub fn parse(id: &str) -> Self {
        if let Some(rest) = id.strip_prefix(FEDERATED_PREFIX) {
            if let Some((provider, external)) = rest.split_once(':') {
                return Self {
                    provider_id: Some(provider.to_string()),
                    external_id: external.to_string(),
                };
            }
        }
        Self {
            provider_id: None,
            external_id: id.to_string(),
        }
    }

    /// Returns the external part of a user id.
    #[must_use]
    pub fn external_id_of(id: &str) -> String {
        Self::parse(id).external_id
    }

    /// Returns the owning provider, if the id is federated.
    #[must_use]
    pub fn provider_id(&self) -> Option<&str> {
        self.provider_id.as_deref()
    }

    /// Returns the id inside the external store.
    #[must_use]
    pub fn external_id(&self) -> &str {
        &self.external_id
    }

    /// Returns true for ids of local users.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.provider_id.is_none()
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.provider_id {
            Some(provider) => write!(f, "{FEDERATED_PREFIX}{provider}:{}", self.external_id),
            None => f.write_str(&self.external_id),
        }
    }
}
