//! Errors crossing the provider boundary.
//!
//! Providers convert their own failures into a [`FederationError`] before
//! handing them to the host. The categories decide what the host does
//! next: configuration errors are shown to the administrator, connection
//! errors are worth retrying, the rest fail the current request.

use thiserror::Error;

/// Failure reported by a federation provider.
#[derive(Debug, Error)]
pub enum FederationError {
    /// The component model is unusable.
    #[error("invalid provider configuration: {0}")]
    Configuration(String),

    /// The external store could not be reached.
    #[error("cannot reach user store: {0}")]
    Connection(String),

    /// The external store did not answer in time.
    #[error("user store timed out: {0}")]
    Timeout(String),

    /// The external store rejected a lookup or update.
    #[error("user store query failed: {0}")]
    UserLookup(String),

    /// A record could not be turned into a user.
    #[error("cannot map user record: {0}")]
    AttributeMapping(String),

    /// Credential hashing or verification failed.
    #[error("credential error: {0}")]
    Credential(String),

    /// The host's local user store failed.
    #[error("local store error: {0}")]
    Storage(String),

    /// A provider bug.
    #[error("internal provider error: {0}")]
    Internal(String),
}

impl FederationError {
    /// Creates a [`FederationError::Configuration`].
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a [`FederationError::Connection`].
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a [`FederationError::Storage`].
    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for failures a later retry may not hit.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }

    /// True if an administrator has to fix the component model.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result alias for provider operations.
pub type FederationResult<T> = Result<T, FederationError>;
