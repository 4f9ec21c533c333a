//! SQL federation error types.
//!
//! Errors fall into the categories the provider treats differently:
//!
//! - configuration problems stop an instance from being created
//! - transient execution failures ([`SqlFederationError::is_transient`]) are
//!   logged and read as "no data"
//! - row mapping and algorithm errors propagate to the caller
//!
//! ## Security Note
//!
//! Error messages must not carry passwords, hashes or salts.

use kc_crypto::AlgorithmError;
use kc_federation::FederationError;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// SQL federation errors.
#[derive(Debug, Error)]
pub enum SqlFederationError {
    /// Invalid configuration.
    #[error("SQL provider configuration error: {0}")]
    Configuration(String),

    /// The configured database type is not one of the supported dialects.
    #[error("Unknown database type: {0}")]
    UnknownDialect(String),

    /// A required query template is missing or blank.
    #[error("Query '{0}' is required")]
    MissingQuery(&'static str),

    /// A query template has the wrong number of `?` placeholders.
    #[error("Query '{query}' must contain {expected} placeholder(s), found {actual}")]
    PlaceholderCount {
        /// Template name.
        query: &'static str,
        /// Placeholders the caller binds.
        expected: usize,
        /// Placeholders found in the template.
        actual: usize,
    },

    /// The configured hash algorithm cannot be used.
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Connection could not be established or the pool is unusable.
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Connection acquisition or statement execution timed out.
    #[error("Database operation timed out")]
    Timeout,

    /// Statement execution failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// A statement was bound with the wrong number of parameters.
    #[error("Statement expects {expected} parameter(s), {actual} bound")]
    ParameterCount {
        /// Placeholders in the statement.
        expected: usize,
        /// Parameters supplied.
        actual: usize,
    },

    /// Result rows do not fit the expected shape.
    #[error("Failed to read directory data: {0}")]
    DirectoryRead(String),

    /// Credential could not be generated.
    #[error("Credential error: {0}")]
    Credential(String),
}

impl SqlFederationError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a directory read error.
    #[must_use]
    pub fn read(msg: impl Into<String>) -> Self {
        Self::DirectoryRead(msg.into())
    }

    /// Returns true for failures a caller should treat as "no data".
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout | Self::Query(_))
    }

    /// Returns true for errors raised while validating configuration.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::UnknownDialect(_)
                | Self::MissingQuery(_)
                | Self::PlaceholderCount { .. }
        )
    }
}

/// Result type for SQL federation operations.
pub type SqlResult<T> = Result<T, SqlFederationError>;

/// Converts a `SQLx` error to a SQL federation error.
#[allow(clippy::needless_pass_by_value)]
pub fn from_sqlx_error(err: SqlxError) -> SqlFederationError {
    match err {
        SqlxError::PoolTimedOut => SqlFederationError::Timeout,
        SqlxError::PoolClosed => {
            SqlFederationError::Connection("Connection pool closed".to_string())
        }
        SqlxError::Io(_) | SqlxError::Tls(_) | SqlxError::Configuration(_) => {
            SqlFederationError::Connection(err.to_string())
        }
        SqlxError::Database(db_err) => SqlFederationError::Query(db_err.to_string()),
        SqlxError::ColumnDecode { .. }
        | SqlxError::Decode(_)
        | SqlxError::ColumnNotFound(_)
        | SqlxError::ColumnIndexOutOfBounds { .. }
        | SqlxError::TypeNotFound { .. } => SqlFederationError::DirectoryRead(err.to_string()),
        _ => SqlFederationError::Query(err.to_string()),
    }
}

impl From<SqlxError> for SqlFederationError {
    fn from(err: SqlxError) -> Self {
        from_sqlx_error(err)
    }
}

impl From<AlgorithmError> for SqlFederationError {
    fn from(err: AlgorithmError) -> Self {
        match err {
            AlgorithmError::Unknown(name) | AlgorithmError::Unsupported(name) => {
                Self::UnsupportedAlgorithm(name)
            }
        }
    }
}

impl From<SqlFederationError> for FederationError {
    fn from(err: SqlFederationError) -> Self {
        match err {
            SqlFederationError::Configuration(msg) => Self::Configuration(msg),
            SqlFederationError::UnknownDialect(_)
            | SqlFederationError::MissingQuery(_)
            | SqlFederationError::PlaceholderCount { .. } => Self::Configuration(err.to_string()),
            SqlFederationError::UnsupportedAlgorithm(_) | SqlFederationError::Credential(_) => {
                Self::Credential(err.to_string())
            }
            SqlFederationError::Connection(msg) => Self::Connection(msg),
            SqlFederationError::Timeout => Self::Timeout("SQL operation".to_string()),
            SqlFederationError::Query(msg) => Self::UserLookup(msg),
            SqlFederationError::ParameterCount { .. } => Self::Internal(err.to_string()),
            SqlFederationError::DirectoryRead(msg) => Self::AttributeMapping(msg),
        }
    }
}
