//! Provider configuration.
//!
//! The host stores a component's settings as a flat string map
//! ([`FederationConfig::config`]). [`ProviderConfig::from_component`] reads
//! the well-known [`keys`] out of it and validates them once, at
//! configuration time:
//!
//! - every query template must be present and not blank
//! - every template must bind exactly as many `?` markers as its caller
//!   supplies
//! - the database type and hash function must be known
//!
//! A configuration that passes is immutable and shared by every provider
//! instance of the component.

use std::time::Duration;

use kc_federation::FederationConfig;
use serde::{Deserialize, Serialize, Serializer};
use url::Url;

use crate::credential::PasswordScheme;
use crate::dialect::Rdbms;
use crate::error::{SqlFederationError, SqlResult};
use crate::paging::count_placeholders;

/// Configuration keys in the component settings map.
pub mod keys {
    /// Connection URL.
    pub const URL: &str = "url";
    /// Database user.
    pub const USER: &str = "user";
    /// Database password.
    pub const PASSWORD: &str = "password";
    /// Database type, by description.
    pub const RDBMS: &str = "rdbms";
    /// Whether the host may delete federated users.
    pub const ALLOW_LOCAL_DELETE: &str = "allowKeycloakDelete";
    /// Whether database values may overwrite cached users.
    pub const ALLOW_DATABASE_OVERWRITE: &str = "allowDatabaseToOverwriteKeycloak";
    /// Total user count.
    pub const COUNT: &str = "count";
    /// Every user.
    pub const LIST_ALL: &str = "listAll";
    /// User by id.
    pub const FIND_BY_ID: &str = "findById";
    /// User by username.
    pub const FIND_BY_USERNAME: &str = "findByUsername";
    /// User by username or email.
    pub const FIND_BY_USERNAME_OR_EMAIL: &str = "findByUsernameOrEmail";
    /// Users matching a search term.
    pub const FIND_BY_SEARCH_TERM: &str = "findBySearchTerm";
    /// Hash and salt by username or email.
    pub const FIND_PASSWORD_HASH: &str = "findPasswordHash";
    /// Hash and salt by username.
    pub const FIND_PASSWORD_HASH_USERNAME_ONLY: &str = "findPasswordHashUsernameOnly";
    /// Writes hash, salt for a username.
    pub const UPDATE_CREDENTIALS: &str = "updateCredentials";
    /// Writes the email for a username.
    pub const UPDATE_EMAIL_ADDRESS: &str = "updateEmailAddress";
    /// Password hash function name.
    pub const HASH_FUNCTION: &str = "hashFunction";
    /// Pool size upper bound.
    pub const MAX_CONNECTIONS: &str = "maxConnections";
    /// Pool size lower bound.
    pub const MIN_CONNECTIONS: &str = "minConnections";
}

/// Hash function names offered to operators.
pub const HASH_FUNCTIONS: [&str; 13] = [
    "Argon2id (PHC)",
    "MD2",
    "MD5",
    "SHA-1",
    "SHA-256",
    "SHA3-224",
    "SHA3-256",
    "SHA3-384",
    "SHA3-512",
    "SHA-384",
    "SHA-512/224",
    "SHA-512/256",
    "SHA-512",
];

/// Hash function used when none is configured.
pub const DEFAULT_HASH_FUNCTION: &str = "SHA-512";

// Bound parameters per template. Validated exactly.
const TEMPLATE_PARAMS: [(&str, usize); 10] = [
    (keys::COUNT, 0),
    (keys::LIST_ALL, 0),
    (keys::FIND_BY_ID, 1),
    (keys::FIND_BY_USERNAME, 1),
    (keys::FIND_BY_USERNAME_OR_EMAIL, 1),
    (keys::FIND_BY_SEARCH_TERM, 1),
    (keys::FIND_PASSWORD_HASH, 1),
    (keys::FIND_PASSWORD_HASH_USERNAME_ONLY, 1),
    (keys::UPDATE_CREDENTIALS, 3),
    (keys::UPDATE_EMAIL_ADDRESS, 2),
];

// ============================================================================
// Query Templates
// ============================================================================

/// The operator's SQL templates and the settings that go with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfigurations {
    count: String,
    list_all: String,
    find_by_id: String,
    find_by_username: String,
    find_by_username_or_email: String,
    find_by_search_term: String,
    find_password_hash: String,
    find_password_hash_username_only: String,
    update_credentials: String,
    update_email_address: String,
    rdbms: Rdbms,
    hash_function: String,
    password_scheme: PasswordScheme,
    allow_local_delete: bool,
    allow_database_overwrite: bool,
}

impl QueryConfigurations {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> QueryConfigurationsBuilder {
        QueryConfigurationsBuilder::default()
    }

    /// Total user count; no parameters.
    #[must_use]
    pub fn count(&self) -> &str {
        &self.count
    }

    /// Every user; no parameters.
    #[must_use]
    pub fn list_all(&self) -> &str {
        &self.list_all
    }

    /// User by id; binds the id.
    #[must_use]
    pub fn find_by_id(&self) -> &str {
        &self.find_by_id
    }

    /// User by username; binds the username.
    #[must_use]
    pub fn find_by_username(&self) -> &str {
        &self.find_by_username
    }

    /// User by username or email; binds the login name.
    #[must_use]
    pub fn find_by_username_or_email(&self) -> &str {
        &self.find_by_username_or_email
    }

    /// Users matching a term; binds the term.
    #[must_use]
    pub fn find_by_search_term(&self) -> &str {
        &self.find_by_search_term
    }

    /// Hash and salt by login name; binds the login name.
    #[must_use]
    pub fn find_password_hash(&self) -> &str {
        &self.find_password_hash
    }

    /// Hash and salt by username; binds the username.
    #[must_use]
    pub fn find_password_hash_username_only(&self) -> &str {
        &self.find_password_hash_username_only
    }

    /// Credential write; binds hash, salt, username.
    #[must_use]
    pub fn update_credentials(&self) -> &str {
        &self.update_credentials
    }

    /// Email write; binds email, username.
    #[must_use]
    pub fn update_email_address(&self) -> &str {
        &self.update_email_address
    }

    /// The database type.
    #[must_use]
    pub const fn rdbms(&self) -> Rdbms {
        self.rdbms
    }

    /// The configured hash function name.
    #[must_use]
    pub fn hash_function(&self) -> &str {
        &self.hash_function
    }

    /// The scheme resolved from the hash function name.
    #[must_use]
    pub const fn password_scheme(&self) -> PasswordScheme {
        self.password_scheme
    }

    /// Whether the host may delete federated users.
    #[must_use]
    pub const fn allow_local_delete(&self) -> bool {
        self.allow_local_delete
    }

    /// Whether database values may overwrite cached users.
    #[must_use]
    pub const fn allow_database_overwrite(&self) -> bool {
        self.allow_database_overwrite
    }
}

/// Builder for [`QueryConfigurations`].
#[derive(Debug, Clone, Default)]
pub struct QueryConfigurationsBuilder {
    templates: Vec<(&'static str, String)>,
    rdbms: Option<Rdbms>,
    hash_function: Option<String>,
    allow_local_delete: bool,
    allow_database_overwrite: bool,
}

impl QueryConfigurationsBuilder {
    /// Sets a template by its configuration key.
    ///
    /// Keys outside [`keys`] are ignored by [`Self::build`].
    #[must_use]
    pub fn template(mut self, key: &'static str, sql: impl Into<String>) -> Self {
        self.templates.retain(|(k, _)| *k != key);
        self.templates.push((key, sql.into()));
        self
    }

    /// Sets the count template.
    #[must_use]
    pub fn count(self, sql: impl Into<String>) -> Self {
        self.template(keys::COUNT, sql)
    }

    /// Sets the list-all template.
    #[must_use]
    pub fn list_all(self, sql: impl Into<String>) -> Self {
        self.template(keys::LIST_ALL, sql)
    }

    /// Sets the find-by-id template.
    #[must_use]
    pub fn find_by_id(self, sql: impl Into<String>) -> Self {
        self.template(keys::FIND_BY_ID, sql)
    }

    /// Sets the find-by-username template.
    #[must_use]
    pub fn find_by_username(self, sql: impl Into<String>) -> Self {
        self.template(keys::FIND_BY_USERNAME, sql)
    }

    /// Sets the find-by-username-or-email template.
    #[must_use]
    pub fn find_by_username_or_email(self, sql: impl Into<String>) -> Self {
        self.template(keys::FIND_BY_USERNAME_OR_EMAIL, sql)
    }

    /// Sets the search template.
    #[must_use]
    pub fn find_by_search_term(self, sql: impl Into<String>) -> Self {
        self.template(keys::FIND_BY_SEARCH_TERM, sql)
    }

    /// Sets the credential lookup template.
    #[must_use]
    pub fn find_password_hash(self, sql: impl Into<String>) -> Self {
        self.template(keys::FIND_PASSWORD_HASH, sql)
    }

    /// Sets the username-only credential lookup template.
    #[must_use]
    pub fn find_password_hash_username_only(self, sql: impl Into<String>) -> Self {
        self.template(keys::FIND_PASSWORD_HASH_USERNAME_ONLY, sql)
    }

    /// Sets the credential write template.
    #[must_use]
    pub fn update_credentials(self, sql: impl Into<String>) -> Self {
        self.template(keys::UPDATE_CREDENTIALS, sql)
    }

    /// Sets the email write template.
    #[must_use]
    pub fn update_email_address(self, sql: impl Into<String>) -> Self {
        self.template(keys::UPDATE_EMAIL_ADDRESS, sql)
    }

    /// Sets the database type.
    #[must_use]
    pub const fn rdbms(mut self, rdbms: Rdbms) -> Self {
        self.rdbms = Some(rdbms);
        self
    }

    /// Sets the hash function name.
    #[must_use]
    pub fn hash_function(mut self, name: impl Into<String>) -> Self {
        self.hash_function = Some(name.into());
        self
    }

    /// Sets whether the host may delete federated users.
    #[must_use]
    pub const fn allow_local_delete(mut self, allow: bool) -> Self {
        self.allow_local_delete = allow;
        self
    }

    /// Sets whether database values may overwrite cached users.
    #[must_use]
    pub const fn allow_database_overwrite(mut self, allow: bool) -> Self {
        self.allow_database_overwrite = allow;
        self
    }

    /// Validates and builds the template set.
    ///
    /// # Errors
    ///
    /// - [`SqlFederationError::MissingQuery`] for an absent or blank template
    /// - [`SqlFederationError::PlaceholderCount`] for a template whose `?`
    ///   count differs from what its caller binds
    /// - [`SqlFederationError::Configuration`] if no database type was set
    /// - [`SqlFederationError::UnsupportedAlgorithm`] for an unusable hash
    ///   function
    pub fn build(mut self) -> SqlResult<QueryConfigurations> {
        for (name, expected) in TEMPLATE_PARAMS {
            let sql = self.lookup(name).ok_or(SqlFederationError::MissingQuery(name))?;
            let actual = count_placeholders(sql);
            if actual != expected {
                return Err(SqlFederationError::PlaceholderCount {
                    query: name,
                    expected,
                    actual,
                });
            }
        }

        let rdbms = self
            .rdbms
            .ok_or_else(|| SqlFederationError::config("database type is required"))?;

        let hash_function = self
            .hash_function
            .take()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HASH_FUNCTION.to_string());
        let password_scheme = PasswordScheme::from_name(hash_function.trim())?;

        Ok(QueryConfigurations {
            count: self.take(keys::COUNT),
            list_all: self.take(keys::LIST_ALL),
            find_by_id: self.take(keys::FIND_BY_ID),
            find_by_username: self.take(keys::FIND_BY_USERNAME),
            find_by_username_or_email: self.take(keys::FIND_BY_USERNAME_OR_EMAIL),
            find_by_search_term: self.take(keys::FIND_BY_SEARCH_TERM),
            find_password_hash: self.take(keys::FIND_PASSWORD_HASH),
            find_password_hash_username_only: self.take(keys::FIND_PASSWORD_HASH_USERNAME_ONLY),
            update_credentials: self.take(keys::UPDATE_CREDENTIALS),
            update_email_address: self.take(keys::UPDATE_EMAIL_ADDRESS),
            rdbms,
            hash_function,
            password_scheme,
            allow_local_delete: self.allow_local_delete,
            allow_database_overwrite: self.allow_database_overwrite,
        })
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        self.templates
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, sql)| sql.trim())
            .filter(|sql| !sql.is_empty())
    }

    fn take(&mut self, key: &str) -> String {
        self.templates
            .iter()
            .position(|(k, _)| *k == key)
            .map(|at| self.templates.swap_remove(at).1.trim().to_string())
            .unwrap_or_default()
    }
}

// ============================================================================
// Connection Settings
// ============================================================================

/// How to reach the external database.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    /// Connection URL, e.g. `postgres://db.example.com/customers`.
    pub url: String,
    /// Database user, merged into the URL.
    pub user: Option<String>,
    /// Database password, merged into the URL.
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Maximum number of pooled connections.
    pub max_connections: u32,
    /// Connections kept open while idle.
    pub min_connections: u32,
    /// How long to wait for a connection.
    #[serde(serialize_with = "as_secs")]
    pub connect_timeout: Duration,
    /// How long an unused connection is kept.
    #[serde(serialize_with = "as_secs")]
    pub idle_timeout: Duration,
    /// Maximum age of a connection.
    #[serde(serialize_with = "as_secs")]
    pub max_lifetime: Duration,
}

impl ConnectionSettings {
    /// Creates settings for a URL with default pool sizing.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            password: None,
            max_connections: 10,
            min_connections: 0,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }

    /// Sets the database user and password.
    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the maximum number of connections.
    #[must_use]
    pub const fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    #[must_use]
    pub const fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the URL to connect with.
    ///
    /// The configured user and password are merged into URLs that have a
    /// host and no user of their own.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL does not parse.
    pub fn connection_url(&self) -> SqlResult<String> {
        let mut url = Url::parse(self.url.trim())
            .map_err(|e| SqlFederationError::config(format!("invalid connection URL: {e}")))?;

        let Some(user) = self.user.as_deref().filter(|u| !u.is_empty()) else {
            return Ok(url.into());
        };
        if !url.has_host() || !url.username().is_empty() {
            return Ok(url.into());
        }

        url.set_username(user)
            .map_err(|()| SqlFederationError::config("connection URL cannot carry a user"))?;
        url.set_password(self.password.as_deref().filter(|p| !p.is_empty()))
            .map_err(|()| SqlFederationError::config("connection URL cannot carry a password"))?;
        Ok(url.into())
    }
}

impl std::fmt::Debug for ConnectionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSettings")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

fn as_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Everything a provider instance needs, read from a component.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// The validated templates.
    pub queries: QueryConfigurations,
    /// Pool settings.
    pub connection: ConnectionSettings,
}

impl ProviderConfig {
    /// Reads and validates a component's settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a missing URL, an unknown database
    /// type or hash function, or an invalid template.
    pub fn from_component(model: &FederationConfig) -> SqlResult<Self> {
        let url = model
            .get(keys::URL)
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SqlFederationError::config("connection URL is required"))?;

        let rdbms = model
            .get(keys::RDBMS)
            .map(str::trim)
            .filter(|description| !description.is_empty())
            .ok_or_else(|| SqlFederationError::config("database type is required"))
            .and_then(Rdbms::parse)?;

        let mut builder = QueryConfigurations::builder()
            .rdbms(rdbms)
            .allow_local_delete(model.get_bool(keys::ALLOW_LOCAL_DELETE).unwrap_or(false))
            .allow_database_overwrite(
                model
                    .get_bool(keys::ALLOW_DATABASE_OVERWRITE)
                    .unwrap_or(false),
            );
        for (key, _) in TEMPLATE_PARAMS {
            if let Some(sql) = model.get(key) {
                builder = builder.template(key, sql);
            }
        }
        if let Some(name) = model.get(keys::HASH_FUNCTION) {
            builder = builder.hash_function(name);
        }
        let queries = builder.build()?;

        let mut connection = ConnectionSettings::new(url).connect_timeout(model.connection_timeout);
        connection.user = model.get(keys::USER).map(ToString::to_string);
        connection.password = model.get(keys::PASSWORD).map(ToString::to_string);
        if let Some(max) = model.get_u32(keys::MAX_CONNECTIONS) {
            connection.max_connections = max.max(1);
        }
        if let Some(min) = model.get_u32(keys::MIN_CONNECTIONS) {
            connection.min_connections = min.min(connection.max_connections);
        }

        Ok(Self {
            queries,
            connection,
        })
    }
}
