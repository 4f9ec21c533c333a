//! Common test utilities and fixtures.
//!
//! Every fixture runs against its own in-memory SQLite database through the
//! sqlx `Any` driver, seeded with [`USER_COUNT`] users whose ids run from 1.

use std::sync::Arc;

use async_trait::async_trait;
use kc_federation::FederationConfig;
use kc_federation_sql::config::keys;
use kc_federation_sql::executor::QueryExecutor;
use kc_federation_sql::{
    ConnectionSettings, DataSource, QueryConfigurations, Rdbms, ResultSet, SqlResult,
    SqlxDataSource, UserRepository,
};
use uuid::Uuid;

/// Number of seeded users.
pub const USER_COUNT: usize = 100;

pub const COUNT: &str = "SELECT COUNT(*) FROM users";
pub const LIST_ALL: &str =
    "SELECT id, username, email, firstName, lastName, department FROM users ORDER BY id";
pub const LIST_ALL_UNORDERED: &str =
    "SELECT id, username, email, firstName, lastName, department FROM users";
pub const FIND_BY_ID: &str =
    "SELECT id, username, email, firstName, lastName, department FROM users WHERE id = ?";
pub const FIND_BY_USERNAME: &str =
    "SELECT id, username, email, firstName, lastName, department FROM users WHERE username = ?";
pub const FIND_BY_USERNAME_OR_EMAIL: &str =
    "SELECT id, username, email, firstName, lastName, department FROM users WHERE ? IN (username, email)";
pub const FIND_BY_SEARCH_TERM: &str =
    "SELECT id, username, email, firstName, lastName, department FROM users \
     WHERE username LIKE '%' || ? || '%' ORDER BY id";
pub const FIND_PASSWORD_HASH: &str = "SELECT hash, salt FROM users WHERE ? IN (username, email)";
pub const FIND_PASSWORD_HASH_USERNAME_ONLY: &str =
    "SELECT hash, salt FROM users WHERE username = ?";
pub const UPDATE_CREDENTIALS: &str = "UPDATE users SET hash = ?, salt = ? WHERE username = ?";
pub const UPDATE_EMAIL_ADDRESS: &str = "UPDATE users SET email = ? WHERE username = ?";

/// Installs a test subscriber once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("kc_federation_sql=debug,sqlx=warn")
        .with_test_writer()
        .try_init();
}

/// Username of seeded user `n`.
pub fn username(n: usize) -> String {
    format!("user{n:03}")
}

/// Opens a fresh in-memory database with the seeded users table.
pub async fn seeded_source() -> anyhow::Result<Arc<SqlxDataSource>> {
    init_tracing();

    // One connection, so every statement sees the same in-memory database.
    let source = SqlxDataSource::connect_lazy(&ConnectionSettings::new("sqlite::memory:").max_connections(1))?;
    source
        .execute(
            "CREATE TABLE users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT,
                firstName TEXT,
                lastName TEXT,
                department TEXT,
                hash TEXT,
                salt TEXT
            )",
            &[],
        )
        .await?;

    for n in 1..=USER_COUNT {
        let id = n.to_string();
        let username = username(n);
        let email = format!("{username}@example.com");
        let first_name = format!("First{n}");
        let department = if n % 2 == 0 { "sales" } else { "support" };
        source
            .execute(
                "INSERT INTO users (id, username, email, firstName, lastName, department) \
                 VALUES (?, ?, ?, ?, NULL, ?)",
                &[id.as_str(), username.as_str(), email.as_str(), first_name.as_str(), department],
            )
            .await?;
    }

    Ok(Arc::new(source))
}

/// Template set over the seeded table.
pub fn queries(rdbms: Rdbms, list_all: &str) -> anyhow::Result<QueryConfigurations> {
    Ok(QueryConfigurations::builder()
        .count(COUNT)
        .list_all(list_all)
        .find_by_id(FIND_BY_ID)
        .find_by_username(FIND_BY_USERNAME)
        .find_by_username_or_email(FIND_BY_USERNAME_OR_EMAIL)
        .find_by_search_term(FIND_BY_SEARCH_TERM)
        .find_password_hash(FIND_PASSWORD_HASH)
        .find_password_hash_username_only(FIND_PASSWORD_HASH_USERNAME_ONLY)
        .update_credentials(UPDATE_CREDENTIALS)
        .update_email_address(UPDATE_EMAIL_ADDRESS)
        .rdbms(rdbms)
        .allow_database_overwrite(true)
        .build()?)
}

/// Repository over `source` for `rdbms`.
pub fn repository(source: Arc<dyn DataSource>, rdbms: Rdbms, list_all: &str) -> anyhow::Result<UserRepository> {
    Ok(UserRepository::new(
        QueryExecutor::new(source, rdbms),
        Arc::new(queries(rdbms, list_all)?),
    ))
}

/// Component configuration pointing at a database URL.
pub fn component(realm_id: Uuid, url: &str, rdbms: Rdbms) -> anyhow::Result<FederationConfig> {
    Ok(FederationConfig::builder()
        .realm_id(realm_id)
        .provider_type(kc_federation_sql::PROVIDER_ID)
        .name("legacy users")
        .config(keys::URL, url)
        .config(keys::RDBMS, rdbms.description())
        .config(keys::COUNT, COUNT)
        .config(keys::LIST_ALL, LIST_ALL)
        .config(keys::FIND_BY_ID, FIND_BY_ID)
        .config(keys::FIND_BY_USERNAME, FIND_BY_USERNAME)
        .config(keys::FIND_BY_USERNAME_OR_EMAIL, FIND_BY_USERNAME_OR_EMAIL)
        .config(keys::FIND_BY_SEARCH_TERM, FIND_BY_SEARCH_TERM)
        .config(keys::FIND_PASSWORD_HASH, FIND_PASSWORD_HASH)
        .config(keys::FIND_PASSWORD_HASH_USERNAME_ONLY, FIND_PASSWORD_HASH_USERNAME_ONLY)
        .config(keys::UPDATE_CREDENTIALS, UPDATE_CREDENTIALS)
        .config(keys::UPDATE_EMAIL_ADDRESS, UPDATE_EMAIL_ADDRESS)
        .config(keys::ALLOW_DATABASE_OVERWRITE, "true")
        .build()?)
}

// ============================================================================
// Dialect Translation
// ============================================================================

/// Runs `OFFSET .. ROWS FETCH NEXT .. ROWS ONLY` statements on SQLite by
/// rewriting the window to `LIMIT .. OFFSET ..`.
pub struct OffsetFetchOnSqlite {
    inner: Arc<SqlxDataSource>,
}

impl OffsetFetchOnSqlite {
    pub fn new(inner: Arc<SqlxDataSource>) -> Self {
        Self { inner }
    }

    fn translate(sql: &str) -> String {
        let Some((base, window)) = sql.rsplit_once(" OFFSET ") else {
            return sql.to_string();
        };
        let words: Vec<&str> = window.split_whitespace().collect();
        match words.as_slice() {
            [offset, "ROWS", "FETCH", "NEXT", limit, "ROWS", "ONLY"] => {
                format!("{base} LIMIT {limit} OFFSET {offset}")
            }
            _ => sql.to_string(),
        }
    }
}

#[async_trait]
impl DataSource for OffsetFetchOnSqlite {
    async fn fetch(&self, sql: &str, params: &[&str]) -> SqlResult<ResultSet> {
        self.inner.fetch(&Self::translate(sql), params).await
    }

    async fn execute(&self, sql: &str, params: &[&str]) -> SqlResult<u64> {
        self.inner.execute(&Self::translate(sql), params).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Runs the legacy SQL Server row-number wrapper on SQLite.
///
/// SQL Server numbers rows in arrival order under the wrapper's constant
/// window order; SQLite only guarantees that for an empty window. `TOP(n)`
/// in the derived table becomes a trailing `LIMIT n`.
pub struct RowNumberOnSqlite {
    inner: Arc<SqlxDataSource>,
}

impl RowNumberOnSqlite {
    pub fn new(inner: Arc<SqlxDataSource>) -> Self {
        Self { inner }
    }

    fn translate(sql: &str) -> String {
        let sql = sql.replace("OVER (ORDER BY CURRENT_TIMESTAMP)", "OVER ()");
        let Some(top) = sql.find("TOP(") else {
            return sql;
        };
        let digits = top + "TOP(".len();
        let Some(len) = sql[digits..].find(')') else {
            return sql;
        };
        let limit = &sql[digits..digits + len];
        let without_top = format!("{}{}", &sql[..top], sql[digits + len + 1..].trim_start());
        match without_top.find(") inner_query_") {
            Some(at) => format!("{} LIMIT {limit}{}", &without_top[..at], &without_top[at..]),
            None => sql.clone(),
        }
    }
}

#[async_trait]
impl DataSource for RowNumberOnSqlite {
    async fn fetch(&self, sql: &str, params: &[&str]) -> SqlResult<ResultSet> {
        self.inner.fetch(&Self::translate(sql), params).await
    }

    async fn execute(&self, sql: &str, params: &[&str]) -> SqlResult<u64> {
        self.inner.execute(&Self::translate(sql), params).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
