//! Connection pools behind a small execution trait.
//!
//! The executor only needs two things from a database: run a statement
//! that returns rows and run one that does not. [`DataSource`] is that
//! seam. [`SqlxDataSource`] implements it over a `sqlx` `Any` pool for the
//! drivers sqlx ships (PostgreSQL, MySQL, SQLite); a host that talks to
//! Oracle or SQL Server plugs in its own implementation.
//!
//! Every value crosses the seam as text. Parameters are bound as strings
//! and result cells are read back as strings, with SQL `NULL` as `None`.

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Row};

use crate::config::ConnectionSettings;
use crate::error::{SqlFederationError, SqlResult};

/// Rows returned by a statement, as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    /// Column labels in select-list order.
    pub columns: Vec<String>,
    /// One entry per row, aligned with `columns`.
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    /// Creates a result set.
    #[must_use]
    pub const fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows were returned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the index of a column by label.
    #[must_use]
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == label)
    }
}

/// A pool of connections to the external database.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Runs a statement and returns its rows.
    ///
    /// `sql` is sent as-is: paging and placeholder rewriting have already
    /// been applied.
    async fn fetch(&self, sql: &str, params: &[&str]) -> SqlResult<ResultSet>;

    /// Runs a statement that returns no rows and reports the rows affected.
    async fn execute(&self, sql: &str, params: &[&str]) -> SqlResult<u64>;

    /// Closes every connection. Later calls fail with a connection error.
    async fn close(&self);

    /// Returns true once [`DataSource::close`] has been called.
    fn is_closed(&self) -> bool;
}

// ============================================================================
// sqlx
// ============================================================================

/// [`DataSource`] over a `sqlx` `Any` pool.
#[derive(Debug, Clone)]
pub struct SqlxDataSource {
    pool: AnyPool,
}

impl SqlxDataSource {
    /// Builds a pool that connects on first use.
    ///
    /// Nothing is sent to the database here, so a provider can be
    /// configured while its database is down.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL cannot be parsed or names
    /// a driver that is not compiled in.
    pub fn connect_lazy(settings: &ConnectionSettings) -> SqlResult<Self> {
        sqlx::any::install_default_drivers();

        let url = settings.connection_url()?;
        let pool = AnyPoolOptions::new()
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .acquire_timeout(settings.connect_timeout)
            .idle_timeout(Some(settings.idle_timeout))
            .max_lifetime(Some(settings.max_lifetime))
            .connect_lazy(&url)
            .map_err(|e| SqlFederationError::config(format!("invalid connection URL: {e}")))?;

        tracing::debug!(
            max_connections = settings.max_connections,
            "Created lazy connection pool"
        );

        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl DataSource for SqlxDataSource {
    async fn fetch(&self, sql: &str, params: &[&str]) -> SqlResult<ResultSet> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind((*param).to_string());
        }
        let rows = query.fetch_all(&self.pool).await?;

        let columns = rows.first().map_or_else(Vec::new, |row| {
            row.columns()
                .iter()
                .map(|column| column.name().to_string())
                .collect()
        });
        let rows = rows
            .iter()
            .map(read_row)
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(ResultSet::new(columns, rows))
    }

    async fn execute(&self, sql: &str, params: &[&str]) -> SqlResult<u64> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind((*param).to_string());
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

fn read_row(row: &AnyRow) -> SqlResult<Vec<Option<String>>> {
    (0..row.columns().len())
        .map(|index| read_value(row, index))
        .collect()
}

/// Reads one cell as text, whatever its database type.
fn read_value(row: &AnyRow, index: usize) -> SqlResult<Option<String>> {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return Ok(value);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map(|v| v.to_string()));
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
        return Ok(value.map(|v| v.to_string()));
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value.map(|v| v.to_string()));
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
        return Ok(value.map(|v| v.to_string()));
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return Ok(value.map(|v| String::from_utf8_lossy(&v).into_owned()));
    }

    let column = row
        .columns()
        .get(index)
        .map_or("?", |column| column.name());
    Err(SqlFederationError::read(format!(
        "column '{column}' has a type that cannot be read as text"
    )))
}
