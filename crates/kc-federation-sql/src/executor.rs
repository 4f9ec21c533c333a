//! Statement execution.
//!
//! [`QueryExecutor`] prepares a template for the configured dialect (paging
//! first, then bind markers), checks the parameter count and runs it. It
//! sorts failures the way the provider needs them:
//!
//! - connection, timeout and statement failures are logged and come back
//!   as `Ok(None)` / `Ok(false)`, so a database outage reads as "no data"
//! - failures while turning rows into values propagate
//!
//! Parameter values are never logged, only their count.

use std::collections::HashMap;
use std::sync::Arc;

use crate::datasource::{DataSource, ResultSet};
use crate::dialect::Rdbms;
use crate::error::{SqlFederationError, SqlResult};
use crate::paging::{bind_markers, count_placeholders, format_with_pageable, Pageable, ROW_NUMBER_COLUMN};

/// One result row keyed by column label. SQL `NULL` columns are absent.
pub type UserRow = HashMap<String, String>;

/// Runs templates against a [`DataSource`].
#[derive(Clone)]
pub struct QueryExecutor {
    data_source: Arc<dyn DataSource>,
    rdbms: Rdbms,
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("rdbms", &self.rdbms)
            .field("closed", &self.data_source.is_closed())
            .finish_non_exhaustive()
    }
}

impl QueryExecutor {
    /// Creates an executor.
    #[must_use]
    pub fn new(data_source: Arc<dyn DataSource>, rdbms: Rdbms) -> Self {
        Self { data_source, rdbms }
    }

    /// Returns the dialect statements are prepared for.
    #[must_use]
    pub const fn rdbms(&self) -> Rdbms {
        self.rdbms
    }

    /// Returns the data source.
    #[must_use]
    pub fn data_source(&self) -> &Arc<dyn DataSource> {
        &self.data_source
    }

    /// Runs a query and hands its rows to `mapper`.
    ///
    /// Returns `Ok(None)` if the statement could not be run.
    ///
    /// # Errors
    ///
    /// Returns [`SqlFederationError::ParameterCount`] if `params` does not
    /// match the template, and whatever `mapper` returns.
    pub async fn query<T, F>(
        &self,
        template: &str,
        pageable: Option<&Pageable>,
        params: &[&str],
        mapper: F,
    ) -> SqlResult<Option<T>>
    where
        F: FnOnce(ResultSet) -> SqlResult<T>,
    {
        let sql = self.prepare(template, pageable, params)?;
        tracing::debug!(query = %sql, params = params.len(), "Executing query");

        match self.data_source.fetch(&sql, params).await {
            Ok(rows) => mapper(rows).map(Some),
            Err(e) if e.is_transient() => {
                tracing::error!(error = %e, "Query failed");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs a statement that changes data.
    ///
    /// Returns `Ok(false)` if the statement could not be run.
    ///
    /// # Errors
    ///
    /// Returns [`SqlFederationError::ParameterCount`] if `params` does not
    /// match the template.
    pub async fn update(&self, template: &str, params: &[&str]) -> SqlResult<bool> {
        let sql = self.prepare(template, None, params)?;
        tracing::debug!(query = %sql, params = params.len(), "Executing update");

        match self.data_source.execute(&sql, params).await {
            Ok(affected) => {
                tracing::debug!(affected, "Update executed");
                Ok(true)
            }
            Err(e) if e.is_transient() => {
                tracing::error!(error = %e, "Update failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs the dialect's connection check statement.
    ///
    /// # Errors
    ///
    /// Returns the failure as-is; nothing is swallowed here.
    pub async fn ping(&self) -> SqlResult<()> {
        self.data_source
            .fetch(self.rdbms.test_query(), &[])
            .await
            .map(|_| ())
    }

    /// Closes the data source.
    pub async fn close(&self) {
        self.data_source.close().await;
    }

    fn prepare(&self, template: &str, pageable: Option<&Pageable>, params: &[&str]) -> SqlResult<String> {
        let expected = count_placeholders(template);
        if expected != params.len() {
            return Err(SqlFederationError::ParameterCount {
                expected,
                actual: params.len(),
            });
        }
        let sql = match pageable {
            Some(page) => format_with_pageable(template, page, self.rdbms),
            None => template.to_string(),
        };
        Ok(bind_markers(&sql, self.rdbms))
    }
}

// ============================================================================
// Row Readers
// ============================================================================

/// Turns every row into a [`UserRow`].
///
/// # Errors
///
/// Returns [`SqlFederationError::DirectoryRead`] if a row does not have one
/// value per column.
pub fn read_rows(rs: ResultSet) -> SqlResult<Vec<UserRow>> {
    let ResultSet { columns, rows } = rs;
    rows.into_iter()
        .map(|row| {
            if row.len() != columns.len() {
                return Err(SqlFederationError::read(format!(
                    "row has {} values for {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            Ok(columns
                .iter()
                .zip(row)
                .filter(|(column, _)| column.as_str() != ROW_NUMBER_COLUMN)
                .filter_map(|(column, value)| value.map(|v| (column.clone(), v)))
                .collect())
        })
        .collect()
}

/// Reads the first column of the first row as an integer.
///
/// # Errors
///
/// Returns [`SqlFederationError::DirectoryRead`] if the value is not an integer.
pub fn read_int(rs: ResultSet) -> SqlResult<Option<i64>> {
    let Some(value) = rs.rows.into_iter().next().and_then(|row| row.into_iter().next()) else {
        return Ok(None);
    };
    value
        .map(|v| {
            v.trim()
                .parse::<i64>()
                .map_err(|_| SqlFederationError::read(format!("'{v}' is not an integer")))
        })
        .transpose()
}
