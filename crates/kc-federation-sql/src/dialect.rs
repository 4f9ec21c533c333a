//! Supported database dialects.
//!
//! Each dialect fixes three things: the description operators pick in the
//! configuration, the statement used to check a connection, and how a
//! query is windowed for paging.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SqlFederationError, SqlResult};

/// How a dialect restricts a query to one page of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingStrategy {
    /// `LIMIT <limit> OFFSET <offset>`.
    LimitOffset,
    /// `LIMIT <offset>, <limit>`.
    LimitComma,
    /// `OFFSET <offset> ROWS FETCH NEXT <limit> ROWS ONLY`.
    OffsetFetch,
    /// `OFFSET ... FETCH`, which SQL Server only accepts after an `ORDER BY`.
    OffsetFetchOrdered,
    /// `ROW_NUMBER()` window with a `TOP` bound, for drivers without offset syntax.
    RowNumber,
}

/// How bind parameters are written in statements sent to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` markers.
    Question,
    /// `$1`, `$2`, ... markers.
    Numbered,
}

/// Relational database families the provider can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rdbms {
    /// PostgreSQL 10 and later.
    Postgresql,
    /// MySQL 5.7 and later.
    Mysql,
    /// Oracle 12c and later.
    Oracle,
    /// SQL Server 2012 and later through the jTDS driver.
    SqlServer,
    /// SQL Server 2012 and later through the Microsoft driver.
    Mssql,
}

impl Rdbms {
    /// All dialects, in the order they are offered to operators.
    pub const ALL: [Self; 5] = [
        Self::Postgresql,
        Self::Mysql,
        Self::Oracle,
        Self::SqlServer,
        Self::Mssql,
    ];

    /// Returns the human-readable description used in configuration.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Postgresql => "PostgreSQL 10+",
            Self::Mysql => "MySQL 5.7+",
            Self::Oracle => "Oracle 12+",
            Self::SqlServer => "MS SQL Server 2012+ (jtds)",
            Self::Mssql => "MS SQL Server 2012+ (jdbc)",
        }
    }

    /// Returns the statement used to check that a connection works.
    #[must_use]
    pub const fn test_query(self) -> &'static str {
        match self {
            Self::Oracle => "SELECT 1 FROM DUAL",
            Self::Postgresql | Self::Mysql | Self::SqlServer | Self::Mssql => "SELECT 1",
        }
    }

    /// Returns the paging strategy.
    #[must_use]
    pub const fn paging_strategy(self) -> PagingStrategy {
        match self {
            Self::Postgresql => PagingStrategy::LimitOffset,
            Self::Mysql => PagingStrategy::LimitComma,
            Self::Oracle => PagingStrategy::OffsetFetch,
            Self::SqlServer => PagingStrategy::RowNumber,
            Self::Mssql => PagingStrategy::OffsetFetchOrdered,
        }
    }

    /// Returns the bind parameter style the database's driver expects.
    #[must_use]
    pub const fn placeholder_style(self) -> PlaceholderStyle {
        match self {
            Self::Postgresql => PlaceholderStyle::Numbered,
            Self::Mysql | Self::Oracle | Self::SqlServer | Self::Mssql => {
                PlaceholderStyle::Question
            }
        }
    }

    /// Looks a dialect up by its exact description.
    #[must_use]
    pub fn from_description(description: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|rdbms| rdbms.description() == description)
    }

    /// Parses a configured dialect description.
    ///
    /// # Errors
    ///
    /// Returns [`SqlFederationError::UnknownDialect`] if no dialect matches.
    pub fn parse(description: &str) -> SqlResult<Self> {
        Self::from_description(description)
            .ok_or_else(|| SqlFederationError::UnknownDialect(description.to_string()))
    }

    /// Returns every description, for configuration option lists.
    #[must_use]
    pub fn all_descriptions() -> Vec<&'static str> {
        Self::ALL.iter().map(|rdbms| rdbms.description()).collect()
    }
}

impl fmt::Display for Rdbms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
