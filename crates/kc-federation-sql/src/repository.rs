//! Directory operations over the operator's templates.
//!
//! [`UserRepository`] is the provider's view of the external database.
//! Every method runs one configured template through the
//! [`QueryExecutor`]; a database that cannot be reached reads as "no
//! users", a count of zero, or a failed write.

use std::sync::Arc;

use crate::config::QueryConfigurations;
use crate::error::SqlResult;
use crate::executor::{read_int, read_rows, QueryExecutor, UserRow};
use crate::mapper::columns;
use crate::paging::{Pageable, SqlScanner};

/// Reads and writes users in the external database.
#[derive(Debug, Clone)]
pub struct UserRepository {
    executor: QueryExecutor,
    queries: Arc<QueryConfigurations>,
}

impl UserRepository {
    /// Creates a repository.
    #[must_use]
    pub fn new(executor: QueryExecutor, queries: Arc<QueryConfigurations>) -> Self {
        Self { executor, queries }
    }

    /// Returns the templates in use.
    #[must_use]
    pub fn queries(&self) -> &QueryConfigurations {
        &self.queries
    }

    /// Returns the executor.
    #[must_use]
    pub const fn executor(&self) -> &QueryExecutor {
        &self.executor
    }

    // === Counting ===

    /// Counts every user.
    ///
    /// # Errors
    ///
    /// Returns a read error if the count is not an integer.
    pub async fn count_all(&self) -> SqlResult<usize> {
        let count = self
            .executor
            .query(self.queries.count(), None, &[], read_int)
            .await?;
        Ok(to_count(count.flatten()))
    }

    /// Counts the users the search template returns for `term`.
    ///
    /// # Errors
    ///
    /// Returns a read error if the count is not an integer.
    pub async fn count_matching(&self, term: &str) -> SqlResult<usize> {
        let search = SqlScanner::new(self.queries.find_by_search_term()).statement();
        let sql = format!("select count(*) from ({search}) count");
        let count = self.executor.query(&sql, None, &[term], read_int).await?;
        Ok(to_count(count.flatten()))
    }

    /// Counts users, restricted to `search` unless it is missing or blank.
    ///
    /// # Errors
    ///
    /// Returns a read error if the count is not an integer.
    pub async fn count(&self, search: Option<&str>) -> SqlResult<usize> {
        match non_blank(search) {
            Some(term) => self.count_matching(term).await,
            None => self.count_all().await,
        }
    }

    // === Lookup ===

    /// Finds a user by external id.
    ///
    /// # Errors
    ///
    /// Returns a read error if the result cannot be read.
    pub async fn find_by_id(&self, id: &str) -> SqlResult<Option<UserRow>> {
        self.first_row(self.queries.find_by_id(), id).await
    }

    /// Finds a user by login name.
    ///
    /// With `allow_email` the name may be a username or an email address.
    ///
    /// # Errors
    ///
    /// Returns a read error if the result cannot be read.
    pub async fn find_by_login_name(&self, name: &str, allow_email: bool) -> SqlResult<Option<UserRow>> {
        let template = if allow_email {
            self.queries.find_by_username_or_email()
        } else {
            self.queries.find_by_username()
        };
        self.first_row(template, name).await
    }

    /// Lists users, one page or all of them.
    ///
    /// # Errors
    ///
    /// Returns a read error if the result cannot be read.
    pub async fn list_all(&self, pageable: Option<&Pageable>) -> SqlResult<Vec<UserRow>> {
        let rows = self
            .executor
            .query(self.queries.list_all(), pageable, &[], read_rows)
            .await?;
        Ok(rows.unwrap_or_default())
    }

    /// Searches users. A missing or blank term lists every user.
    ///
    /// # Errors
    ///
    /// Returns a read error if the result cannot be read.
    pub async fn search(&self, term: Option<&str>, pageable: Option<&Pageable>) -> SqlResult<Vec<UserRow>> {
        let Some(term) = non_blank(term) else {
            return self.list_all(pageable).await;
        };
        let rows = self
            .executor
            .query(self.queries.find_by_search_term(), pageable, &[term], read_rows)
            .await?;
        Ok(rows.unwrap_or_default())
    }

    // === Credentials ===

    /// Checks a password against the stored hash.
    ///
    /// Only the first returned row is used. No row, or a row without a
    /// hash, fails validation.
    ///
    /// # Errors
    ///
    /// Returns a read error if the result cannot be read.
    pub async fn validate_credentials(&self, username: &str, password: &str, allow_email: bool) -> SqlResult<bool> {
        let template = if allow_email {
            self.queries.find_password_hash()
        } else {
            self.queries.find_password_hash_username_only()
        };

        let valid = match self.first_row(template, username).await? {
            Some(row) => match row.get(columns::HASH) {
                Some(hash) => {
                    let salt = row.get(columns::SALT).map_or("", String::as_str);
                    self.queries.password_scheme().validate(password, salt, hash)
                }
                None => false,
            },
            None => false,
        };

        tracing::info!(username, valid, "Credential validation");
        Ok(valid)
    }

    /// Stores a new password for a user, with a fresh salt.
    ///
    /// Returns false if the write could not be run.
    ///
    /// # Errors
    ///
    /// Returns a credential error if hashing fails.
    pub async fn update_credentials(&self, username: &str, password: &str) -> SqlResult<bool> {
        let record = self.queries.password_scheme().generate(password)?;
        tracing::info!(username, "Updating credentials");
        self.executor
            .update(
                self.queries.update_credentials(),
                &[record.hash.as_str(), record.salt.as_str(), username],
            )
            .await
    }

    /// Stores a new email address for a user.
    ///
    /// Returns false if the write could not be run.
    ///
    /// # Errors
    ///
    /// Fails only on a template/parameter mismatch.
    pub async fn update_email(&self, username: &str, email: &str) -> SqlResult<bool> {
        tracing::debug!(username, "Updating email address");
        self.executor
            .update(self.queries.update_email_address(), &[email, username])
            .await
    }

    // === Settings ===

    /// Whether the host may delete federated users.
    #[must_use]
    pub fn allows_local_delete(&self) -> bool {
        self.queries.allow_local_delete()
    }

    /// Whether database values may overwrite cached users.
    #[must_use]
    pub fn allows_database_overwrite(&self) -> bool {
        self.queries.allow_database_overwrite()
    }

    /// Checks that the database answers.
    ///
    /// # Errors
    ///
    /// Returns the connection check failure.
    pub async fn test_connection(&self) -> SqlResult<()> {
        self.executor.ping().await
    }

    async fn first_row(&self, template: &str, param: &str) -> SqlResult<Option<UserRow>> {
        let rows = self.executor.query(template, None, &[param], read_rows).await?;
        Ok(rows.and_then(|rows| rows.into_iter().next()))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn to_count(value: Option<i64>) -> usize {
    value.and_then(|v| usize::try_from(v).ok()).unwrap_or(0)
}
