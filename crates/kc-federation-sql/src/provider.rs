//! SQL user storage provider.
//!
//! Implements the federation provider traits on top of a
//! [`UserRepository`]: lookups, search, counting, password validation and
//! password updates. Users are read-only otherwise; the provider never
//! creates users and only allows the host to delete its own copy when the
//! component says so.
//!
//! ## NIST 800-53 Rev5 Controls
//!
//! - IA-2: Identification and Authentication
//! - IA-5: Authenticator Management

use std::sync::Arc;

use chrono::{Duration, Utc};
use kc_federation::{
    CredentialUpdater, CredentialValidator, FederationConfig, FederationError, FederationResult,
    StorageId, UserCache, UserHandle, UserStorageProvider,
};
use kc_model::{CredentialInput, CredentialType, Realm, User};

use crate::factory::PROVIDER_ID;
use crate::mapper::SqlUserAttributeMapper;
use crate::paging::Pageable;
use crate::repository::UserRepository;

/// Cached users younger than this are trusted during validation.
const CACHE_FRESHNESS_MS: i64 = 500;

/// User storage provider backed by an external SQL database.
pub struct SqlUserStorageProvider {
    model: FederationConfig,
    repository: UserRepository,
    mapper: SqlUserAttributeMapper,
    cache: Arc<dyn UserCache>,
}

impl std::fmt::Debug for SqlUserStorageProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlUserStorageProvider")
            .field("component", &self.model.id)
            .field("name", &self.model.name)
            .field("repository", &self.repository)
            .finish_non_exhaustive()
    }
}

impl SqlUserStorageProvider {
    /// Creates a provider for a component.
    #[must_use]
    pub fn new(model: FederationConfig, repository: UserRepository, cache: Arc<dyn UserCache>) -> Self {
        let mapper = SqlUserAttributeMapper::new(model.id.to_string());
        Self {
            model,
            repository,
            mapper,
            cache,
        }
    }

    /// Returns the repository.
    #[must_use]
    pub const fn repository(&self) -> &UserRepository {
        &self.repository
    }

    /// Returns the row mapper.
    #[must_use]
    pub const fn mapper(&self) -> &SqlUserAttributeMapper {
        &self.mapper
    }

    /// Refreshes a stale cached user from the database.
    ///
    /// Returns false if the user no longer exists.
    async fn refresh_cached(&self, realm: &Realm, cached: &User) -> FederationResult<bool> {
        let Some(current) = self.get_user_by_id(realm, &cached.id).await? else {
            tracing::debug!(user_id = %cached.id, "Cached user is gone from the database");
            self.cache.invalidate(realm.id, &cached.id);
            return Ok(false);
        };
        if !current.same_profile(cached) {
            tracing::debug!(user_id = %cached.id, "Cached user changed in the database");
            self.cache.invalidate(realm.id, &cached.id);
        }
        Ok(true)
    }
}

impl UserStorageProvider for SqlUserStorageProvider {
    fn config(&self) -> &FederationConfig {
        &self.model
    }

    fn provider_type(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn test_connection(&self) -> FederationResult<()> {
        self.repository
            .test_connection()
            .await
            .map_err(|e| FederationError::connection(e.to_string()))
    }

    async fn get_user_by_id(&self, realm: &Realm, id: &str) -> FederationResult<Option<User>> {
        let external_id = StorageId::external_id_of(id);
        tracing::debug!(realm = %realm.name, user_id = id, "Looking up user by id");

        let Some(row) = self.repository.find_by_id(&external_id).await? else {
            tracing::debug!(user_id = id, "User not found by id");
            return Ok(None);
        };
        Ok(Some(self.mapper.map_to_user(realm.id, &row)?))
    }

    async fn get_user_by_username(
        &self,
        realm: &Realm,
        username: &str,
    ) -> FederationResult<Option<User>> {
        tracing::debug!(realm = %realm.name, username, "Looking up user by username");

        let row = self
            .repository
            .find_by_login_name(username, realm.login_with_email_allowed)
            .await?;
        Ok(row
            .map(|row| self.mapper.map_to_user(realm.id, &row))
            .transpose()?)
    }

    async fn get_user_by_email(&self, realm: &Realm, email: &str) -> FederationResult<Option<User>> {
        self.get_user_by_username(realm, email).await
    }

    async fn count_users(&self, _realm: &Realm, search: Option<&str>) -> FederationResult<usize> {
        Ok(self.repository.count(search).await?)
    }

    async fn search_users(
        &self,
        realm: &Realm,
        search: Option<&str>,
        first: Option<usize>,
        max: Option<usize>,
    ) -> FederationResult<Vec<User>> {
        tracing::debug!(realm = %realm.name, ?search, ?first, ?max, "Searching users");

        let pageable = Pageable::from_range(first, max);
        let rows = self.repository.search(search, pageable.as_ref()).await?;
        Ok(self.mapper.map_all(realm.id, &rows)?)
    }

    async fn remove_user(&self, realm: &Realm, user: &User) -> FederationResult<bool> {
        let allowed = self.repository.allows_local_delete();
        if allowed {
            tracing::info!(
                realm = %realm.name,
                user_id = %user.id,
                username = %user.username,
                "Removing federated user from the host"
            );
        }
        Ok(allowed)
    }

    async fn close(&self) -> FederationResult<()> {
        tracing::debug!(component = %self.model.id, "Closing provider");
        Ok(())
    }
}

impl CredentialValidator for SqlUserStorageProvider {
    fn supports_credential_type(&self, credential_type: CredentialType) -> bool {
        credential_type == CredentialType::Password
    }

    fn is_configured_for(&self, _realm: &Realm, _user: &User, credential_type: CredentialType) -> bool {
        self.supports_credential_type(credential_type)
    }

    async fn is_valid(
        &self,
        realm: &Realm,
        user: UserHandle<'_>,
        input: &CredentialInput,
    ) -> FederationResult<bool> {
        let username = &user.user().username;
        tracing::info!(username = %username, "User is trying to log in");

        if !self.supports_credential_type(input.credential_type) {
            return Ok(false);
        }

        if self.repository.allows_database_overwrite() {
            if let Some(cached) = user.cached() {
                let stale = cached.is_older_than(Duration::milliseconds(CACHE_FRESHNESS_MS), Utc::now());
                if stale && !self.refresh_cached(realm, &cached.user).await? {
                    return Ok(false);
                }
            }
        }

        Ok(self
            .repository
            .validate_credentials(username, input.challenge_response(), realm.login_with_email_allowed)
            .await?)
    }
}

impl CredentialUpdater for SqlUserStorageProvider {
    // Password policy is the host's concern; the new hash is written as given.
    async fn update_credential(
        &self,
        realm: &Realm,
        user: &User,
        input: &CredentialInput,
    ) -> FederationResult<bool> {
        tracing::info!(realm = %realm.id, username = %user.username, "Updating credential");

        if !self.supports_credential_type(input.credential_type) {
            return Ok(false);
        }
        Ok(self
            .repository
            .update_credentials(&user.username, input.challenge_response())
            .await?)
    }
}
