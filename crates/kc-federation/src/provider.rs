//! Provider-side traits.
//!
//! A factory turns a [`FederationConfig`] into a provider. The host asks the
//! provider for users and, when it also implements [`CredentialValidator`]
//! and [`CredentialUpdater`], hands it password checks and changes.
//!
//! ## NIST 800-53 Rev5: IA-5 (Authenticator Management)
//!
//! Credential values passed to these traits are never logged.

use kc_model::{CredentialInput, CredentialType, Realm, User};

use crate::cache::UserHandle;
use crate::config::FederationConfig;
use crate::error::FederationResult;

// ============================================================================
// User Storage Provider
// ============================================================================

/// Reads users from an external store.
///
/// A lookup that finds nothing returns `Ok(None)`, not an error. Management
/// operations default to declining so read-only stores implement lookups only.
#[allow(async_fn_in_trait)]
pub trait UserStorageProvider: Send + Sync {
    /// Returns the provider configuration.
    fn config(&self) -> &FederationConfig;

    /// Returns the provider type identifier.
    fn provider_type(&self) -> &'static str;

    /// Checks that the external store answers.
    async fn test_connection(&self) -> FederationResult<()>;

    // === User Lookup ===

    /// Gets a user by id.
    ///
    /// The id is the host's storage id for the user; providers strip it
    /// down to the external id themselves.
    async fn get_user_by_id(&self, realm: &Realm, id: &str) -> FederationResult<Option<User>>;

    /// Gets a user by username.
    async fn get_user_by_username(
        &self,
        realm: &Realm,
        username: &str,
    ) -> FederationResult<Option<User>>;

    /// Gets a user by email.
    async fn get_user_by_email(&self, realm: &Realm, email: &str)
        -> FederationResult<Option<User>>;

    // === User Queries ===

    /// Counts users, optionally restricted to a search term.
    async fn count_users(&self, realm: &Realm, search: Option<&str>) -> FederationResult<usize>;

    /// Searches for users.
    ///
    /// A missing or blank search lists every user. `first`/`max` select a
    /// page; no `max` returns everything.
    async fn search_users(
        &self,
        realm: &Realm,
        search: Option<&str>,
        first: Option<usize>,
        max: Option<usize>,
    ) -> FederationResult<Vec<User>>;

    // === User Management (if supported) ===

    /// Creates a user in the external store.
    ///
    /// `Ok(None)` declines, letting the host fall through to the next
    /// provider or local storage.
    async fn add_user(&self, _realm: &Realm, _username: &str) -> FederationResult<Option<User>> {
        Ok(None)
    }

    /// Asks whether the host may remove a federated user.
    ///
    /// Returns true if removal is permitted; the host performs the removal.
    async fn remove_user(&self, _realm: &Realm, _user: &User) -> FederationResult<bool> {
        Ok(false)
    }

    /// Closes the provider, releasing any resources.
    async fn close(&self) -> FederationResult<()> {
        Ok(())
    }
}

// ============================================================================
// Credential Validator
// ============================================================================

/// Checks credentials against the external store.
#[allow(async_fn_in_trait)]
pub trait CredentialValidator: Send + Sync {
    /// Returns true if the provider can validate this credential type.
    fn supports_credential_type(&self, credential_type: CredentialType) -> bool;

    /// Returns true if the user has a credential of this type configured.
    fn is_configured_for(&self, realm: &Realm, user: &User, credential_type: CredentialType)
        -> bool;

    /// Checks a credential.
    ///
    /// Returns false for a wrong credential or an unsupported credential
    /// type; errors are reserved for failures the operator has to fix.
    async fn is_valid(
        &self,
        realm: &Realm,
        user: UserHandle<'_>,
        input: &CredentialInput,
    ) -> FederationResult<bool>;
}

// ============================================================================
// Credential Updater
// ============================================================================

/// Writes credentials back to the external store.
///
/// Implementations store what they are given. The host must check the
/// realm's password policy before calling [`CredentialUpdater::update_credential`].
#[allow(async_fn_in_trait)]
pub trait CredentialUpdater: Send + Sync {
    /// Stores a new credential for the user.
    ///
    /// Returns false if the credential type is unsupported or the write failed.
    async fn update_credential(
        &self,
        realm: &Realm,
        user: &User,
        input: &CredentialInput,
    ) -> FederationResult<bool>;

    /// Disables every credential of the given type for the user.
    async fn disable_credential_type(
        &self,
        _realm: &Realm,
        _user: &User,
        _credential_type: CredentialType,
    ) -> FederationResult<()> {
        Ok(())
    }

    /// Lists the credential types that may be disabled for the user.
    fn disableable_credential_types(&self, _realm: &Realm, _user: &User) -> Vec<CredentialType> {
        Vec::new()
    }
}

// ============================================================================
// Provider Factory
// ============================================================================

/// Creates provider instances from component configurations.
#[allow(async_fn_in_trait)]
pub trait UserStorageProviderFactory: Send + Sync {
    /// The provider type produced by this factory.
    type Provider: UserStorageProvider;

    /// Returns the provider type identifier.
    fn id(&self) -> &'static str;

    /// Returns help text shown next to the provider in the admin console.
    fn help_text(&self) -> &'static str;

    /// Creates a provider for the given component.
    async fn create(&self, model: &FederationConfig) -> FederationResult<Self::Provider>;

    /// Validates a new or changed component configuration.
    async fn validate_configuration(&self, model: &FederationConfig) -> FederationResult<()>;

    /// Releases every resource held for all components.
    async fn close(&self);
}
