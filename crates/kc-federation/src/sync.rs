//! Import synchronization.
//!
//! Providers that let the host import their users reconcile those copies
//! against the external store on demand. The host exposes its copies
//! through [`LocalUserStore`], a transactional view keyed by realm and
//! username.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kc_model::User;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::FederationConfig;
use crate::error::FederationResult;

// ============================================================================
// Results
// ============================================================================

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    /// Imported users whose profile changed.
    pub updated: usize,
    /// External rows that could not be reconciled.
    pub failed: usize,
    /// When the pass began.
    pub started_at: DateTime<Utc>,
    /// When the pass ended; unset while running.
    pub finished_at: Option<DateTime<Utc>>,
    /// Human-readable summary, filled in by [`SyncResult::complete`].
    pub status: String,
    /// One entry per failed row.
    pub errors: Vec<SyncError>,
}

impl SyncResult {
    /// Starts a pass now.
    #[must_use]
    pub fn started() -> Self {
        Self {
            updated: 0,
            failed: 0,
            started_at: Utc::now(),
            finished_at: None,
            status: String::new(),
            errors: Vec::new(),
        }
    }

    /// Stamps the end time and summary.
    #[must_use]
    pub fn complete(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self.status = format!("{} updated, {} failed", self.updated, self.failed);
        self
    }

    /// Counts one changed user.
    pub fn record_updated(&mut self) {
        self.updated += 1;
    }

    /// Counts one failed row and keeps its reason.
    pub fn record_failure(&mut self, error: SyncError) {
        self.failed += 1;
        self.errors.push(error);
    }
}

/// Why a single external row was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncError {
    /// Id of the row in the external store.
    pub external_id: String,
    /// Username, when the row had one.
    pub username: Option<String>,
    /// Reason.
    pub message: String,
}

impl SyncError {
    /// Creates a failure for an external row.
    #[must_use]
    pub fn new(external_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            username: None,
            message: message.into(),
        }
    }

    /// Attaches the row's username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

// ============================================================================
// Provider Side
// ============================================================================

/// Implemented by factories whose users the host imports.
#[allow(async_fn_in_trait)]
pub trait ImportSynchronization: Send + Sync {
    /// Reconciles every imported user of one component.
    async fn sync(&self, realm_id: Uuid, model: &FederationConfig) -> FederationResult<SyncResult>;

    /// Reconciles users changed since `last_sync`. Providers that cannot
    /// tell what changed may run a full pass.
    async fn sync_since(
        &self,
        last_sync: DateTime<Utc>,
        realm_id: Uuid,
        model: &FederationConfig,
    ) -> FederationResult<SyncResult>;
}

// ============================================================================
// Host Side
// ============================================================================

/// The host's imported users.
#[async_trait]
pub trait LocalUserStore: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> FederationResult<Box<dyn LocalUserTransaction>>;
}

/// A unit of work against the local user store.
///
/// Dropping a transaction without committing discards its changes.
#[async_trait]
pub trait LocalUserTransaction: Send {
    /// Reads an imported user, seeing this transaction's own writes.
    async fn get_user_by_username(
        &mut self,
        realm_id: Uuid,
        username: &str,
    ) -> FederationResult<Option<User>>;

    /// Stages a changed user.
    async fn update_user(&mut self, user: &User) -> FederationResult<()>;

    /// Publishes every staged change.
    async fn commit(self: Box<Self>) -> FederationResult<()>;

    /// Drops every staged change.
    async fn rollback(self: Box<Self>) -> FederationResult<()>;
}

type Users = Arc<RwLock<HashMap<(Uuid, String), User>>>;

/// Local user store held in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Users,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a user directly, outside any transaction.
    pub fn insert(&self, user: User) {
        self.users
            .write()
            .insert((user.realm_id, user.username.clone()), user);
    }

    /// Committed state of a user.
    #[must_use]
    pub fn get(&self, realm_id: Uuid, username: &str) -> Option<User> {
        self.users
            .read()
            .get(&(realm_id, username.to_string()))
            .cloned()
    }
}

#[async_trait]
impl LocalUserStore for InMemoryUserStore {
    async fn begin(&self) -> FederationResult<Box<dyn LocalUserTransaction>> {
        Ok(Box::new(Staged {
            users: Arc::clone(&self.users),
            writes: HashMap::new(),
        }))
    }
}

struct Staged {
    users: Users,
    writes: HashMap<(Uuid, String), User>,
}

#[async_trait]
impl LocalUserTransaction for Staged {
    async fn get_user_by_username(
        &mut self,
        realm_id: Uuid,
        username: &str,
    ) -> FederationResult<Option<User>> {
        let key = (realm_id, username.to_string());
        let staged = self.writes.get(&key).cloned();
        Ok(staged.or_else(|| self.users.read().get(&key).cloned()))
    }

    async fn update_user(&mut self, user: &User) -> FederationResult<()> {
        self.writes
            .insert((user.realm_id, user.username.clone()), user.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> FederationResult<()> {
        let Self { users, writes } = *self;
        users.write().extend(writes);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> FederationResult<()> {
        tracing::debug!(discarded = self.writes.len(), "Discarded staged user changes");
        Ok(())
    }
}
