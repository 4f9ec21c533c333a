//! Host-side user cache.
//!
//! The host caches users it loaded from providers. Providers never fill
//! the cache themselves; they only read the cache timestamp of a user they
//! are handed and ask the host to drop stale entries.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use kc_model::User;
use parking_lot::RwLock;
use uuid::Uuid;

/// A user as held by the host cache.
#[derive(Debug, Clone)]
pub struct CachedUser {
    /// The cached user.
    pub user: User,
    /// When the user was loaded into the cache.
    pub cached_at: DateTime<Utc>,
}

impl CachedUser {
    /// Wraps a user cached now.
    #[must_use]
    pub fn new(user: User) -> Self {
        Self::at(user, Utc::now())
    }

    /// Wraps a user cached at the given time.
    #[must_use]
    pub const fn at(user: User, cached_at: DateTime<Utc>) -> Self {
        Self { user, cached_at }
    }

    /// Returns true if the entry is older than `max_age` at `now`.
    #[must_use]
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.cached_at) > max_age
    }
}

/// A user handed to a provider, either freshly loaded or from the cache.
#[derive(Debug, Clone, Copy)]
pub enum UserHandle<'a> {
    /// User loaded directly from its store.
    Live(&'a User),
    /// User served from the host cache.
    Cached(&'a CachedUser),
}

impl UserHandle<'_> {
    /// Returns the underlying user.
    #[must_use]
    pub const fn user(&self) -> &User {
        match self {
            Self::Live(user) => user,
            Self::Cached(cached) => &cached.user,
        }
    }

    /// Returns the cache entry when the user came from the cache.
    #[must_use]
    pub const fn cached(&self) -> Option<&CachedUser> {
        match self {
            Self::Live(_) => None,
            Self::Cached(cached) => Some(cached),
        }
    }
}

/// The host's user cache.
pub trait UserCache: Send + Sync {
    /// Returns the cached entry for a user.
    fn get(&self, realm_id: Uuid, user_id: &str) -> Option<CachedUser>;

    /// Caches a user.
    fn put(&self, entry: CachedUser);

    /// Drops a single user from the cache.
    fn invalidate(&self, realm_id: Uuid, user_id: &str);

    /// Drops every cached user.
    fn clear(&self);
}

/// In-process user cache keyed by realm and user id.
#[derive(Debug, Default)]
pub struct InMemoryUserCache {
    entries: RwLock<HashMap<(Uuid, String), CachedUser>>,
}

impl InMemoryUserCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of cached users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl UserCache for InMemoryUserCache {
    fn get(&self, realm_id: Uuid, user_id: &str) -> Option<CachedUser> {
        self.entries
            .read()
            .get(&(realm_id, user_id.to_string()))
            .cloned()
    }

    fn put(&self, entry: CachedUser) {
        let key = (entry.user.realm_id, entry.user.id.clone());
        self.entries.write().insert(key, entry);
    }

    fn invalidate(&self, realm_id: Uuid, user_id: &str) {
        if self
            .entries
            .write()
            .remove(&(realm_id, user_id.to_string()))
            .is_some()
        {
            tracing::debug!(realm_id = %realm_id, user_id = %user_id, "Invalidated cached user");
        }
    }

    fn clear(&self) {
        let mut entries = self.entries.write();
        tracing::debug!(count = entries.len(), "Clearing user cache");
        entries.clear();
    }
}
