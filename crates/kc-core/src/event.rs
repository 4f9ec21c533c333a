//! User events and event listeners.
//!
//! ## NIST 800-53 Rev5: AU-2 (Event Logging)
//!
//! The host records an [`Event`] for every account change a user makes.
//! Providers that keep their own copy of user data register an
//! [`EventListener`] to mirror those changes back to their store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known event detail keys.
pub mod details {
    /// New email address after a profile update.
    pub const UPDATED_EMAIL: &str = "updated_email";
    /// Email address before a profile update.
    pub const PREVIOUS_EMAIL: &str = "previous_email";
    /// Username the event refers to.
    pub const USERNAME: &str = "username";
}

/// Account event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Successful login.
    Login,
    /// Rejected login.
    LoginError,
    /// Profile attributes changed; email changes carry
    /// [`details::PREVIOUS_EMAIL`] and [`details::UPDATED_EMAIL`].
    UpdateProfile,
    /// Password changed.
    UpdatePassword,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A recorded user event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event id.
    pub id: Uuid,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Kind of event.
    pub event_type: EventType,
    /// Whether the action succeeded.
    pub outcome: EventOutcome,
    /// Realm the user belongs to.
    pub realm_id: Option<Uuid>,
    /// Host id of the user, a storage id for federated users.
    pub user_id: Option<String>,
    /// Failure reason.
    pub error: Option<String>,
    /// Ordered key/value details.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Starts building an event.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }

    /// Returns the first detail value recorded under `key`.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if the action succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, EventOutcome::Success)
    }
}

/// Builder for [`Event`].
#[derive(Debug)]
pub struct EventBuilder {
    event_type: EventType,
    error: Option<String>,
    realm_id: Option<Uuid>,
    user_id: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a builder for a successful event.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            error: None,
            realm_id: None,
            user_id: None,
            details: Vec::new(),
        }
    }

    /// Marks the event as failed.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Sets the realm.
    #[must_use]
    pub const fn realm(mut self, realm_id: Uuid) -> Self {
        self.realm_id = Some(realm_id);
        self
    }

    /// Sets the user.
    #[must_use]
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Appends a detail.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Stamps and returns the event.
    #[must_use]
    pub fn build(self) -> Event {
        let outcome = if self.error.is_some() {
            EventOutcome::Failure
        } else {
            EventOutcome::Success
        };
        Event {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome,
            realm_id: self.realm_id,
            user_id: self.user_id,
            error: self.error,
            details: self.details,
        }
    }
}

/// Receives user events after they are recorded.
///
/// Listeners must not fail the operation that produced the event, so
/// `on_event` has no error channel; implementations log their own failures.
#[async_trait]
pub trait EventListener: Send + Sync {
    /// Handles one event.
    async fn on_event(&self, event: &Event);
}
