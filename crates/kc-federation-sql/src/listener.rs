//! Pushes email changes made in the host back to the database.

use std::sync::Arc;

use async_trait::async_trait;
use kc_core::event::details;
use kc_core::{Event, EventListener, EventType};
use kc_federation::{StorageId, UserStorageProvider};

use crate::mapper::columns;
use crate::provider::SqlUserStorageProvider;

/// Writes updated email addresses through the update-email template.
///
/// Reacts to successful [`EventType::UpdateProfile`] events in the
/// provider's realm that carry an `updated_email` detail.
#[derive(Debug, Clone)]
pub struct ProfileUpdateListener {
    provider: Arc<SqlUserStorageProvider>,
}

impl ProfileUpdateListener {
    /// Creates a listener for one provider component.
    #[must_use]
    pub const fn new(provider: Arc<SqlUserStorageProvider>) -> Self {
        Self { provider }
    }

    fn applies_to(&self, event: &Event) -> bool {
        event.event_type == EventType::UpdateProfile
            && event.is_success()
            && event.realm_id == Some(self.provider.config().realm_id)
    }
}

#[async_trait]
impl EventListener for ProfileUpdateListener {
    async fn on_event(&self, event: &Event) {
        if !self.applies_to(event) {
            return;
        }
        let Some(user_id) = event.user_id.as_deref() else {
            return;
        };
        tracing::debug!(user_id, "Update event received");

        let Some(updated_email) = event.detail(details::UPDATED_EMAIL) else {
            return;
        };
        let previous_email = event.detail(details::PREVIOUS_EMAIL).unwrap_or_default();

        let repository = self.provider.repository();
        let username = match repository.find_by_id(&StorageId::external_id_of(user_id)).await {
            Ok(Some(row)) => row.get(columns::USERNAME).cloned(),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to look up user for email update");
                return;
            }
        };
        let Some(username) = username else {
            tracing::warn!(user_id, "User for email update not found in the database");
            return;
        };

        match repository.update_email(&username, updated_email).await {
            Ok(true) => tracing::info!(
                user_id,
                username = %username,
                previous_email,
                updated_email,
                "Email changed"
            ),
            Ok(false) => tracing::warn!(user_id, username = %username, "Email update was not applied"),
            Err(e) => tracing::error!(user_id, error = %e, "Email update failed"),
        }
    }
}
