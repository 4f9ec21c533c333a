//! Realms. Federation providers read only the login settings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A realm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Realm {
    /// Realm id.
    pub id: Uuid,
    /// Unique realm name.
    pub name: String,
    /// Whether an email address is accepted where a username is expected.
    pub login_with_email_allowed: bool,
}

impl Realm {
    /// Creates a realm that accepts email logins.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            login_with_email_allowed: true,
        }
    }

    /// Turns email logins on or off.
    #[must_use]
    pub const fn with_login_with_email_allowed(mut self, allowed: bool) -> Self {
        self.login_with_email_allowed = allowed;
        self
    }
}
