//! Users as the host sees them.
//!
//! A local user has a UUID id. A federated user's id is a storage id
//! (`f:<component>:<external id>`) and `federation_link` names the
//! component that owns it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user in a realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Host id; a storage id for federated users.
    pub id: String,
    /// Owning realm.
    pub realm_id: Uuid,
    /// Unique within the realm.
    pub username: String,
    /// Email address.
    pub email: Option<String>,
    /// Given name.
    pub first_name: Option<String>,
    /// Family name.
    pub last_name: Option<String>,
    /// Id of the federation component backing this user.
    pub federation_link: Option<String>,
    /// Multi-valued attributes beyond the fixed profile fields.
    pub attributes: HashMap<String, Vec<String>>,
}

impl User {
    /// Creates a local user with a fresh id and an empty profile.
    #[must_use]
    pub fn new(realm_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            realm_id,
            username: username.into(),
            email: None,
            first_name: None,
            last_name: None,
            federation_link: None,
            attributes: HashMap::new(),
        }
    }

    /// Replaces the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the given name.
    #[must_use]
    pub fn with_first_name(mut self, name: impl Into<String>) -> Self {
        self.first_name = Some(name.into());
        self
    }

    /// Sets the family name.
    #[must_use]
    pub fn with_last_name(mut self, name: impl Into<String>) -> Self {
        self.last_name = Some(name.into());
        self
    }

    /// Links the user to a federation component.
    #[must_use]
    pub fn with_federation_link(mut self, link: impl Into<String>) -> Self {
        self.federation_link = Some(link.into());
        self
    }

    /// Compares the fixed profile fields; ids and attributes are ignored.
    #[must_use]
    pub fn same_profile(&self, other: &Self) -> bool {
        self.username == other.username
            && self.email == other.email
            && self.first_name == other.first_name
            && self.last_name == other.last_name
    }

    /// All values of an attribute.
    #[must_use]
    pub fn get_attribute(&self, name: &str) -> Option<&[String]> {
        self.attributes.get(name).map(Vec::as_slice)
    }

    /// First value of an attribute.
    #[must_use]
    pub fn get_first_attribute(&self, name: &str) -> Option<&str> {
        self.get_attribute(name)
            .and_then(<[String]>::first)
            .map(String::as_str)
    }

    /// Replaces every value of `name`.
    pub fn set_attribute(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.attributes.insert(name.into(), values);
    }
}
