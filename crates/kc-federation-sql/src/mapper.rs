//! Maps database rows to host users.

use kc_federation::StorageId;
use kc_model::User;
use uuid::Uuid;

use crate::error::{SqlFederationError, SqlResult};
use crate::executor::UserRow;

/// Well-known result columns.
pub mod columns {
    /// External id. Required.
    pub const ID: &str = "id";
    /// Username. Required.
    pub const USERNAME: &str = "username";
    /// Email address.
    pub const EMAIL: &str = "email";
    /// First name.
    pub const FIRST_NAME: &str = "firstName";
    /// Last name.
    pub const LAST_NAME: &str = "lastName";
    /// Password hash, from the credential templates.
    pub const HASH: &str = "hash";
    /// Password salt, from the credential templates.
    pub const SALT: &str = "salt";
}

// Columns that never become user attributes.
const RESERVED: [&str; 7] = [
    columns::ID,
    columns::USERNAME,
    columns::EMAIL,
    columns::FIRST_NAME,
    columns::LAST_NAME,
    columns::HASH,
    columns::SALT,
];

// ============================================================================
// SQL User Attribute Mapper
// ============================================================================

/// Builds users for one provider component.
#[derive(Debug, Clone)]
pub struct SqlUserAttributeMapper {
    provider_id: String,
}

impl SqlUserAttributeMapper {
    /// Creates a mapper for the component `provider_id`.
    #[must_use]
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }

    /// Returns the component id users are linked to.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Maps a row to a user.
    ///
    /// The user id is the storage id `f:<component>:<row id>`. Columns
    /// other than the well-known ones become single-valued attributes.
    ///
    /// # Errors
    ///
    /// Returns [`SqlFederationError::DirectoryRead`] if `id` or `username`
    /// is missing.
    pub fn map_to_user(&self, realm_id: Uuid, row: &UserRow) -> SqlResult<User> {
        let id = required(row, columns::ID)?;
        let username = required(row, columns::USERNAME)?;

        let mut user = User::new(realm_id, username)
            .with_id(StorageId::new(self.provider_id.as_str(), id).to_string())
            .with_federation_link(self.provider_id.as_str());
        user.email = row.get(columns::EMAIL).cloned();
        user.first_name = row.get(columns::FIRST_NAME).cloned();
        user.last_name = row.get(columns::LAST_NAME).cloned();

        for (column, value) in row {
            if !RESERVED.contains(&column.as_str()) {
                user.set_attribute(column.clone(), vec![value.clone()]);
            }
        }

        Ok(user)
    }

    /// Maps every row, in order.
    ///
    /// # Errors
    ///
    /// Fails on the first row [`Self::map_to_user`] rejects.
    pub fn map_all(&self, realm_id: Uuid, rows: &[UserRow]) -> SqlResult<Vec<User>> {
        rows.iter().map(|row| self.map_to_user(realm_id, row)).collect()
    }

    /// Copies profile columns from a row onto an imported user.
    ///
    /// Email, first name and last name are copied when the row has a
    /// non-blank value (after trimming) that differs from the user's.
    /// Returns true if anything changed.
    pub fn update_user(&self, user: &mut User, row: &UserRow) -> bool {
        let mut changed = false;
        changed |= overwrite(&mut user.email, row.get(columns::EMAIL));
        changed |= overwrite(&mut user.first_name, row.get(columns::FIRST_NAME));
        changed |= overwrite(&mut user.last_name, row.get(columns::LAST_NAME));
        changed
    }
}

fn required<'a>(row: &'a UserRow, column: &str) -> SqlResult<&'a str> {
    row.get(column)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| SqlFederationError::read(format!("result row has no '{column}' column")))
}

fn overwrite(field: &mut Option<String>, value: Option<&String>) -> bool {
    let Some(value) = value.map(|v| v.trim()).filter(|v| !v.is_empty()) else {
        return false;
    };
    if field.as_deref() == Some(value) {
        return false;
    }
    *field = Some(value.to_string());
    true
}
