//! Component model of a configured federation provider.
//!
//! The host stores one [`FederationConfig`] per provider instance an
//! administrator adds to a realm. Settings are kept as strings exactly as
//! entered; providers parse what they need with [`FederationConfig::get_bool`]
//! and [`FederationConfig::get_u32`].

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FederationError, FederationResult};

const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// A provider instance as configured in a realm.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Component id; also the provider part of every storage id it issues.
    pub id: Uuid,
    /// Owning realm.
    pub realm_id: Uuid,
    /// Factory id, e.g. `sql-db-user-provider`.
    pub provider_type: String,
    /// Display name.
    pub name: String,
    /// Raw settings keyed by property name.
    pub config: HashMap<String, String>,
    /// How long to wait for a backend connection, in whole seconds on the wire.
    #[serde(with = "seconds")]
    pub connection_timeout: Duration,
}

impl FederationConfig {
    /// Starts a component model.
    #[must_use]
    pub fn builder() -> FederationConfigBuilder {
        FederationConfigBuilder::default()
    }

    /// Raw value of a setting.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// Setting parsed as a boolean; unparseable values read as absent.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.parsed(key)
    }

    /// Setting parsed as an unsigned integer; unparseable values read as absent.
    #[must_use]
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.parsed(key)
    }

    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }
}

/// Builder for [`FederationConfig`].
#[derive(Debug)]
pub struct FederationConfigBuilder {
    id: Option<Uuid>,
    realm_id: Option<Uuid>,
    provider_type: Option<String>,
    name: Option<String>,
    config: HashMap<String, String>,
    connection_timeout: Duration,
}

impl Default for FederationConfigBuilder {
    fn default() -> Self {
        Self {
            id: None,
            realm_id: None,
            provider_type: None,
            name: None,
            config: HashMap::new(),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
        }
    }
}

impl FederationConfigBuilder {
    /// Fixes the component id; a fresh one is generated otherwise.
    #[must_use]
    pub const fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the owning realm.
    #[must_use]
    pub const fn realm_id(mut self, realm_id: Uuid) -> Self {
        self.realm_id = Some(realm_id);
        self
    }

    /// Sets the factory id.
    #[must_use]
    pub fn provider_type(mut self, provider_type: impl Into<String>) -> Self {
        self.provider_type = Some(provider_type.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets one setting, replacing any earlier value.
    #[must_use]
    pub fn config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Overrides the five second connection timeout.
    #[must_use]
    pub const fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Finishes the model.
    ///
    /// ## Errors
    ///
    /// Returns [`FederationError::Configuration`] naming the first missing
    /// field among realm, provider type and name.
    pub fn build(self) -> FederationResult<FederationConfig> {
        let missing = |field: &str| FederationError::config(format!("{field} is required"));
        Ok(FederationConfig {
            id: self.id.unwrap_or_else(Uuid::now_v7),
            realm_id: self.realm_id.ok_or_else(|| missing("realm_id"))?,
            provider_type: self.provider_type.ok_or_else(|| missing("provider_type"))?,
            name: self.name.ok_or_else(|| missing("name"))?,
            config: self.config,
            connection_timeout: self.connection_timeout,
        })
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
