//! Provider factory and per-component registry.
//!
//! Each configured component owns one instance: its validated
//! templates and an executor over its own pool. Instances live in a registry
//! keyed by component id behind a single mutex. Reconfiguration replaces an
//! instance wholesale; the previous pool is closed after the replacement is
//! installed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kc_federation::{
    FederationConfig, FederationError, FederationResult, ImportSynchronization, LocalUserStore,
    SyncResult, UserCache, UserStorageProviderFactory,
};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::config::{ProviderConfig, QueryConfigurations};
use crate::datasource::{DataSource, SqlxDataSource};
use crate::error::SqlResult;
use crate::executor::QueryExecutor;
use crate::mapper::SqlUserAttributeMapper;
use crate::provider::SqlUserStorageProvider;
use crate::repository::UserRepository;
use crate::sync::synchronize;

/// Provider type identifier.
pub const PROVIDER_ID: &str = "sql-db-user-provider";

/// Help text shown next to the provider.
pub const HELP_TEXT: &str = "User federation against an external SQL database. \
    Every query must return at least the columns \"id\" and \"username\", and \
    optionally \"email\", \"firstName\" and \"lastName\". Any other column is \
    mapped to a user attribute. Credential queries return \"hash\" and \"salt\".";

/// Opens a data source for a component.
pub type Connector = Arc<dyn Fn(&ProviderConfig) -> SqlResult<Arc<dyn DataSource>> + Send + Sync>;

/// Validated state for one component.
#[derive(Debug)]
struct ProviderInstance {
    queries: Arc<QueryConfigurations>,
    executor: QueryExecutor,
}

impl ProviderInstance {
    fn repository(&self) -> UserRepository {
        UserRepository::new(self.executor.clone(), self.queries.clone())
    }
}

// ============================================================================
// SQL User Storage Provider Factory
// ============================================================================

/// Creates [`SqlUserStorageProvider`]s and runs reconciliation.
pub struct SqlUserStorageProviderFactory {
    instances: Mutex<HashMap<Uuid, Arc<ProviderInstance>>>,
    cache: Arc<dyn UserCache>,
    store: Arc<dyn LocalUserStore>,
    connector: Connector,
}

impl std::fmt::Debug for SqlUserStorageProviderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlUserStorageProviderFactory")
            .field("instances", &self.instances.lock().len())
            .finish_non_exhaustive()
    }
}

impl SqlUserStorageProviderFactory {
    /// Creates a factory that opens sqlx pools.
    #[must_use]
    pub fn new(cache: Arc<dyn UserCache>, store: Arc<dyn LocalUserStore>) -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            cache,
            store,
            connector: Arc::new(|config: &ProviderConfig| {
                let source: Arc<dyn DataSource> =
                    Arc::new(SqlxDataSource::connect_lazy(&config.connection)?);
                Ok(source)
            }),
        }
    }

    /// Replaces the way data sources are opened.
    ///
    /// Hosts use this to plug in drivers sqlx does not ship.
    #[must_use]
    pub fn with_connector<F>(mut self, connector: F) -> Self
    where
        F: Fn(&ProviderConfig) -> SqlResult<Arc<dyn DataSource>> + Send + Sync + 'static,
    {
        self.connector = Arc::new(connector);
        self
    }

    /// Returns the number of configured components.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.lock().len()
    }

    fn build_instance(&self, model: &FederationConfig) -> FederationResult<ProviderInstance> {
        let config = ProviderConfig::from_component(model)
            .map_err(|e| FederationError::config(e.to_string()))?;
        let data_source =
            (self.connector)(&config).map_err(|e| FederationError::config(e.to_string()))?;
        let rdbms = config.queries.rdbms();

        tracing::debug!(
            component = %model.id,
            rdbms = rdbms.description(),
            hash_function = config.queries.hash_function(),
            "Configured SQL provider instance"
        );

        Ok(ProviderInstance {
            queries: Arc::new(config.queries),
            executor: QueryExecutor::new(data_source, rdbms),
        })
    }

    fn instance(&self, model: &FederationConfig) -> FederationResult<Arc<ProviderInstance>> {
        let mut instances = self.instances.lock();
        if let Some(instance) = instances.get(&model.id) {
            return Ok(instance.clone());
        }
        let instance = Arc::new(self.build_instance(model)?);
        instances.insert(model.id, instance.clone());
        Ok(instance)
    }
}

impl UserStorageProviderFactory for SqlUserStorageProviderFactory {
    type Provider = SqlUserStorageProvider;

    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn help_text(&self) -> &'static str {
        HELP_TEXT
    }

    async fn create(&self, model: &FederationConfig) -> FederationResult<SqlUserStorageProvider> {
        let instance = self.instance(model)?;
        Ok(SqlUserStorageProvider::new(
            model.clone(),
            instance.repository(),
            self.cache.clone(),
        ))
    }

    async fn validate_configuration(&self, model: &FederationConfig) -> FederationResult<()> {
        let instance = Arc::new(self.build_instance(model).inspect_err(|e| {
            tracing::warn!(component = %model.id, error = %e, "Rejected SQL provider configuration");
        })?);
        let previous = self.instances.lock().insert(model.id, instance);

        if let Some(previous) = previous {
            tracing::info!(component = %model.id, "Replaced SQL provider configuration");
            previous.executor.close().await;
        }
        Ok(())
    }

    async fn close(&self) {
        let drained: Vec<_> = self.instances.lock().drain().collect();
        for (component, instance) in drained {
            tracing::debug!(component = %component, "Closing SQL provider pool");
            instance.executor.close().await;
        }
    }
}

impl ImportSynchronization for SqlUserStorageProviderFactory {
    async fn sync(&self, realm_id: Uuid, model: &FederationConfig) -> FederationResult<SyncResult> {
        let instance = self.instance(model)?;
        let mapper = SqlUserAttributeMapper::new(model.id.to_string());
        synchronize(
            &instance.repository(),
            &mapper,
            self.store.as_ref(),
            self.cache.as_ref(),
            realm_id,
        )
        .await
    }

    async fn sync_since(
        &self,
        last_sync: DateTime<Utc>,
        realm_id: Uuid,
        model: &FederationConfig,
    ) -> FederationResult<SyncResult> {
        tracing::info!(last_sync = %last_sync, "Changed-user sync runs as a full sync");
        self.sync(realm_id, model).await
    }
}
