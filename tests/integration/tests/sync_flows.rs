//! Reconciliation of imported users through the factory.

use std::sync::Arc;

use kc_federation::{
    CachedUser, ImportSynchronization, InMemoryUserCache, InMemoryUserStore, UserCache,
};
use kc_federation_sql::{DataSource, ProviderConfig, Rdbms, SqlUserStorageProviderFactory};
use kc_model::User;
use uuid::Uuid;

use crate::common::{self, username};

struct Setup {
    factory: SqlUserStorageProviderFactory,
    source: Arc<kc_federation_sql::SqlxDataSource>,
    store: InMemoryUserStore,
    cache: Arc<InMemoryUserCache>,
}

async fn setup() -> anyhow::Result<Setup> {
    let source = common::seeded_source().await?;
    let store = InMemoryUserStore::new();
    let cache = Arc::new(InMemoryUserCache::new());
    let factory = SqlUserStorageProviderFactory::new(cache.clone(), Arc::new(store.clone()))
        .with_connector({
            let source = source.clone();
            move |_: &ProviderConfig| {
                let source: Arc<dyn DataSource> = source.clone();
                Ok(source)
            }
        });
    Ok(Setup {
        factory,
        source,
        store,
        cache,
    })
}

#[tokio::test]
async fn changed_email_is_copied_to_the_imported_user() -> anyhow::Result<()> {
    let Setup {
        factory,
        source,
        store,
        cache,
    } = setup().await?;
    let realm_id = Uuid::now_v7();
    let model = common::component(realm_id, "sqlite::memory:", Rdbms::Mysql)?;

    source
        .execute(
            "INSERT INTO users (id, username, email, firstName) VALUES (?, ?, ?, NULL)",
            &["1000", "jdoe", "new@x.com"],
        )
        .await?;
    store.insert(User::new(realm_id, "jdoe").with_email("old@x.com").with_first_name("John"));
    cache.put(CachedUser::new(User::new(realm_id, "jdoe")));

    let result = factory.sync(realm_id, &model).await?;

    let jdoe = store.get(realm_id, "jdoe").expect("imported user");
    assert_eq!(jdoe.email.as_deref(), Some("new@x.com"));
    assert_eq!(jdoe.first_name.as_deref(), Some("John"));
    assert_eq!(result.updated, 1);
    assert!(cache.is_empty());
    Ok(())
}

#[tokio::test]
async fn unchanged_users_are_not_counted() -> anyhow::Result<()> {
    let Setup { factory, store, .. } = setup().await?;
    let realm_id = Uuid::now_v7();
    let model = common::component(realm_id, "sqlite::memory:", Rdbms::Postgresql)?;

    for n in 1..=3 {
        let name = username(n);
        store.insert(
            User::new(realm_id, name.as_str())
                .with_email(format!("{name}@example.com"))
                .with_first_name(format!("First{n}")),
        );
    }
    store.insert(User::new(realm_id, username(4)).with_email("stale@example.com"));

    let result = factory.sync(realm_id, &model).await?;

    assert_eq!(result.updated, 1);
    assert_eq!(
        store.get(realm_id, &username(4)).and_then(|u| u.first_name).as_deref(),
        Some("First4")
    );
    // rows 5..=100 have no imported user
    assert_eq!(result.failed, 96);
    Ok(())
}

#[tokio::test]
async fn sync_since_runs_a_full_sync() -> anyhow::Result<()> {
    let Setup { factory, store, .. } = setup().await?;
    let realm_id = Uuid::now_v7();
    let model = common::component(realm_id, "sqlite::memory:", Rdbms::Postgresql)?;
    store.insert(User::new(realm_id, username(9)));

    let result = factory
        .sync_since(chrono::Utc::now(), realm_id, &model)
        .await?;

    assert_eq!(result.updated, 1);
    let user = store.get(realm_id, &username(9)).expect("imported user");
    assert_eq!(user.email, Some(format!("{}@example.com", username(9))));
    Ok(())
}
