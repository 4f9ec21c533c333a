//! Provider flows through the factory, as the host drives them.

use std::sync::Arc;

use chrono::{Duration, Utc};
use kc_core::event::details;
use kc_core::{Event, EventListener, EventType};
use kc_federation::{
    CachedUser, CredentialUpdater, CredentialValidator, InMemoryUserCache, InMemoryUserStore,
    StorageId, UserCache, UserHandle, UserStorageProvider, UserStorageProviderFactory,
};
use kc_federation_sql::{
    DataSource, ProfileUpdateListener, Rdbms, SqlUserStorageProvider, SqlUserStorageProviderFactory,
    SqlxDataSource,
};
use kc_model::{CredentialInput, CredentialType, Realm, User};

use crate::common::{self, username, USER_COUNT};

struct Setup {
    provider: SqlUserStorageProvider,
    source: Arc<SqlxDataSource>,
    cache: Arc<InMemoryUserCache>,
    realm: Realm,
}

async fn setup() -> anyhow::Result<Setup> {
    let source = common::seeded_source().await?;
    let cache = Arc::new(InMemoryUserCache::new());
    let factory = SqlUserStorageProviderFactory::new(cache.clone(), Arc::new(InMemoryUserStore::new()))
        .with_connector({
            let source = source.clone();
            move |_: &kc_federation_sql::ProviderConfig| {
                let source: Arc<dyn DataSource> = source.clone();
                Ok(source)
            }
        });

    let realm = Realm::new("customers");
    let model = common::component(realm.id, "sqlite::memory:", Rdbms::Postgresql)?;
    let provider = factory.create(&model).await?;
    Ok(Setup {
        provider,
        source,
        cache,
        realm,
    })
}

fn storage_id(provider: &SqlUserStorageProvider, external_id: &str) -> String {
    StorageId::new(provider.config().id.to_string(), external_id).to_string()
}

#[tokio::test]
async fn lookups_map_rows_to_users() -> anyhow::Result<()> {
    let Setup { provider, realm, .. } = setup().await?;
    provider.test_connection().await?;

    let user = provider
        .get_user_by_id(&realm, &storage_id(&provider, "12"))
        .await?
        .expect("user 12");
    assert_eq!(user.username, username(12));
    assert_eq!(user.realm_id, realm.id);
    assert_eq!(user.first_name.as_deref(), Some("First12"));
    assert_eq!(user.get_first_attribute("department"), Some("sales"));
    assert_eq!(user.federation_link, Some(provider.config().id.to_string()));

    let by_name = provider.get_user_by_username(&realm, &username(12)).await?.expect("by name");
    assert_eq!(by_name.id, user.id);

    let email = format!("{}@example.com", username(12));
    let by_email = provider.get_user_by_email(&realm, &email).await?.expect("by email");
    assert_eq!(by_email.id, user.id);

    let strict = realm.clone().with_login_with_email_allowed(false);
    assert!(provider.get_user_by_email(&strict, &email).await?.is_none());

    assert!(provider.get_user_by_username(&realm, "nobody").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn search_and_count() -> anyhow::Result<()> {
    let Setup { provider, realm, .. } = setup().await?;

    assert_eq!(provider.count_users(&realm, None).await?, USER_COUNT);
    assert_eq!(provider.count_users(&realm, Some("user00")).await?, 9);

    assert_eq!(provider.search_users(&realm, None, None, None).await?.len(), USER_COUNT);
    assert_eq!(provider.search_users(&realm, None, Some(10), Some(0)).await?.len(), USER_COUNT);

    let page = provider.search_users(&realm, Some("user0"), Some(10), Some(5)).await?;
    let names: Vec<&str> = page.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, ["user011", "user012", "user013", "user014", "user015"]);
    Ok(())
}

#[tokio::test]
async fn password_round_trip() -> anyhow::Result<()> {
    let Setup { provider, realm, .. } = setup().await?;
    let user = provider.get_user_by_username(&realm, &username(8)).await?.expect("user 8");

    assert!(provider.supports_credential_type(CredentialType::Password));
    assert!(!provider.supports_credential_type(CredentialType::Totp));
    assert!(provider.is_configured_for(&realm, &user, CredentialType::Password));

    let updated = provider
        .update_credential(&realm, &user, &CredentialInput::password("correct horse"))
        .await?;
    assert!(updated);

    let valid = provider
        .is_valid(&realm, UserHandle::Live(&user), &CredentialInput::password("correct horse"))
        .await?;
    assert!(valid);

    let wrong = provider
        .is_valid(&realm, UserHandle::Live(&user), &CredentialInput::password("battery staple"))
        .await?;
    assert!(!wrong);

    let totp = provider
        .is_valid(
            &realm,
            UserHandle::Live(&user),
            &CredentialInput::new(CredentialType::Totp, "correct horse"),
        )
        .await?;
    assert!(!totp);

    assert!(provider.disableable_credential_types(&realm, &user).is_empty());
    Ok(())
}

#[tokio::test]
async fn management_is_declined() -> anyhow::Result<()> {
    let Setup { provider, realm, .. } = setup().await?;
    let user = provider.get_user_by_username(&realm, &username(1)).await?.expect("user 1");

    assert!(provider.add_user(&realm, "newcomer").await?.is_none());
    assert!(!provider.remove_user(&realm, &user).await?);
    provider
        .disable_credential_type(&realm, &user, CredentialType::Password)
        .await?;
    Ok(())
}

#[tokio::test]
async fn stale_cache_entry_for_vanished_user_fails_validation() -> anyhow::Result<()> {
    let Setup {
        provider,
        source,
        cache,
        realm,
    } = setup().await?;
    let user = provider.get_user_by_username(&realm, &username(20)).await?.expect("user 20");
    provider
        .update_credential(&realm, &user, &CredentialInput::password("secret"))
        .await?;

    let cached = CachedUser::at(user.clone(), Utc::now() - Duration::seconds(5));
    cache.put(cached.clone());
    source.execute("DELETE FROM users WHERE id = ?", &["20"]).await?;

    let valid = provider
        .is_valid(&realm, UserHandle::Cached(&cached), &CredentialInput::password("secret"))
        .await?;
    assert!(!valid);
    assert!(cache.get(realm.id, &user.id).is_none());
    Ok(())
}

#[tokio::test]
async fn stale_cache_entry_with_changed_email_is_invalidated() -> anyhow::Result<()> {
    let Setup {
        provider,
        source,
        cache,
        realm,
    } = setup().await?;
    let user = provider.get_user_by_username(&realm, &username(21)).await?.expect("user 21");
    provider
        .update_credential(&realm, &user, &CredentialInput::password("secret"))
        .await?;

    let cached = CachedUser::at(user.clone(), Utc::now() - Duration::seconds(5));
    cache.put(cached.clone());
    source
        .execute("UPDATE users SET email = ? WHERE id = ?", &["changed@example.com", "21"])
        .await?;

    let valid = provider
        .is_valid(&realm, UserHandle::Cached(&cached), &CredentialInput::password("secret"))
        .await?;
    assert!(valid);
    assert!(cache.get(realm.id, &user.id).is_none());
    Ok(())
}

#[tokio::test]
async fn fresh_cache_entry_is_trusted() -> anyhow::Result<()> {
    let Setup {
        provider,
        source,
        cache,
        realm,
    } = setup().await?;
    let user = provider.get_user_by_username(&realm, &username(22)).await?.expect("user 22");
    provider
        .update_credential(&realm, &user, &CredentialInput::password("secret"))
        .await?;

    let cached = CachedUser::new(user.clone());
    cache.put(cached.clone());
    source
        .execute("UPDATE users SET email = ? WHERE id = ?", &["changed@example.com", "22"])
        .await?;

    let valid = provider
        .is_valid(&realm, UserHandle::Cached(&cached), &CredentialInput::password("secret"))
        .await?;
    assert!(valid);
    assert!(cache.get(realm.id, &user.id).is_some());
    Ok(())
}

#[tokio::test]
async fn profile_update_event_writes_email_back() -> anyhow::Result<()> {
    let Setup { provider, realm, .. } = setup().await?;
    let provider = Arc::new(provider);
    let listener = ProfileUpdateListener::new(provider.clone());
    let user: User = provider.get_user_by_username(&realm, &username(30)).await?.expect("user 30");

    let event = Event::builder(EventType::UpdateProfile)
        .realm(realm.id)
        .user(user.id.as_str())
        .detail(details::PREVIOUS_EMAIL, user.email.clone().unwrap_or_default())
        .detail(details::UPDATED_EMAIL, "thirty@example.org")
        .build();
    listener.on_event(&event).await;

    let reloaded = provider.get_user_by_id(&realm, &user.id).await?.expect("user 30");
    assert_eq!(reloaded.email.as_deref(), Some("thirty@example.org"));
    Ok(())
}
