//! Runs the provider against a real PostgreSQL server.
//!
//! Needs Docker; run with `--ignored`.

use std::sync::Arc;

use kc_federation::{
    InMemoryUserCache, InMemoryUserStore, UserStorageProvider, UserStorageProviderFactory,
};
use kc_federation_sql::config::keys;
use kc_federation_sql::{Pageable, Rdbms, SqlUserStorageProviderFactory};
use kc_model::Realm;
use testcontainers::runners::AsyncRunner;
use testcontainers::ImageExt;
use testcontainers_modules::postgres::Postgres;

// The Any driver reads text, integers and floats, so columns are cast.
const SELECT: &str = "SELECT id::text AS id, username, email, first_name AS \"firstName\" FROM users";

#[tokio::test]
#[ignore = "requires Docker"]
async fn postgres_end_to_end() -> anyhow::Result<()> {
    crate::common::init_tracing();

    let postgres = Postgres::default().with_tag("16-alpine").start().await?;
    let port = postgres.get_host_port_ipv4(5432).await?;
    let url = format!("postgres://127.0.0.1:{port}/postgres");

    let realm = Realm::new("customers");
    let model = kc_federation::FederationConfig::builder()
        .realm_id(realm.id)
        .provider_type(kc_federation_sql::PROVIDER_ID)
        .name("postgres users")
        .config(keys::URL, url.as_str())
        .config(keys::USER, "postgres")
        .config(keys::PASSWORD, "postgres")
        .config(keys::RDBMS, Rdbms::Postgresql.description())
        .config(keys::COUNT, "SELECT COUNT(*)::int AS count FROM users")
        .config(keys::LIST_ALL, format!("{SELECT} ORDER BY id"))
        .config(keys::FIND_BY_ID, format!("{SELECT} WHERE id::text = ?"))
        .config(keys::FIND_BY_USERNAME, format!("{SELECT} WHERE username = ?"))
        .config(keys::FIND_BY_USERNAME_OR_EMAIL, format!("{SELECT} WHERE ? IN (username, email)"))
        .config(
            keys::FIND_BY_SEARCH_TERM,
            format!("{SELECT} WHERE username LIKE '%' || ? || '%' ORDER BY id"),
        )
        .config(keys::FIND_PASSWORD_HASH, "SELECT hash, salt FROM users WHERE ? IN (username, email)")
        .config(keys::FIND_PASSWORD_HASH_USERNAME_ONLY, "SELECT hash, salt FROM users WHERE username = ?")
        .config(keys::UPDATE_CREDENTIALS, "UPDATE users SET hash = ?, salt = ? WHERE username = ?")
        .config(keys::UPDATE_EMAIL_ADDRESS, "UPDATE users SET email = ? WHERE username = ?")
        .build()?;

    let factory = SqlUserStorageProviderFactory::new(
        Arc::new(InMemoryUserCache::new()),
        Arc::new(InMemoryUserStore::new()),
    );
    let provider = factory.create(&model).await?;
    let repository = provider.repository();

    let executor = repository.executor();
    executor
        .update(
            "CREATE TABLE users (id SERIAL PRIMARY KEY, username TEXT UNIQUE NOT NULL, \
             email TEXT, first_name TEXT, hash TEXT, salt TEXT)",
            &[],
        )
        .await?;
    for n in 1..=25 {
        let username = format!("user{n:03}");
        let email = format!("{username}@example.com");
        executor
            .update(
                "INSERT INTO users (username, email) VALUES (?, ?)",
                &[username.as_str(), email.as_str()],
            )
            .await?;
    }

    provider.test_connection().await?;
    assert_eq!(provider.count_users(&realm, None).await?, 25);
    assert_eq!(repository.count_matching("user01").await?, 10);

    let page = Pageable::new(20, 10).expect("non-empty page");
    assert_eq!(repository.list_all(Some(&page)).await?.len(), 5);

    assert!(repository.update_credentials("user003", "secret").await?);
    assert!(repository.validate_credentials("user003@example.com", "secret", true).await?);

    factory.close().await;
    Ok(())
}
