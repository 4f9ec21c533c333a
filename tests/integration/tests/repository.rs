//! Repository operations against SQLite.

use kc_federation_sql::{Pageable, Rdbms, SqlFederationError};

use crate::common::{self, username, LIST_ALL, USER_COUNT};

#[tokio::test]
async fn counts_every_user() -> anyhow::Result<()> {
    let repo = common::repository(common::seeded_source().await?, Rdbms::Postgresql, LIST_ALL)?;

    assert_eq!(repo.count_all().await?, USER_COUNT);
    assert_eq!(repo.count(None).await?, USER_COUNT);
    assert_eq!(repo.count(Some("  ")).await?, USER_COUNT);
    Ok(())
}

#[tokio::test]
async fn matching_count_equals_search_length() -> anyhow::Result<()> {
    let repo = common::repository(common::seeded_source().await?, Rdbms::Mysql, LIST_ALL)?;

    for term in ["user00", "user01", "user099", "nobody"] {
        let found = repo.search(Some(term), None).await?;
        assert_eq!(repo.count_matching(term).await?, found.len(), "term {term}");
    }
    assert_eq!(repo.count(Some("user00")).await?, 9);
    assert_eq!(repo.count(Some("user01")).await?, 10);
    Ok(())
}

#[tokio::test]
async fn blank_search_lists_all() -> anyhow::Result<()> {
    let repo = common::repository(common::seeded_source().await?, Rdbms::Postgresql, LIST_ALL)?;
    let page = Pageable::new(20, 10);

    for pageable in [None, page.as_ref()] {
        let all = repo.list_all(pageable).await?;
        assert_eq!(repo.search(Some(""), pageable).await?, all);
        assert_eq!(repo.search(None, pageable).await?, all);
        assert_eq!(repo.search(Some("   "), pageable).await?, all);
    }
    Ok(())
}

#[tokio::test]
async fn lookups() -> anyhow::Result<()> {
    let repo = common::repository(common::seeded_source().await?, Rdbms::Postgresql, LIST_ALL)?;

    let by_id = repo.find_by_id("42").await?.expect("user 42");
    assert_eq!(by_id.get("username"), Some(&username(42)));
    assert_eq!(by_id.get("department").map(String::as_str), Some("sales"));
    assert!(!by_id.contains_key("lastName"));

    assert!(repo.find_by_id("4242").await?.is_none());

    let email = format!("{}@example.com", username(7));
    let by_email = repo.find_by_login_name(&email, true).await?.expect("user 7");
    assert_eq!(by_email.get("id").map(String::as_str), Some("7"));
    assert!(repo.find_by_login_name(&email, false).await?.is_none());
    assert!(repo.find_by_login_name(&username(7), false).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn password_rotation_and_validation() -> anyhow::Result<()> {
    let repo = common::repository(common::seeded_source().await?, Rdbms::Postgresql, LIST_ALL)?;
    let user = username(3);

    // no stored hash yet
    assert!(!repo.validate_credentials(&user, "secret", false).await?);

    assert!(repo.update_credentials(&user, "secret").await?);
    assert!(repo.validate_credentials(&user, "secret", false).await?);
    assert!(repo.validate_credentials(&format!("{user}@example.com"), "secret", true).await?);
    assert!(!repo.validate_credentials(&user, "Secret", false).await?);
    assert!(!repo.validate_credentials("nobody", "secret", true).await?);

    assert!(repo.update_credentials(&user, "rotated").await?);
    assert!(!repo.validate_credentials(&user, "secret", false).await?);
    assert!(repo.validate_credentials(&user, "rotated", false).await?);
    Ok(())
}

#[tokio::test]
async fn email_update() -> anyhow::Result<()> {
    let repo = common::repository(common::seeded_source().await?, Rdbms::Mysql, LIST_ALL)?;

    assert!(repo.update_email(&username(5), "moved@example.com").await?);
    let row = repo.find_by_id("5").await?.expect("user 5");
    assert_eq!(row.get("email").map(String::as_str), Some("moved@example.com"));
    Ok(())
}

#[tokio::test]
async fn outages_read_as_no_data() -> anyhow::Result<()> {
    let source = common::seeded_source().await?;
    let repo = common::repository(source.clone(), Rdbms::Postgresql, LIST_ALL)?;
    kc_federation_sql::DataSource::close(source.as_ref()).await;

    assert!(repo.find_by_id("1").await?.is_none());
    assert!(repo.list_all(None).await?.is_empty());
    assert_eq!(repo.count_all().await?, 0);
    assert!(!repo.update_email(&username(1), "x@example.com").await?);
    assert!(!repo.validate_credentials(&username(1), "secret", false).await?);
    assert!(repo.test_connection().await.is_err());
    Ok(())
}

#[tokio::test]
async fn mismatched_parameters_fail() -> anyhow::Result<()> {
    let source = common::seeded_source().await?;
    let executor = kc_federation_sql::executor::QueryExecutor::new(source, Rdbms::Mysql);

    let updated = executor
        .update(
            "UPDATE users SET email = ? WHERE username = ?",
            &["two@example.com", username(2).as_str()],
        )
        .await?;
    assert!(updated);

    let err = executor
        .update("UPDATE users SET email = ? WHERE username = ?", &["two@example.com"])
        .await
        .unwrap_err();
    assert!(matches!(err, SqlFederationError::ParameterCount { expected: 2, actual: 1 }));
    Ok(())
}

#[tokio::test]
async fn connection_check_succeeds() -> anyhow::Result<()> {
    let repo = common::repository(common::seeded_source().await?, Rdbms::Mysql, LIST_ALL)?;
    repo.test_connection().await?;
    Ok(())
}
