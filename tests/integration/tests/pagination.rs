//! Paging every dialect over the 100-user table.
//!
//! PostgreSQL and MySQL windows run on SQLite as generated. Oracle and
//! current SQL Server windows go through [`OffsetFetchOnSqlite`], which only
//! rewrites the trailing window clause; the legacy SQL Server wrapper goes
//! through [`RowNumberOnSqlite`].

use std::collections::HashSet;
use std::sync::Arc;

use kc_federation_sql::{DataSource, Pageable, Rdbms, UserRepository};

use crate::common::{
    self, OffsetFetchOnSqlite, RowNumberOnSqlite, LIST_ALL, LIST_ALL_UNORDERED, USER_COUNT,
};

const PAGE_SIZE: usize = 10;

async fn repository_for(rdbms: Rdbms, list_all: &str) -> anyhow::Result<UserRepository> {
    let source = common::seeded_source().await?;
    let source: Arc<dyn DataSource> = match rdbms {
        Rdbms::Oracle | Rdbms::Mssql => Arc::new(OffsetFetchOnSqlite::new(source)),
        Rdbms::SqlServer => Arc::new(RowNumberOnSqlite::new(source)),
        Rdbms::Postgresql | Rdbms::Mysql => source,
    };
    common::repository(source, rdbms, list_all)
}

/// Reads pages 0..9 and returns the ids in the order they arrived.
async fn page_through(repo: &UserRepository) -> anyhow::Result<Vec<String>> {
    let mut ids = Vec::with_capacity(USER_COUNT);
    for page in 0..USER_COUNT / PAGE_SIZE {
        let pageable = Pageable::new(page * PAGE_SIZE, PAGE_SIZE).expect("non-empty page");
        let rows = repo.list_all(Some(&pageable)).await?;
        assert_eq!(rows.len(), PAGE_SIZE, "page {page} of {:?}", repo.executor().rdbms());
        for row in rows {
            assert!(!row.contains_key("__row_nr__"));
            ids.push(row.get("id").cloned().expect("id column"));
        }
    }
    Ok(ids)
}

fn seeded_ids() -> Vec<String> {
    (1..=USER_COUNT).map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn ordered_pages_cover_every_row_once() -> anyhow::Result<()> {
    for rdbms in Rdbms::ALL {
        let repo = repository_for(rdbms, LIST_ALL).await?;
        assert_eq!(page_through(&repo).await?, seeded_ids(), "{rdbms:?}");
    }
    Ok(())
}

#[tokio::test]
async fn unordered_pages_cover_every_row_once() -> anyhow::Result<()> {
    for rdbms in [Rdbms::SqlServer, Rdbms::Mssql] {
        let repo = repository_for(rdbms, LIST_ALL_UNORDERED).await?;
        let ids = page_through(&repo).await?;

        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(ids.len(), USER_COUNT, "{rdbms:?}");
        assert_eq!(unique.len(), USER_COUNT, "{rdbms:?}");
    }
    Ok(())
}

#[tokio::test]
async fn search_pages_follow_the_template_order() -> anyhow::Result<()> {
    let repo = repository_for(Rdbms::Postgresql, LIST_ALL).await?;

    // user010..user019
    let pageable = Pageable::new(5, 3).expect("non-empty page");
    let rows = repo.search(Some("user01"), Some(&pageable)).await?;
    let ids: Vec<&str> = rows.iter().filter_map(|row| row.get("id")).map(String::as_str).collect();
    assert_eq!(ids, ["15", "16", "17"]);
    Ok(())
}

#[tokio::test]
async fn last_partial_page() -> anyhow::Result<()> {
    let repo = repository_for(Rdbms::Mysql, LIST_ALL).await?;

    let pageable = Pageable::new(95, 10).expect("non-empty page");
    assert_eq!(repo.list_all(Some(&pageable)).await?.len(), 5);

    let pageable = Pageable::new(100, 10).expect("non-empty page");
    assert!(repo.list_all(Some(&pageable)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn legacy_wrapper_keeps_a_top_limited_base() -> anyhow::Result<()> {
    let top = "SELECT TOP(15) id, username, email, firstName, lastName, department FROM users ORDER BY id";
    let repo = repository_for(Rdbms::SqlServer, top).await?;

    let pageable = Pageable::new(10, 10).expect("non-empty page");
    let rows = repo.list_all(Some(&pageable)).await?;
    let ids: Vec<&str> = rows.iter().filter_map(|row| row.get("id")).map(String::as_str).collect();
    assert_eq!(ids, ["11", "12", "13", "14", "15"]);
    Ok(())
}
