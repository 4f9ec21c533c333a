//! Reconciliation of imported users with the database.
//!
//! A full pass reads every user through the list-all template and copies
//! changed profile columns (email, first name, last name) onto the user the
//! host imported earlier. The whole pass runs in one local transaction;
//! any error rolls it back.

use kc_federation::{
    FederationResult, LocalUserStore, LocalUserTransaction, SyncError, SyncResult, UserCache,
};
use uuid::Uuid;

use crate::executor::UserRow;
use crate::mapper::{columns, SqlUserAttributeMapper};
use crate::repository::UserRepository;

/// Runs one full reconciliation pass for a realm.
///
/// Rows without a matching imported user are recorded as failures and
/// skipped. The host cache is cleared before the transaction commits.
///
/// # Errors
///
/// Returns the first repository or local store error, after rolling the
/// transaction back.
pub async fn synchronize(
    repository: &UserRepository,
    mapper: &SqlUserAttributeMapper,
    store: &dyn LocalUserStore,
    cache: &dyn UserCache,
    realm_id: Uuid,
) -> FederationResult<SyncResult> {
    tracing::info!(realm_id = %realm_id, component = mapper.provider_id(), "Syncing federated users");

    let mut tx = store.begin().await?;
    let scanned = scan(repository, mapper, tx.as_mut(), realm_id, SyncResult::started()).await;

    match scanned {
        Ok(result) => {
            cache.clear();
            tx.commit().await?;
            let result = result.complete();
            tracing::info!(realm_id = %realm_id, status = %result.status, "Sync finished");
            Ok(result)
        }
        Err(e) => {
            tracing::error!(realm_id = %realm_id, error = %e, "Sync failed, rolling back");
            if let Err(rollback) = tx.rollback().await {
                tracing::error!(error = %rollback, "Rollback failed");
            }
            Err(e)
        }
    }
}

async fn scan(
    repository: &UserRepository,
    mapper: &SqlUserAttributeMapper,
    tx: &mut dyn LocalUserTransaction,
    realm_id: Uuid,
    mut result: SyncResult,
) -> FederationResult<SyncResult> {
    let rows = repository.list_all(None).await?;
    tracing::info!(count = rows.len(), "Users to sync");

    for row in &rows {
        let external_id = row.get(columns::ID).map_or("", String::as_str);
        let Some(username) = row.get(columns::USERNAME) else {
            result.record_failure(SyncError::new(external_id, "row has no username"));
            continue;
        };

        let Some(mut user) = tx.get_user_by_username(realm_id, username).await? else {
            result.record_failure(
                SyncError::new(external_id, "no imported user").with_username(username.as_str()),
            );
            continue;
        };

        if apply(mapper, &mut user, row) {
            tx.update_user(&user).await?;
            result.record_updated();
        }
    }

    Ok(result)
}

fn apply(mapper: &SqlUserAttributeMapper, user: &mut kc_model::User, row: &UserRow) -> bool {
    let before = (user.email.clone(), user.first_name.clone(), user.last_name.clone());
    let changed = mapper.update_user(user, row);
    if changed {
        tracing::debug!(
            username = %user.username,
            email_changed = before.0 != user.email,
            first_name_changed = before.1 != user.first_name,
            last_name_changed = before.2 != user.last_name,
            "Updated imported user"
        );
    }
    changed
}
