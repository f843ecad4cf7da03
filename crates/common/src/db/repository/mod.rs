//! Repositories for each aggregate
//!
//! Each repository translates entities to transport DTOs and owns the cache
//! key of its entity type. Every write runs in one transaction holding its
//! reference checks and cascade/restrict logic, then evicts the key once the
//! transaction has committed. Absence is `Ok(None)`, never an error.

mod cases;
mod documents;
mod messages;
mod notifications;
mod users;

pub use cases::CaseRepository;
pub use documents::DocumentRepository;
pub use messages::MessageRepository;
pub use notifications::NotificationRepository;
pub use users::UserRepository;

use crate::cache::Cache;
use crate::db::models::{CaseEntity, UserEntity};
use crate::errors::{AppError, Result};
use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::{ConnectionTrait, EntityTrait};
use tracing::error;

/// Server-assigned timestamp, truncated to what every backend stores
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Drop cached results for the given keys after a committed write.
///
/// Every key is attempted; the first failure is returned so the caller does
/// not report success while a stale entry survives.
pub(crate) async fn evict(cache: &Cache, keys: &[&str]) -> Result<()> {
    let mut failure = None;
    for key in keys {
        if let Err(e) = cache.remove(key).await {
            error!(error = %e, key, "Failed to evict cache key after write");
            failure.get_or_insert(e);
        }
    }
    failure.map_or(Ok(()), Err)
}

/// Fail with a validation error unless the referenced user exists
pub(crate) async fn ensure_user<C: ConnectionTrait>(conn: &C, field: &str, user_id: &str) -> Result<()> {
    match UserEntity::find_by_id(user_id.to_string()).one(conn).await? {
        Some(_) => Ok(()),
        None => Err(AppError::invalid_field(
            field,
            format!("User '{}' does not exist", user_id),
        )),
    }
}

/// Fail with a validation error unless the referenced case exists
pub(crate) async fn ensure_case<C: ConnectionTrait>(conn: &C, case_id: i32) -> Result<()> {
    match CaseEntity::find_by_id(case_id).one(conn).await? {
        Some(_) => Ok(()),
        None => Err(AppError::invalid_field(
            "caseId",
            format!("Case {} does not exist", case_id),
        )),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::cache::Cache;
    use crate::db::models::UserActiveModel;
    use crate::db::DbPool;
    use sea_orm::{ActiveModelTrait, Set};
    use std::time::Duration;

    pub async fn setup() -> (DbPool, Cache) {
        let pool = DbPool::in_memory().await.unwrap();
        let cache = Cache::in_memory(1_000, Duration::from_secs(600));
        (pool, cache)
    }

    /// Insert a user row directly; returns its id
    pub async fn insert_user(pool: &DbPool, id: &str) -> String {
        UserActiveModel {
            id: Set(id.to_string()),
            email: Set(format!("{}@firm.test", id)),
            first_name: Set("Test".into()),
            last_name: Set(id.to_string()),
            phone_number: Set(None),
            password_hash: Set("unused".into()),
            created_at: Set(super::now()),
        }
        .insert(pool.write())
        .await
        .unwrap();
        id.to_string()
    }
}
