use super::evict;
use crate::cache::{keys, Cache};
use crate::db::models::{
    CaseColumn, CaseEntity, MessageColumn, MessageEntity, NotificationColumn, NotificationEntity,
    RoleEntity, UserEntity, UserRoleColumn, UserRoleEntity,
};
use crate::db::DbPool;
use crate::dto::UserProfile;
use crate::errors::{AppError, Result};
use crate::metrics;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    TransactionTrait,
};
use tracing::{info, warn};

/// Account removal with the same delete rules as the schema's foreign keys.
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
    cache: Cache,
}

impl UserRepository {
    pub fn new(pool: DbPool, cache: Cache) -> Self {
        Self { pool, cache }
    }

    /// Delete a user. Refused while the user created or is assigned a case, or
    /// has sent a message. Notifications and role memberships go with the user.
    pub async fn delete(&self, id: &str) -> Result<Option<UserProfile>> {
        let txn = self.pool.write().begin().await?;

        let Some(record) = UserEntity::find_by_id(id.to_string()).one(&txn).await? else {
            return Ok(None);
        };

        let cases = CaseEntity::find()
            .filter(
                Condition::any()
                    .add(CaseColumn::CreatedById.eq(id))
                    .add(CaseColumn::AssignedToId.eq(id)),
            )
            .count(&txn)
            .await?;
        if cases > 0 {
            warn!(user_id = id, cases, "User delete refused: referenced by cases");
            return Err(AppError::Conflict {
                message: format!("User is referenced by {} case(s)", cases),
            });
        }

        let messages = MessageEntity::find()
            .filter(MessageColumn::SenderId.eq(id))
            .count(&txn)
            .await?;
        if messages > 0 {
            warn!(user_id = id, messages, "User delete refused: has sent messages");
            return Err(AppError::Conflict {
                message: format!("User has sent {} message(s)", messages),
            });
        }

        let roles = record
            .find_related(RoleEntity)
            .all(&txn)
            .await?
            .into_iter()
            .map(|role| role.name)
            .collect();

        let notifications = NotificationEntity::delete_many()
            .filter(NotificationColumn::UserId.eq(id))
            .exec(&txn)
            .await?;
        UserRoleEntity::delete_many()
            .filter(UserRoleColumn::UserId.eq(id))
            .exec(&txn)
            .await?;
        UserEntity::delete_by_id(id.to_string()).exec(&txn).await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::NOTIFICATIONS]).await?;
        metrics::record_write("user", "delete");
        info!(
            user_id = id,
            notifications = notifications.rows_affected,
            "User deleted"
        );

        Ok(Some(UserProfile {
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            phone_number: record.phone_number,
            roles,
        }))
    }
}
