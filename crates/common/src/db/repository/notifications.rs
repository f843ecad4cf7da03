use super::{ensure_user, evict, now};
use crate::cache::{keys, Cache};
use crate::db::models::{
    NotificationActiveModel, NotificationColumn, NotificationEntity, UserEntity,
};
use crate::db::DbPool;
use crate::dto::{CreateNotificationRequest, NotificationDto, UpdateNotificationRequest};
use crate::errors::{AppError, Result};
use crate::metrics;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

/// Notification persistence. The full list is served from the cache.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: DbPool,
    cache: Cache,
}

impl NotificationRepository {
    pub fn new(pool: DbPool, cache: Cache) -> Self {
        Self { pool, cache }
    }

    pub async fn create(&self, request: CreateNotificationRequest) -> Result<NotificationDto> {
        let txn = self.pool.write().begin().await?;
        ensure_user(&txn, "userId", &request.user_id).await?;

        let record = NotificationActiveModel {
            message: Set(request.message),
            date_sent: Set(now()),
            is_read: Set(false),
            user_id: Set(request.user_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::NOTIFICATIONS]).await?;
        metrics::record_write("notification", "create");
        info!(notification_id = record.notification_id, "Notification created");

        Ok(record.into())
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<NotificationDto>> {
        let record = NotificationEntity::find_by_id(id).one(self.pool.read()).await?;
        Ok(record.map(NotificationDto::from))
    }

    /// Every notification, read through the cache.
    pub async fn get_all(&self) -> Result<Vec<NotificationDto>> {
        let pool = self.pool.clone();
        self.cache
            .get_or_load(keys::NOTIFICATIONS, || async move {
                let records = NotificationEntity::find()
                    .order_by_asc(NotificationColumn::NotificationId)
                    .all(pool.read())
                    .await?;
                Ok::<_, AppError>(records.into_iter().map(NotificationDto::from).collect())
            })
            .await
    }

    /// Notifications addressed to a user, newest first; `None` when the user does not exist.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Option<Vec<NotificationDto>>> {
        let conn = self.pool.read();
        if UserEntity::find_by_id(user_id.to_string()).one(conn).await?.is_none() {
            return Ok(None);
        }

        let records = NotificationEntity::find()
            .filter(NotificationColumn::UserId.eq(user_id))
            .order_by_desc(NotificationColumn::DateSent)
            .order_by_desc(NotificationColumn::NotificationId)
            .all(conn)
            .await?;
        Ok(Some(records.into_iter().map(NotificationDto::from).collect()))
    }

    /// Replace the text and re-stamp the send time.
    pub async fn update(
        &self,
        id: i32,
        request: UpdateNotificationRequest,
    ) -> Result<Option<NotificationDto>> {
        let txn = self.pool.write().begin().await?;

        let Some(existing) = NotificationEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let mut active = existing.into_active_model();
        active.message = Set(request.message);
        active.date_sent = Set(now());
        if let Some(is_read) = request.is_read {
            active.is_read = Set(is_read);
        }
        let record = active.update(&txn).await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::NOTIFICATIONS]).await?;
        metrics::record_write("notification", "update");
        info!(notification_id = id, "Notification updated");

        Ok(Some(record.into()))
    }

    pub async fn mark_read(&self, id: i32) -> Result<Option<NotificationDto>> {
        let txn = self.pool.write().begin().await?;

        let Some(existing) = NotificationEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };
        if existing.is_read {
            return Ok(Some(existing.into()));
        }

        let mut active = existing.into_active_model();
        active.is_read = Set(true);
        let record = active.update(&txn).await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::NOTIFICATIONS]).await?;
        metrics::record_write("notification", "mark_read");
        info!(notification_id = id, "Notification marked read");

        Ok(Some(record.into()))
    }

    pub async fn delete(&self, id: i32) -> Result<Option<NotificationDto>> {
        let txn = self.pool.write().begin().await?;

        let Some(existing) = NotificationEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };
        NotificationEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::NOTIFICATIONS]).await?;
        metrics::record_write("notification", "delete");
        info!(notification_id = id, "Notification deleted");

        Ok(Some(existing.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FaultyStore;
    use crate::db::repository::fixtures::{insert_user, setup};
    use axum::http::StatusCode;
    use std::sync::Arc;

    async fn seeded() -> (NotificationRepository, DbPool, Cache, String) {
        let (pool, cache) = setup().await;
        let user = insert_user(&pool, "client").await;
        (
            NotificationRepository::new(pool.clone(), cache.clone()),
            pool,
            cache,
            user,
        )
    }

    fn new_notification(user_id: &str, message: &str) -> CreateNotificationRequest {
        CreateNotificationRequest {
            message: message.into(),
            user_id: user_id.into(),
        }
    }

    #[tokio::test]
    async fn test_create_is_unread() {
        let (repo, _, _, user) = seeded().await;
        let created = repo.create(new_notification(&user, "Case assigned")).await.unwrap();
        assert!(created.notification_id > 0);
        assert!(!created.is_read);
        assert_eq!(repo.get_by_id(created.notification_id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let (repo, _, _, _) = seeded().await;
        let err = repo.create(new_notification("ghost", "hi")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_get_all_is_cached_until_a_write() {
        let (repo, pool, _, user) = seeded().await;
        repo.create(new_notification(&user, "first")).await.unwrap();
        assert_eq!(repo.get_all().await.unwrap().len(), 1);

        // A row written behind the repository's back is not visible while cached
        NotificationActiveModel {
            message: Set("out of band".into()),
            date_sent: Set(now()),
            is_read: Set(false),
            user_id: Set(user.clone()),
            ..Default::default()
        }
        .insert(pool.write())
        .await
        .unwrap();
        assert_eq!(repo.get_all().await.unwrap().len(), 1);

        // Any write through the repository evicts the list
        repo.create(new_notification(&user, "second")).await.unwrap();
        assert_eq!(repo.get_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_eviction_fails_the_write() {
        let (_, pool, _, user) = seeded().await;
        let repo = NotificationRepository::new(
            pool.clone(),
            Cache::new(Arc::new(FaultyStore::failing_remove())),
        );
        assert!(repo.get_all().await.unwrap().is_empty());

        let err = repo.create(new_notification(&user, "hearing moved")).await.unwrap_err();
        assert!(matches!(err, AppError::CacheError { .. }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        // The row itself is committed
        assert_eq!(repo.list_for_user(&user).await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_cache_serves_rows_from_database() {
        let (_, pool, _, user) = seeded().await;
        let repo = NotificationRepository::new(
            pool.clone(),
            Cache::new(Arc::new(FaultyStore::failing_get())),
        );
        repo.create(new_notification(&user, "first")).await.unwrap();
        repo.create(new_notification(&user, "second")).await.unwrap();

        let listed = repo.get_all().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].message, "second");
    }

    #[tokio::test]
    async fn test_update_restamps_and_evicts() {
        let (repo, _, cache, user) = seeded().await;
        let created = repo.create(new_notification(&user, "old")).await.unwrap();
        repo.get_all().await.unwrap();

        let updated = repo
            .update(
                created.notification_id,
                UpdateNotificationRequest {
                    message: "new".into(),
                    is_read: None,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.message, "new");
        assert!(!updated.is_read);
        assert!(updated.date_sent >= created.date_sent);

        assert!(cache
            .get::<Vec<NotificationDto>>(keys::NOTIFICATIONS)
            .await
            .unwrap()
            .is_none());
        assert_eq!(repo.get_all().await.unwrap()[0].message, "new");
    }

    #[tokio::test]
    async fn test_mark_read_and_list_for_user() {
        let (repo, pool, _, user) = seeded().await;
        let other = insert_user(&pool, "other").await;
        let mine = repo.create(new_notification(&user, "mine")).await.unwrap();
        repo.create(new_notification(&other, "theirs")).await.unwrap();

        let read = repo.mark_read(mine.notification_id).await.unwrap().unwrap();
        assert!(read.is_read);

        let listed = repo.list_for_user(&user).await.unwrap().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_read);

        assert!(repo.list_for_user("ghost").await.unwrap().is_none());
        assert!(repo.mark_read(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let (repo, _, _, user) = seeded().await;
        let created = repo.create(new_notification(&user, "bye")).await.unwrap();
        assert!(repo.delete(created.notification_id).await.unwrap().is_some());
        assert!(repo.get_all().await.unwrap().is_empty());
        assert!(repo.delete(created.notification_id).await.unwrap().is_none());
    }
}
