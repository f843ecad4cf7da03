use super::{ensure_case, ensure_user, evict, now};
use crate::cache::{keys, Cache};
use crate::db::models::{CaseEntity, MessageActiveModel, MessageColumn, MessageEntity};
use crate::db::DbPool;
use crate::dto::{CreateMessageRequest, MessageDto, UpdateMessageRequest};
use crate::errors::{AppError, Result};
use crate::metrics;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

fn require_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(AppError::invalid_field("content", "Message content cannot be empty"));
    }
    Ok(())
}

/// Case message persistence
#[derive(Clone)]
pub struct MessageRepository {
    pool: DbPool,
    cache: Cache,
}

impl MessageRepository {
    pub fn new(pool: DbPool, cache: Cache) -> Self {
        Self { pool, cache }
    }

    /// Post a message on a case. Sender and case must exist.
    pub async fn create(&self, request: CreateMessageRequest) -> Result<MessageDto> {
        require_content(&request.content)?;

        let txn = self.pool.write().begin().await?;
        ensure_case(&txn, request.case_id).await?;
        ensure_user(&txn, "senderId", &request.sender_id).await?;

        let record = MessageActiveModel {
            content: Set(request.content),
            date_sent: Set(now()),
            sender_id: Set(request.sender_id),
            case_id: Set(request.case_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::MESSAGES]).await?;
        metrics::record_write("message", "create");
        info!(message_id = record.message_id, case_id = record.case_id, "Message created");

        Ok(record.into())
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<MessageDto>> {
        let record = MessageEntity::find_by_id(id).one(self.pool.read()).await?;
        Ok(record.map(MessageDto::from))
    }

    pub async fn get_all(&self) -> Result<Vec<MessageDto>> {
        let records = MessageEntity::find()
            .order_by_asc(MessageColumn::MessageId)
            .all(self.pool.read())
            .await?;
        Ok(records.into_iter().map(MessageDto::from).collect())
    }

    /// Messages of a case, oldest first; `None` when the case does not exist.
    pub async fn list_for_case(&self, case_id: i32) -> Result<Option<Vec<MessageDto>>> {
        let conn = self.pool.read();
        if CaseEntity::find_by_id(case_id).one(conn).await?.is_none() {
            return Ok(None);
        }

        let records = MessageEntity::find()
            .filter(MessageColumn::CaseId.eq(case_id))
            .order_by_asc(MessageColumn::DateSent)
            .order_by_asc(MessageColumn::MessageId)
            .all(conn)
            .await?;
        Ok(Some(records.into_iter().map(MessageDto::from).collect()))
    }

    /// Replace the content. Sender, case and send time are kept.
    pub async fn update(&self, id: i32, request: UpdateMessageRequest) -> Result<Option<MessageDto>> {
        require_content(&request.content)?;

        let txn = self.pool.write().begin().await?;
        let Some(existing) = MessageEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let mut active = existing.into_active_model();
        active.content = Set(request.content);
        let record = active.update(&txn).await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::MESSAGES]).await?;
        metrics::record_write("message", "update");
        info!(message_id = id, "Message updated");

        Ok(Some(record.into()))
    }

    pub async fn delete(&self, id: i32) -> Result<Option<MessageDto>> {
        let txn = self.pool.write().begin().await?;

        let Some(existing) = MessageEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };
        MessageEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::MESSAGES]).await?;
        metrics::record_write("message", "delete");
        info!(message_id = id, "Message deleted");

        Ok(Some(existing.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::{insert_user, setup};
    use crate::db::repository::CaseRepository;
    use crate::dto::CreateCaseRequest;

    struct Fixture {
        repo: MessageRepository,
        case_id: i32,
        sender: String,
    }

    async fn seeded() -> Fixture {
        let (pool, cache) = setup().await;
        let sender = insert_user(&pool, "paralegal").await;
        let case = CaseRepository::new(pool.clone(), cache.clone())
            .create(CreateCaseRequest {
                title: "People v. Roe".into(),
                description: String::new(),
                created_by_id: Some(sender.clone()),
                assigned_to_id: None,
            })
            .await
            .unwrap();
        Fixture {
            repo: MessageRepository::new(pool, cache),
            case_id: case.case_id,
            sender,
        }
    }

    fn new_message(f: &Fixture, content: &str) -> CreateMessageRequest {
        CreateMessageRequest {
            content: content.into(),
            sender_id: f.sender.clone(),
            case_id: f.case_id,
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let f = seeded().await;
        let created = f.repo.create(new_message(&f, "Hearing at 9am")).await.unwrap();
        assert!(created.message_id > 0);
        assert_eq!(f.repo.get_by_id(created.message_id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_blank_content_rejected() {
        let f = seeded().await;
        let err = f.repo.create(new_message(&f, "   ")).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation { field: Some(ref field), .. } if field == "content"
        ));

        let created = f.repo.create(new_message(&f, "ok")).await.unwrap();
        let err = f
            .repo
            .update(created.message_id, UpdateMessageRequest { content: "".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_sender_rejected() {
        let f = seeded().await;
        let mut request = new_message(&f, "hello");
        request.sender_id = "nobody".into();
        let err = f.repo.create(request).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation { field: Some(ref field), .. } if field == "senderId"
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_content_only() {
        let f = seeded().await;
        let created = f.repo.create(new_message(&f, "draft")).await.unwrap();
        let updated = f
            .repo
            .update(created.message_id, UpdateMessageRequest { content: "final".into() })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, "final");
        assert_eq!(updated.date_sent, created.date_sent);
        assert_eq!(updated.sender_id, created.sender_id);
    }

    #[tokio::test]
    async fn test_list_for_case() {
        let f = seeded().await;
        let first = f.repo.create(new_message(&f, "one")).await.unwrap();
        let second = f.repo.create(new_message(&f, "two")).await.unwrap();

        let listed = f.repo.list_for_case(f.case_id).await.unwrap().unwrap();
        assert_eq!(listed, vec![first, second]);
        assert!(f.repo.list_for_case(f.case_id + 7).await.unwrap().is_none());
    }
}
