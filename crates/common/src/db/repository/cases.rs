use super::{ensure_user, evict, now};
use crate::cache::{keys, Cache};
use crate::db::models::{
    CaseActiveModel, CaseColumn, CaseEntity, DocumentColumn, DocumentEntity, MessageColumn,
    MessageEntity,
};
use crate::db::DbPool;
use crate::dto::{CaseDto, CreateCaseRequest, UpdateCaseRequest};
use crate::errors::{AppError, Result};
use crate::metrics;
use chrono::SubsecRound;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

/// Legal case persistence
#[derive(Clone)]
pub struct CaseRepository {
    pool: DbPool,
    cache: Cache,
}

impl CaseRepository {
    pub fn new(pool: DbPool, cache: Cache) -> Self {
        Self { pool, cache }
    }

    /// Create a case. Creator and assignee must exist when given.
    pub async fn create(&self, request: CreateCaseRequest) -> Result<CaseDto> {
        let txn = self.pool.write().begin().await?;

        if let Some(ref user_id) = request.created_by_id {
            ensure_user(&txn, "createdById", user_id).await?;
        }
        if let Some(ref user_id) = request.assigned_to_id {
            ensure_user(&txn, "assignedToId", user_id).await?;
        }

        let record = CaseActiveModel {
            title: Set(request.title),
            description: Set(request.description),
            created_by_id: Set(request.created_by_id),
            assigned_to_id: Set(request.assigned_to_id),
            date_created: Set(now()),
            date_closed: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::CASES]).await?;
        metrics::record_write("case", "create");
        info!(case_id = record.case_id, "Case created");

        Ok(record.into())
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<CaseDto>> {
        let record = CaseEntity::find_by_id(id).one(self.pool.read()).await?;
        Ok(record.map(CaseDto::from))
    }

    pub async fn get_all(&self) -> Result<Vec<CaseDto>> {
        let records = CaseEntity::find()
            .order_by_asc(CaseColumn::CaseId)
            .all(self.pool.read())
            .await?;
        Ok(records.into_iter().map(CaseDto::from).collect())
    }

    /// Replace title, description, assignee and closing date.
    pub async fn update(&self, id: i32, request: UpdateCaseRequest) -> Result<Option<CaseDto>> {
        let txn = self.pool.write().begin().await?;

        let Some(existing) = CaseEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        if let Some(ref user_id) = request.assigned_to_id {
            ensure_user(&txn, "assignedToId", user_id).await?;
        }

        let date_closed = request.date_closed.map(|d| d.trunc_subsecs(6));
        if let Some(closed) = date_closed {
            if closed < existing.date_created {
                return Err(AppError::invalid_field(
                    "dateClosed",
                    "Closing date cannot precede the creation date",
                ));
            }
        }

        let mut active = existing.into_active_model();
        active.title = Set(request.title);
        active.description = Set(request.description);
        active.assigned_to_id = Set(request.assigned_to_id);
        active.date_closed = Set(date_closed);
        let record = active.update(&txn).await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::CASES]).await?;
        metrics::record_write("case", "update");
        info!(case_id = id, closed = record.is_closed(), "Case updated");

        Ok(Some(record.into()))
    }

    /// Delete a case together with its documents and messages.
    pub async fn delete(&self, id: i32) -> Result<Option<CaseDto>> {
        let txn = self.pool.write().begin().await?;

        let Some(existing) = CaseEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let documents = DocumentEntity::delete_many()
            .filter(DocumentColumn::CaseId.eq(id))
            .exec(&txn)
            .await?;
        let messages = MessageEntity::delete_many()
            .filter(MessageColumn::CaseId.eq(id))
            .exec(&txn)
            .await?;
        CaseEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::CASES, keys::DOCUMENTS, keys::MESSAGES]).await?;
        metrics::record_write("case", "delete");
        info!(
            case_id = id,
            documents = documents.rows_affected,
            messages = messages.rows_affected,
            "Case deleted"
        );

        Ok(Some(existing.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::fixtures::{insert_user, setup};
    use crate::db::repository::{DocumentRepository, MessageRepository};
    use crate::dto::{CreateDocumentRequest, CreateMessageRequest};
    use chrono::Duration;

    fn new_case(created_by: Option<&str>) -> CreateCaseRequest {
        CreateCaseRequest {
            title: "Smith v. Jones".into(),
            description: "Breach of contract".into(),
            created_by_id: created_by.map(String::from),
            assigned_to_id: None,
        }
    }

    fn update(title: &str) -> UpdateCaseRequest {
        UpdateCaseRequest {
            title: title.into(),
            description: "Settled".into(),
            assigned_to_id: None,
            date_closed: None,
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (pool, cache) = setup().await;
        let u1 = insert_user(&pool, "u1").await;
        let repo = CaseRepository::new(pool, cache);

        let created = repo.create(new_case(Some(&u1))).await.unwrap();
        assert!(created.case_id > 0);
        assert!(created.date_closed.is_none());

        let fetched = repo.get_by_id(created.case_id).await.unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(repo.get_all().await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn test_unknown_creator_is_validation_error() {
        let (pool, cache) = setup().await;
        let repo = CaseRepository::new(pool, cache);

        let err = repo.create(new_case(Some("ghost"))).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation { field: Some(ref f), .. } if f == "createdById"
        ));
        assert!(repo.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let (pool, cache) = setup().await;
        let lawyer = insert_user(&pool, "lawyer").await;
        let repo = CaseRepository::new(pool, cache);
        let created = repo.create(new_case(None)).await.unwrap();

        let closed_at = created.date_created + Duration::days(3);
        let request = UpdateCaseRequest {
            assigned_to_id: Some(lawyer.clone()),
            date_closed: Some(closed_at),
            ..update("Smith v. Jones (settled)")
        };
        let updated = repo.update(created.case_id, request).await.unwrap().unwrap();

        assert_eq!(updated.title, "Smith v. Jones (settled)");
        assert_eq!(updated.assigned_to_id, Some(lawyer));
        assert_eq!(updated.date_closed, Some(closed_at));
        assert_eq!(updated.date_created, created.date_created);
    }

    #[tokio::test]
    async fn test_closing_before_creation_rejected() {
        let (pool, cache) = setup().await;
        let repo = CaseRepository::new(pool, cache);
        let created = repo.create(new_case(None)).await.unwrap();

        let request = UpdateCaseRequest {
            date_closed: Some(created.date_created - Duration::days(1)),
            ..update("x")
        };
        let err = repo.update(created.case_id, request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let unchanged = repo.get_by_id(created.case_id).await.unwrap().unwrap();
        assert_eq!(unchanged.title, "Smith v. Jones");
    }

    #[tokio::test]
    async fn test_missing_ids_are_absent() {
        let (pool, cache) = setup().await;
        let repo = CaseRepository::new(pool, cache);

        assert!(repo.get_by_id(999).await.unwrap().is_none());
        assert!(repo.update(999, update("x")).await.unwrap().is_none());
        assert!(repo.delete(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_documents_and_messages() {
        let (pool, cache) = setup().await;
        let sender = insert_user(&pool, "sender").await;
        let cases = CaseRepository::new(pool.clone(), cache.clone());
        let documents = DocumentRepository::new(pool.clone(), cache.clone());
        let messages = MessageRepository::new(pool, cache);

        let case = cases.create(new_case(None)).await.unwrap();
        let document = documents
            .create(CreateDocumentRequest {
                file_name: "complaint.pdf".into(),
                file_path: "/cases/1/complaint.pdf".into(),
                case_id: case.case_id,
            })
            .await
            .unwrap();
        let message = messages
            .create(CreateMessageRequest {
                content: "Filed today".into(),
                sender_id: sender,
                case_id: case.case_id,
            })
            .await
            .unwrap();

        let deleted = cases.delete(case.case_id).await.unwrap().unwrap();
        assert_eq!(deleted.case_id, case.case_id);

        assert!(cases.get_by_id(case.case_id).await.unwrap().is_none());
        assert!(documents.get_by_id(document.document_id).await.unwrap().is_none());
        assert!(messages.get_by_id(message.message_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_evicts_case_key() {
        let (pool, cache) = setup().await;
        let repo = CaseRepository::new(pool, cache.clone());

        cache.set(keys::CASES, &vec![1, 2, 3]).await.unwrap();
        repo.create(new_case(None)).await.unwrap();
        assert!(cache.get::<Vec<i32>>(keys::CASES).await.unwrap().is_none());
    }
}
