use super::{ensure_case, evict, now};
use crate::cache::{keys, Cache};
use crate::db::models::{CaseEntity, DocumentActiveModel, DocumentColumn, DocumentEntity};
use crate::db::DbPool;
use crate::dto::{CreateDocumentRequest, DocumentDto, UpdateDocumentRequest};
use crate::errors::Result;
use crate::metrics;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use tracing::info;

/// Case document persistence
#[derive(Clone)]
pub struct DocumentRepository {
    pool: DbPool,
    cache: Cache,
}

impl DocumentRepository {
    pub fn new(pool: DbPool, cache: Cache) -> Self {
        Self { pool, cache }
    }

    pub async fn create(&self, request: CreateDocumentRequest) -> Result<DocumentDto> {
        let txn = self.pool.write().begin().await?;
        ensure_case(&txn, request.case_id).await?;

        let record = DocumentActiveModel {
            file_name: Set(request.file_name),
            file_path: Set(request.file_path),
            upload_date: Set(now()),
            case_id: Set(request.case_id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::DOCUMENTS]).await?;
        metrics::record_write("document", "create");
        info!(document_id = record.document_id, case_id = record.case_id, "Document created");

        Ok(record.into())
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<DocumentDto>> {
        let record = DocumentEntity::find_by_id(id).one(self.pool.read()).await?;
        Ok(record.map(DocumentDto::from))
    }

    pub async fn get_all(&self) -> Result<Vec<DocumentDto>> {
        let records = DocumentEntity::find()
            .order_by_asc(DocumentColumn::DocumentId)
            .all(self.pool.read())
            .await?;
        Ok(records.into_iter().map(DocumentDto::from).collect())
    }

    /// Documents attached to a case; `None` when the case does not exist.
    pub async fn list_for_case(&self, case_id: i32) -> Result<Option<Vec<DocumentDto>>> {
        let conn = self.pool.read();
        if CaseEntity::find_by_id(case_id).one(conn).await?.is_none() {
            return Ok(None);
        }

        let records = DocumentEntity::find()
            .filter(DocumentColumn::CaseId.eq(case_id))
            .order_by_asc(DocumentColumn::DocumentId)
            .all(conn)
            .await?;
        Ok(Some(records.into_iter().map(DocumentDto::from).collect()))
    }

    /// Replace file name and path. The upload date and case are kept.
    pub async fn update(&self, id: i32, request: UpdateDocumentRequest) -> Result<Option<DocumentDto>> {
        let txn = self.pool.write().begin().await?;

        let Some(existing) = DocumentEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };

        let mut active = existing.into_active_model();
        active.file_name = Set(request.file_name);
        active.file_path = Set(request.file_path);
        let record = active.update(&txn).await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::DOCUMENTS]).await?;
        metrics::record_write("document", "update");
        info!(document_id = id, "Document updated");

        Ok(Some(record.into()))
    }

    pub async fn delete(&self, id: i32) -> Result<Option<DocumentDto>> {
        let txn = self.pool.write().begin().await?;

        let Some(existing) = DocumentEntity::find_by_id(id).one(&txn).await? else {
            return Ok(None);
        };
        DocumentEntity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        evict(&self.cache, &[keys::DOCUMENTS]).await?;
        metrics::record_write("document", "delete");
        info!(document_id = id, "Document deleted");

        Ok(Some(existing.into()))
    }
}
