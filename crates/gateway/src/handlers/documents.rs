//! Case document handlers

use axum::{extract::State, response::Response, Json};

use super::created;
use crate::extract::{ApiPath, ValidatedJson};
use crate::AppState;
use casebook_common::{
    auth::AuthUser,
    db::DocumentRepository,
    dto::{CreateDocumentRequest, DocumentDto, UpdateDocumentRequest},
    errors::{AppError, Result},
};

fn repository(state: &AppState) -> DocumentRepository {
    DocumentRepository::new(state.db.clone(), state.cache.clone())
}

pub async fn list_documents(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<DocumentDto>>> {
    Ok(Json(repository(&state).get_all().await?))
}

/// Documents attached to one case
pub async fn list_for_case(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(case_id): ApiPath<i32>,
) -> Result<Json<Vec<DocumentDto>>> {
    repository(&state)
        .list_for_case(case_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("case", case_id))
}

pub async fn get_document(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(document_id): ApiPath<i32>,
) -> Result<Json<DocumentDto>> {
    repository(&state)
        .get_by_id(document_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("document", document_id))
}

pub async fn create_document(
    State(state): State<AppState>,
    _auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateDocumentRequest>,
) -> Result<Response> {
    let document = repository(&state).create(request).await?;
    Ok(created("documents", document.document_id, document))
}

pub async fn update_document(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(document_id): ApiPath<i32>,
    ValidatedJson(request): ValidatedJson<UpdateDocumentRequest>,
) -> Result<Json<DocumentDto>> {
    repository(&state)
        .update(document_id, request)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("document", document_id))
}

pub async fn delete_document(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(document_id): ApiPath<i32>,
) -> Result<Json<DocumentDto>> {
    repository(&state)
        .delete(document_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("document", document_id))
}
