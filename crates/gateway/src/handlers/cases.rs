//! Case management handlers

use axum::{extract::State, response::Response, Json};

use super::created;
use crate::extract::{ApiPath, ValidatedJson};
use crate::AppState;
use casebook_common::{
    auth::AuthUser,
    db::CaseRepository,
    dto::{CaseDto, CreateCaseRequest, UpdateCaseRequest},
    errors::{AppError, Result},
};

fn repository(state: &AppState) -> CaseRepository {
    CaseRepository::new(state.db.clone(), state.cache.clone())
}

pub async fn list_cases(State(state): State<AppState>, _auth: AuthUser) -> Result<Json<Vec<CaseDto>>> {
    Ok(Json(repository(&state).get_all().await?))
}

pub async fn get_case(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(case_id): ApiPath<i32>,
) -> Result<Json<CaseDto>> {
    repository(&state)
        .get_by_id(case_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("case", case_id))
}

/// Open a case. The creator defaults to the caller.
pub async fn create_case(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(mut request): ValidatedJson<CreateCaseRequest>,
) -> Result<Response> {
    if request.created_by_id.is_none() {
        request.created_by_id = Some(auth.user_id.clone());
    }

    let case = repository(&state).create(request).await?;
    Ok(created("cases", case.case_id, case))
}

pub async fn update_case(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(case_id): ApiPath<i32>,
    ValidatedJson(request): ValidatedJson<UpdateCaseRequest>,
) -> Result<Json<CaseDto>> {
    repository(&state)
        .update(case_id, request)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("case", case_id))
}

/// Delete a case along with its documents and messages
pub async fn delete_case(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(case_id): ApiPath<i32>,
) -> Result<Json<CaseDto>> {
    let deleted = repository(&state)
        .delete(case_id)
        .await?
        .ok_or_else(|| AppError::not_found("case", case_id))?;

    tracing::info!(case_id, deleted_by = %auth.user_id, "Case removed");
    Ok(Json(deleted))
}
