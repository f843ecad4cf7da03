//! Case message handlers

use axum::{extract::State, response::Response, Json};

use super::created;
use crate::extract::{ApiPath, ValidatedJson};
use crate::AppState;
use casebook_common::{
    auth::AuthUser,
    db::MessageRepository,
    dto::{CreateMessageRequest, MessageDto, UpdateMessageRequest},
    errors::{AppError, Result},
};

fn repository(state: &AppState) -> MessageRepository {
    MessageRepository::new(state.db.clone(), state.cache.clone())
}

pub async fn list_messages(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<MessageDto>>> {
    Ok(Json(repository(&state).get_all().await?))
}

/// Conversation of one case, oldest first
pub async fn list_for_case(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(case_id): ApiPath<i32>,
) -> Result<Json<Vec<MessageDto>>> {
    repository(&state)
        .list_for_case(case_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("case", case_id))
}

pub async fn get_message(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(message_id): ApiPath<i32>,
) -> Result<Json<MessageDto>> {
    repository(&state)
        .get_by_id(message_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("message", message_id))
}

pub async fn create_message(
    State(state): State<AppState>,
    _auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateMessageRequest>,
) -> Result<Response> {
    let message = repository(&state).create(request).await?;
    Ok(created("messages", message.message_id, message))
}

pub async fn update_message(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(message_id): ApiPath<i32>,
    ValidatedJson(request): ValidatedJson<UpdateMessageRequest>,
) -> Result<Json<MessageDto>> {
    repository(&state)
        .update(message_id, request)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("message", message_id))
}

pub async fn delete_message(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(message_id): ApiPath<i32>,
) -> Result<Json<MessageDto>> {
    repository(&state)
        .delete(message_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("message", message_id))
}
