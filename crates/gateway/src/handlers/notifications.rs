//! Notification handlers

use axum::{extract::State, response::Response, Json};

use super::created;
use crate::extract::{ApiPath, ValidatedJson};
use crate::AppState;
use casebook_common::{
    auth::AuthUser,
    db::NotificationRepository,
    dto::{CreateNotificationRequest, NotificationDto, UpdateNotificationRequest},
    errors::{AppError, Result},
    identity::Role,
};

fn repository(state: &AppState) -> NotificationRepository {
    NotificationRepository::new(state.db.clone(), state.cache.clone())
}

pub async fn list_notifications(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<NotificationDto>>> {
    Ok(Json(repository(&state).get_all().await?))
}

/// Inbox of one user. Readable by that user and by administrators.
pub async fn list_for_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Json<Vec<NotificationDto>>> {
    if auth.user_id != user_id {
        auth.require_role(Role::Admin)?;
    }

    repository(&state)
        .list_for_user(&user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("user", &user_id))
}

pub async fn get_notification(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(notification_id): ApiPath<i32>,
) -> Result<Json<NotificationDto>> {
    repository(&state)
        .get_by_id(notification_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("notification", notification_id))
}

pub async fn create_notification(
    State(state): State<AppState>,
    _auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateNotificationRequest>,
) -> Result<Response> {
    let notification = repository(&state).create(request).await?;
    Ok(created("notifications", notification.notification_id, notification))
}

pub async fn update_notification(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(notification_id): ApiPath<i32>,
    ValidatedJson(request): ValidatedJson<UpdateNotificationRequest>,
) -> Result<Json<NotificationDto>> {
    repository(&state)
        .update(notification_id, request)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("notification", notification_id))
}

pub async fn mark_read(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(notification_id): ApiPath<i32>,
) -> Result<Json<NotificationDto>> {
    repository(&state)
        .mark_read(notification_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("notification", notification_id))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiPath(notification_id): ApiPath<i32>,
) -> Result<Json<NotificationDto>> {
    repository(&state)
        .delete(notification_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("notification", notification_id))
}
