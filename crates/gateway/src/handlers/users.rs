//! User administration handlers

use axum::{extract::State, Json};

use crate::extract::ApiPath;
use crate::AppState;
use casebook_common::{
    auth::AuthUser,
    db::UserRepository,
    dto::UserProfile,
    errors::{AppError, Result},
    identity::Role,
};

/// Delete a user account. Admin only.
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(user_id): ApiPath<String>,
) -> Result<Json<UserProfile>> {
    auth.require_role(Role::Admin)?;

    if user_id == auth.user_id {
        return Err(AppError::Conflict {
            message: "Administrators cannot delete their own account".to_string(),
        });
    }

    let repo = UserRepository::new(state.db.clone(), state.cache.clone());
    let deleted = repo
        .delete(&user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user", &user_id))?;

    tracing::info!(user_id = %user_id, deleted_by = %auth.user_id, "User account removed");
    Ok(Json(deleted))
}
