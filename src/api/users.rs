use std::sync::Arc;

use axum::{Extension, Json, extract::State};
use serde::Deserialize;

use crate::auth::password;

use super::{ApiError, AppState, MessageResponse, UserInfoResponse, auth::CurrentUser};

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

pub async fn get_current_user(
    Extension(CurrentUser(account)): Extension<CurrentUser>,
) -> Json<UserInfoResponse> {
    Json(UserInfoResponse::from(account))
}

pub async fn disable_current_user(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .store()
        .set_user_disabled(account.id, true)
        .await
        .map_err(ApiError::db)?;

    tracing::info!("Disabled user {}", account.username);

    Ok(Json(MessageResponse {
        msg: "User disabled successfully".to_string(),
    }))
}

pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.new_password.len() < 8 {
        return Err(ApiError::validation(
            "New password must be at least 8 characters",
        ));
    }

    let Some((_, stored_hash)) = state
        .store()
        .get_user_by_username_with_hash(&account.username)
        .await
        .map_err(ApiError::db)?
    else {
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify(payload.old_password, stored_hash).await? {
        return Err(ApiError::validation("Current password is incorrect"));
    }

    let new_hash = password::hash(payload.new_password, state.config().security.clone()).await?;
    state
        .store()
        .update_user_password(account.id, &new_hash)
        .await
        .map_err(ApiError::db)?;

    tracing::info!("Updated password for {}", account.username);

    Ok(Json(MessageResponse {
        msg: "Password updated successfully".to_string(),
    }))
}
