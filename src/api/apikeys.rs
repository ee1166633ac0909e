use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode};
use base64::Engine;
use rand::Rng;

use crate::auth::{KEY_PREFIX_LEN, password};

use super::{ApiError, ApiKeyResponse, AppState, auth::CurrentUser};

/// 32 random bytes, URL-safe base64 without padding. 43 characters.
fn generate_raw_key() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub async fn generate_api_key(
    State(state): State<Arc<AppState>>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
) -> Result<(StatusCode, Json<ApiKeyResponse>), ApiError> {
    let raw_key = generate_raw_key();
    let key_prefix: String = raw_key.chars().take(KEY_PREFIX_LEN).collect();

    let hashed_key = password::hash(raw_key.clone(), state.config().security.clone()).await?;
    state
        .store()
        .create_api_key(account.id, &hashed_key, &key_prefix)
        .await
        .map_err(ApiError::db)?;

    tracing::info!("Generated API key for {}", account.username);

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyResponse {
            api_key: raw_key,
            msg: "API key generated successfully".to_string(),
        }),
    ))
}
