use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::auth::{self, password};
use crate::db::Account;

use super::{ApiError, AppState, MessageResponse, TokenResponse};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AuthQuery {
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Account resolved by `auth_middleware`, available to protected handlers
/// as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Account);

// ============================================================================
// Middleware
// ============================================================================

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credentials = auth::extract_credentials(query.api_key.as_deref(), &headers);
    let account = state.identity().resolve(credentials).await?;

    tracing::debug!("Authenticated request for {}", account.username);
    request.extensions_mut().insert(CurrentUser(account));

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    if !payload.email.contains('@') {
        return Err(ApiError::validation("Invalid email address"));
    }

    if state
        .store()
        .get_user_by_username(username)
        .await
        .map_err(ApiError::db)?
        .is_some()
    {
        return Err(ApiError::username_taken());
    }
    if state
        .store()
        .get_user_by_email(&payload.email)
        .await
        .map_err(ApiError::db)?
        .is_some()
    {
        return Err(ApiError::email_taken());
    }

    let password_hash =
        password::hash(payload.password, state.config().security.clone()).await?;
    let account = state
        .store()
        .create_user(username, &payload.email, &password_hash)
        .await
        .map_err(ApiError::db)?;

    tracing::info!("Registered user {} (id {})", account.username, account.id);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            msg: "User registered successfully".to_string(),
        }),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Some((account, stored_hash)) = state
        .store()
        .get_user_by_username_with_hash(&form.username)
        .await
        .map_err(ApiError::db)?
    else {
        return Err(ApiError::LoginFailed);
    };

    let verified = password::verify(form.password, stored_hash).await?;
    if account.disabled || !verified {
        tracing::warn!("Failed login attempt for {}", form.username);
        return Err(ApiError::LoginFailed);
    }

    let access_token = state.tokens().issue_default(&account.username)?;
    tracing::info!("Issued access token for {}", account.username);

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
