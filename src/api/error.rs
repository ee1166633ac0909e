use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::fmt;

use crate::auth::AuthError;

use super::ErrorDetail;

#[derive(Debug)]
pub enum ApiError {
    /// No credential on a protected route.
    NotAuthenticated,

    /// An API key was presented but matched no stored hash.
    InvalidApiKey,

    /// A bearer token was presented but failed verification.
    InvalidCredentials,

    /// Credential checked out but the account is disabled.
    AccountDisabled,

    /// Username unknown, password wrong, or account disabled at login.
    /// One message for all three.
    LoginFailed,

    RateLimited,

    ValidationError(String),

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotAuthenticated => write!(f, "Not authenticated"),
            ApiError::InvalidApiKey => write!(f, "Invalid API key"),
            ApiError::InvalidCredentials => write!(f, "Invalid authentication credentials"),
            ApiError::AccountDisabled => write!(f, "User account is disabled"),
            ApiError::LoginFailed => write!(f, "Incorrect username or password"),
            ApiError::RateLimited => write!(f, "Too many requests"),
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, challenge, detail) = match &self {
            ApiError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                None,
                "Not authenticated".to_string(),
            ),
            ApiError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                Some("API key"),
                "Invalid API key".to_string(),
            ),
            ApiError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Some("Bearer"),
                "Invalid authentication credentials".to_string(),
            ),
            ApiError::AccountDisabled => (
                StatusCode::BAD_REQUEST,
                None,
                "User account is disabled".to_string(),
            ),
            ApiError::LoginFailed => (
                StatusCode::UNAUTHORIZED,
                None,
                "Incorrect username or password".to_string(),
            ),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                None,
                "Too many requests".to_string(),
            ),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, None, msg.clone()),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "A database error occurred".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    None,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorDetail { detail });
        match challenge {
            Some(scheme) => (status, [(header::WWW_AUTHENTICATE, scheme)], body).into_response(),
            None => (status, body).into_response(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotAuthenticated => ApiError::NotAuthenticated,
            AuthError::InvalidApiKey => ApiError::InvalidApiKey,
            AuthError::InvalidCredentials => ApiError::InvalidCredentials,
            AuthError::AccountDisabled => ApiError::AccountDisabled,
            AuthError::Store(e) => ApiError::DatabaseError(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn db(err: impl fmt::Display) -> Self {
        ApiError::DatabaseError(err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        ApiError::InternalError(err.to_string())
    }

    pub fn username_taken() -> Self {
        ApiError::ValidationError("Username already registered".to_string())
    }

    pub fn email_taken() -> Self {
        ApiError::ValidationError("Email already registered".to_string())
    }
}
