use std::sync::Arc;

use axum::{Json, extract::State};

use super::{ApiError, AppState, HealthResponse};

pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ApiError> {
    state.store().ping().await.map_err(ApiError::db)?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
