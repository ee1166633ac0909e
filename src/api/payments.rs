use std::sync::Arc;

use axum::{Json, extract::Query, extract::State};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Deserialize;

use super::{ApiError, AppState, PaymentDto};

// ============================================================================
// Request Types
// ============================================================================

fn default_limit() -> u64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

#[derive(Debug, Deserialize)]
pub struct IntervalQuery {
    pub start_date: String,
    pub end_date: String,
}

/// Accepts RFC 3339, a bare datetime with optional fractional seconds, or a
/// plain date (interpreted as midnight UTC).
fn parse_interval_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.and_utc());
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(parsed.and_time(NaiveTime::MIN).and_utc());
    }
    None
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_payments(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<PaymentDto>>, ApiError> {
    let payments = state
        .store()
        .list_payments(page.skip, page.limit)
        .await
        .map_err(ApiError::db)?;

    Ok(Json(payments.into_iter().map(PaymentDto::from).collect()))
}

pub async fn list_all_payments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PaymentDto>>, ApiError> {
    let payments = state.store().list_all_payments().await.map_err(ApiError::db)?;

    Ok(Json(payments.into_iter().map(PaymentDto::from).collect()))
}

pub async fn list_payments_by_interval(
    State(state): State<Arc<AppState>>,
    Query(interval): Query<IntervalQuery>,
) -> Result<Json<Vec<PaymentDto>>, ApiError> {
    let Some(start) = parse_interval_date(&interval.start_date) else {
        return Err(ApiError::validation("start_date is not a valid ISO 8601 date"));
    };
    let Some(end) = parse_interval_date(&interval.end_date) else {
        return Err(ApiError::validation("end_date is not a valid ISO 8601 date"));
    };

    let payments = state
        .store()
        .list_payments_between(start, end)
        .await
        .map_err(ApiError::db)?;

    Ok(Json(payments.into_iter().map(PaymentDto::from).collect()))
}
