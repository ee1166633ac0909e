use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use chrono::{TimeZone, Utc};
use http_body_util::BodyExt;
use ledgerd::api::AppState;
use ledgerd::config::Config;
use tower::ServiceExt;

fn test_config() -> Config {
    let mut config = Config::default();
    config.general.database_url = "sqlite::memory:".to_string();
    // One pooled connection, or each checkout would see a fresh in-memory db.
    config.general.max_db_connections = 1;
    config.general.min_db_connections = 1;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.ratelimit.register_per_minute = 10_000;
    config.ratelimit.login_per_minute = 10_000;
    config.ratelimit.payments_per_minute = 10_000;
    config.ratelimit.global_per_second = 10_000;
    config
}

async fn spawn_app() -> (Arc<AppState>, Router) {
    let state = ledgerd::api::create_app_state(test_config())
        .await
        .expect("Failed to create app state");
    let router = ledgerd::api::router(state.clone());
    (state, router)
}

async fn body_json(response: Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

async fn bearer_token(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header("Content-Type", mime::APPLICATION_JSON.as_ref())
                .body(Body::from(
                    serde_json::json!({
                        "username": "reader",
                        "email": "reader@example.com",
                        "password": "hunter2hunter2"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/token")
                .header(
                    "Content-Type",
                    mime::APPLICATION_WWW_FORM_URLENCODED.as_ref(),
                )
                .body(Body::from("username=reader&password=hunter2hunter2"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    json["access_token"].as_str().unwrap().to_string()
}

async fn get_with_bearer(app: &Router, uri: &str, token: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn seed_payment(state: &AppState, date: chrono::DateTime<Utc>, beneficiary: &str, amount: f64) {
    state
        .store()
        .create_payment(date, Some(format!("INV-{}", beneficiary)), beneficiary, amount)
        .await
        .expect("Failed to seed payment");
}

#[tokio::test]
async fn test_payments_require_credentials() {
    let (_, app) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/payments")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["detail"], "Not authenticated");
}

#[tokio::test]
async fn test_payments_pagination() {
    let (state, app) = spawn_app().await;
    let token = bearer_token(&app).await;

    for i in 1..=5 {
        let date = Utc.with_ymd_and_hms(2025, 6, i, 12, 0, 0).unwrap();
        seed_payment(&state, date, &format!("vendor-{}", i), f64::from(i) * 10.0).await;
    }

    let response = get_with_bearer(&app, "/api/v1/payments?skip=1&limit=2", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["beneficiary"], "vendor-2");
    assert_eq!(rows[0]["amount"], 20.0);
    assert_eq!(rows[1]["beneficiary"], "vendor-3");

    // Defaults: skip 0, limit 100.
    let response = get_with_bearer(&app, "/api/v1/payments", &token).await;
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 5);

    let response = get_with_bearer(&app, "/api/v1/payments?skip=10", &token).await;
    let json = body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_payments_all_with_api_key() {
    let (state, app) = spawn_app().await;
    let token = bearer_token(&app).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/apikeys/generate")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let api_key = body_json(response).await["api_key"]
        .as_str()
        .unwrap()
        .to_string();

    for i in 1..=3 {
        let date = Utc.with_ymd_and_hms(2025, 7, i, 9, 0, 0).unwrap();
        seed_payment(&state, date, &format!("vendor-{}", i), 99.5).await;
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/payments/all")
                .header("x-api-key", &api_key)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 3);
    assert_eq!(json[0]["document"], "INV-vendor-1");
}

#[tokio::test]
async fn test_payments_interval() {
    let (state, app) = spawn_app().await;
    let token = bearer_token(&app).await;

    seed_payment(
        &state,
        Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap(),
        "early",
        100.0,
    )
    .await;
    seed_payment(
        &state,
        Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap(),
        "middle",
        200.0,
    )
    .await;
    seed_payment(
        &state,
        Utc.with_ymd_and_hms(2025, 7, 1, 9, 30, 0).unwrap(),
        "late",
        300.0,
    )
    .await;

    let response = get_with_bearer(
        &app,
        "/api/v1/payments/interval?start_date=2025-06-01&end_date=2025-06-30",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["beneficiary"], "early");
    assert_eq!(rows[1]["beneficiary"], "middle");

    // Both endpoints are inclusive.
    let response = get_with_bearer(
        &app,
        "/api/v1/payments/interval?start_date=2025-06-15&end_date=2025-06-15",
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    // Datetime bounds narrow the window inside a single day.
    let response = get_with_bearer(
        &app,
        "/api/v1/payments/interval?start_date=2025-06-01T09:00:00&end_date=2025-06-01T11:00:00",
        &token,
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["beneficiary"], "early");
}

#[tokio::test]
async fn test_payments_interval_rejects_bad_dates() {
    let (_, app) = spawn_app().await;
    let token = bearer_token(&app).await;

    let response = get_with_bearer(
        &app,
        "/api/v1/payments/interval?start_date=yesterday&end_date=2025-06-30",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["detail"], "start_date is not a valid ISO 8601 date");

    let response = get_with_bearer(
        &app,
        "/api/v1/payments/interval?start_date=2025-06-01&end_date=2025-13-40",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["detail"], "end_date is not a valid ISO 8601 date");
}

#[tokio::test]
async fn test_payments_interval_reversed_range_is_empty() {
    let (state, app) = spawn_app().await;
    let token = bearer_token(&app).await;

    seed_payment(
        &state,
        Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap(),
        "middle",
        200.0,
    )
    .await;

    let response = get_with_bearer(
        &app,
        "/api/v1/payments/interval?start_date=2025-07-01&end_date=2025-06-01",
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json.as_array().unwrap().is_empty());
}
