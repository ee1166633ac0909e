use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::RouteGroup;

use super::{ApiError, AppState};

/// Client address used as the rate-limit key. Requests served without
/// connect info (as in tests) share one fallback bucket.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |info| info.0.ip())
}

async fn limit(
    state: &AppState,
    group: RouteGroup,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_ip(&request);

    if !state.limiter().admit(client, group) {
        tracing::debug!("Rate limited {} on {:?}", client, group);
        return Err(ApiError::RateLimited);
    }

    Ok(next.run(request).await)
}

pub async fn limit_global(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    limit(&state, RouteGroup::Global, request, next).await
}

pub async fn limit_register(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    limit(&state, RouteGroup::Register, request, next).await
}

pub async fn limit_login(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    limit(&state, RouteGroup::Login, request, next).await
}

pub async fn limit_payments(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    limit(&state, RouteGroup::Payments, request, next).await
}
