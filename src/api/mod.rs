use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{IdentityResolver, RateLimiter, TokenCodec};
use crate::config::Config;
use crate::db::Store;

mod apikeys;
pub mod auth;
mod error;
mod payments;
mod ratelimit;
mod system;
mod types;
mod users;

pub use error::ApiError;
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    config: Config,

    store: Store,

    tokens: Arc<TokenCodec>,

    identity: Arc<IdentityResolver>,

    limiter: Arc<RateLimiter>,
}

impl AppState {
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn tokens(&self) -> &Arc<TokenCodec> {
        &self.tokens
    }

    #[must_use]
    pub fn identity(&self) -> &Arc<IdentityResolver> {
        &self.identity
    }

    #[must_use]
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }
}

pub async fn create_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_url,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let tokens = Arc::new(TokenCodec::new(&config.auth)?);
    let identity = Arc::new(IdentityResolver::new(store.clone(), tokens.clone()));
    let limiter = Arc::new(RateLimiter::new(config.ratelimit.clone()));

    Ok(Arc::new(AppState {
        config,
        store,
        tokens,
        identity,
        limiter,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    let api_router = Router::new()
        .merge(create_auth_router(state.clone()))
        .merge(create_protected_router(state.clone()));

    Router::new()
        .nest("/api/v1", api_router)
        .route("/health", get(system::health_check))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::limit_global,
        ))
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn create_auth_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let register_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::limit_register,
        ));

    let login_routes = Router::new()
        .route("/auth/token", post(auth::login))
        .route_layer(middleware::from_fn_with_state(state, ratelimit::limit_login));

    register_routes.merge(login_routes)
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Layers added later run first, so the limiter sits outside the auth
    // middleware and over-limit requests never reach credential lookup.
    let payment_routes = Router::new()
        .route("/payments", get(payments::list_payments))
        .route("/payments/all", get(payments::list_all_payments))
        .route(
            "/payments/interval",
            get(payments::list_payments_by_interval),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::limit_payments,
        ));

    let account_routes = Router::new()
        .route("/apikeys/generate", post(apikeys::generate_api_key))
        .route("/users/me", get(users::get_current_user))
        .route("/users/disable", put(users::disable_current_user))
        .route("/users/password", put(users::change_password))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware));

    payment_routes.merge(account_routes)
}
