//! HTTP routes for the identity gateway.
//!
//! Defines the Axum router and application state.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::auth::{RefreshRegistry, TokenIssuer};
use crate::config::Config;
use crate::handlers::{auth_handler, health_check, position_handler};
use crate::middleware::{enforce_rate_limit, require_auth, require_session};
use crate::rate_limit::RateLimiter;
use crate::repositories::users::UserDirectory;
use crate::session::{SessionManager, SessionPositionGuard};
use crate::store::SharedStore;

/// Application state shared across all handlers.
///
/// Every component receives the shared store at construction; nothing in
/// the gateway reaches for process-wide connection state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn SharedStore>,
    pub token_issuer: TokenIssuer,
    pub refresh_registry: RefreshRegistry,
    pub sessions: SessionManager,
    pub position_guard: SessionPositionGuard,
    pub rate_limiter: RateLimiter,
    pub users: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Wire the components against an injected store and user directory.
    #[must_use]
    pub fn new(config: Config, store: Arc<dyn SharedStore>, users: Arc<dyn UserDirectory>) -> Self {
        let token_issuer = TokenIssuer::new(&config.signing_key);
        let refresh_registry = RefreshRegistry::new(store.clone());
        let sessions = SessionManager::new(store.clone());
        let position_guard = SessionPositionGuard::new(store.clone(), config.max_km_per_minute);
        let rate_limiter = RateLimiter::new(store.clone());

        Self {
            config,
            store,
            token_issuer,
            refresh_registry,
            sessions,
            position_guard,
            rate_limiter,
            users,
        }
    }
}

/// Build the application routes.
///
/// - Authentication endpoints are public (they mint credentials).
/// - `/v1/me` requires a verified access credential.
/// - `/v1/positions` additionally requires an established session.
/// - Everything except `/v1/health` sits behind the rate limiter; health
///   stays reachable for orchestration probes even when a client identity
///   has exhausted its quota.
pub fn build_routes(state: Arc<AppState>) -> Router {
    let auth_routes = Router::new()
        .route("/v1/auth/register", post(auth_handler::register))
        .route("/v1/auth/login", post(auth_handler::login))
        .route("/v1/auth/refresh", post(auth_handler::refresh))
        .route("/v1/auth/logout", post(auth_handler::logout));

    let identity_routes = Router::new()
        .route("/v1/me", get(auth_handler::me))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    // Layer order on the position route (outermost first): credential
    // verification, then session resolution, then the handler.
    let position_routes = Router::new()
        .route("/v1/positions", post(position_handler::report_position))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let rate_limited = auth_routes
        .merge(identity_routes)
        .merge(position_routes)
        .layer(from_fn_with_state(state.clone(), enforce_rate_limit));

    let health_routes = Router::new().route("/v1/health", get(health_check));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    rate_limited
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
