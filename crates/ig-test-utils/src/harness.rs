//! Fully wired gateway fixture over the mock store.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::response::Response;
use axum::Router;
use base64::{engine::general_purpose, Engine as _};
use http_body_util::BodyExt;

use identity_gateway::config::Config;
use identity_gateway::repositories::users::InMemoryUserDirectory;
use identity_gateway::routes::{build_routes, AppState};
use identity_gateway::store::mock::MockStore;

/// Deterministic 32-byte signing key for tests.
#[must_use]
pub fn test_signing_key() -> Vec<u8> {
    vec![7u8; 32]
}

/// Gateway state + router wired against [`MockStore`] and an in-memory user
/// directory.
///
/// # Example
///
/// ```rust,ignore
/// let app = TestApp::new();
/// let response = app.router().oneshot(request).await?;
/// app.store.advance(Duration::from_secs(3600)); // expire everything
/// ```
pub struct TestApp {
    pub state: Arc<AppState>,
    pub store: MockStore,
    pub users: Arc<InMemoryUserDirectory>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Gateway with the default quota (100/60).
    #[must_use]
    pub fn new() -> Self {
        Self::with_quota("100/60")
    }

    /// Gateway with a specific `"<limit>/<windowSeconds>"` quota.
    #[must_use]
    pub fn with_quota(quota: &str) -> Self {
        let vars = HashMap::from([
            (
                "REDIS_URL".to_string(),
                "redis://unused-in-tests".to_string(),
            ),
            (
                "IG_SIGNING_KEY".to_string(),
                general_purpose::STANDARD.encode(test_signing_key()),
            ),
            ("IG_RATE_LIMIT".to_string(), quota.to_string()),
        ]);
        let config = Config::from_vars(&vars).expect("test config must parse");

        let store = MockStore::new();
        let users = Arc::new(InMemoryUserDirectory::new());
        let state = Arc::new(AppState::new(
            config,
            Arc::new(store.clone()),
            users.clone(),
        ));

        Self {
            state,
            store,
            users,
        }
    }

    /// A fresh router over the shared state. Connection info is mocked so
    /// the rate limiter sees a stable client identity.
    #[must_use]
    pub fn router(&self) -> Router {
        build_routes(self.state.clone())
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))))
    }
}

/// Collect a response body as JSON.
///
/// # Panics
///
/// Panics when the body is not valid JSON; this is a test assertion helper.
pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body must be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body must be JSON")
}

/// Extract the value of a `Set-Cookie` header for `name`, if the response
/// set one.
#[must_use]
pub fn set_cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .find_map(|cookie| {
            let (pair, _) = cookie.split_once(';')?;
            let (k, v) = pair.split_once('=')?;
            (k == name).then(|| v.to_string())
        })
}
