//! Server-side sessions backed by the shared store.
//!
//! A session is established at login/registration and identified by an
//! opaque id delivered in a cookie. The record lives under `session:{id}`
//! with a sliding TTL: refreshing credentials extends it. Position baselines
//! hang off the session under `session:{id}:pos` (see
//! [`position_guard`]) and are destroyed with it.

pub mod position_guard;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::IgError;
use crate::store::SharedStore;

pub use position_guard::{PositionOutcome, SessionPositionGuard};

/// Sessions live for one hour unless extended.
pub const SESSION_TTL: Duration = Duration::from_secs(3600);

/// Store key for a session record.
#[must_use]
pub fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

/// Session record as stored under `session:{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub user_id: String,
    /// Creation timestamp (Unix epoch seconds).
    pub created_at: i64,
}

/// Creates, resolves, extends, and destroys sessions.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SharedStore>,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// Create a session for `user_id` and return its id.
    ///
    /// # Errors
    ///
    /// Returns `IgError::Store` if the record cannot be written.
    #[instrument(skip_all)]
    pub async fn create(&self, user_id: &str) -> Result<String, IgError> {
        let session_id = Uuid::new_v4().to_string();

        let record = SessionRecord {
            user_id: user_id.to_string(),
            created_at: Utc::now().timestamp(),
        };

        let json = serde_json::to_string(&record).map_err(|e| {
            tracing::error!(target: "ig.session", error = %e, "Failed to serialize session record");
            IgError::Internal
        })?;

        self.store
            .set_with_ttl(&session_key(&session_id), &json, SESSION_TTL)
            .await?;

        debug!(target: "ig.session", "Created session");
        Ok(session_id)
    }

    /// Resolve a session id. Absent or expired sessions resolve to `None`.
    ///
    /// # Errors
    ///
    /// Returns `IgError::Store` if the store is unreachable and
    /// `IgError::Internal` if a stored record fails to parse.
    #[instrument(skip_all)]
    pub async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>, IgError> {
        let raw = self.store.get(&session_key(session_id)).await?;

        match raw {
            Some(json) => {
                let record: SessionRecord = serde_json::from_str(&json).map_err(|e| {
                    tracing::error!(
                        target: "ig.session",
                        error = %e,
                        "Failed to deserialize session record"
                    );
                    IgError::Internal
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Extend a session's TTL (sliding expiry). Returns `false` if the
    /// session no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `IgError::Store` if the store is unreachable.
    #[instrument(skip_all)]
    pub async fn extend(&self, session_id: &str, ttl: Duration) -> Result<bool, IgError> {
        let extended = self.store.expire(&session_key(session_id), ttl).await?;
        if extended {
            debug!(target: "ig.session", "Extended session TTL");
        }
        Ok(extended)
    }

    /// Destroy a session and its position baseline. Returns `true` if a
    /// session record was removed.
    ///
    /// Callers must check the result; destruction failures are part of the
    /// logout contract, not background noise.
    ///
    /// # Errors
    ///
    /// Returns `IgError::Store` if the store is unreachable.
    #[instrument(skip_all)]
    pub async fn destroy(&self, session_id: &str) -> Result<bool, IgError> {
        let removed = self.store.delete(&session_key(session_id)).await?;
        // The baseline is meaningless without its session.
        self.store
            .delete(&position_guard::position_key(session_id))
            .await?;

        debug!(target: "ig.session", removed = removed, "Destroyed session");
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::store::mock::MockStore;

    fn manager(store: &MockStore) -> SessionManager {
        SessionManager::new(Arc::new(store.clone()))
    }

    #[test]
    fn test_session_key_format() {
        assert_eq!(session_key("abc"), "session:abc");
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MockStore::new();
        let sessions = manager(&store);

        let sid = sessions.create("user-1").await.unwrap();
        let record = sessions.get(&sid).await.unwrap().unwrap();
        assert_eq!(record.user_id, "user-1");
    }

    #[tokio::test]
    async fn test_get_unknown_session_is_none() {
        let store = MockStore::new();
        let sessions = manager(&store);

        assert!(sessions.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_expires() {
        let store = MockStore::new();
        let sessions = manager(&store);

        let sid = sessions.create("user-1").await.unwrap();
        store.advance(SESSION_TTL + Duration::from_secs(1));
        assert!(sessions.get(&sid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extend_slides_expiry() {
        let store = MockStore::new();
        let sessions = manager(&store);

        let sid = sessions.create("user-1").await.unwrap();

        // Just before expiry, slide the window forward.
        store.advance(SESSION_TTL - Duration::from_secs(10));
        assert!(sessions.extend(&sid, SESSION_TTL).await.unwrap());

        // The original deadline passes; the session survives.
        store.advance(Duration::from_secs(60));
        assert!(sessions.get(&sid).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_extend_missing_session_returns_false() {
        let store = MockStore::new();
        let sessions = manager(&store);

        assert!(!sessions.extend("gone", SESSION_TTL).await.unwrap());
    }

    #[tokio::test]
    async fn test_destroy_removes_session_and_baseline() {
        let store = MockStore::new();
        let sessions = manager(&store);

        let sid = sessions.create("user-1").await.unwrap();
        store.raw_set(
            &position_guard::position_key(&sid),
            r#"{"lat":1.0,"lng":2.0,"updatedAtMs":0}"#,
            Some(SESSION_TTL),
        );

        assert!(sessions.destroy(&sid).await.unwrap());
        assert!(sessions.get(&sid).await.unwrap().is_none());
        assert!(store.raw_get(&position_guard::position_key(&sid)).is_none());
    }

    #[tokio::test]
    async fn test_destroy_is_result_returning_not_silent() {
        let store = MockStore::new();
        let sessions = manager(&store);

        // Destroying an absent session reports false rather than pretending.
        assert!(!sessions.destroy("never-existed").await.unwrap());

        // And a store outage is an error, not a shrug.
        store.set_unavailable(true);
        assert!(matches!(
            sessions.destroy("whatever").await,
            Err(IgError::Store(_))
        ));
    }
}
