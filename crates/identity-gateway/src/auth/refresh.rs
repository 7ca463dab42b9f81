//! Refresh-handle registry backed by the shared store.
//!
//! A refresh handle is an opaque, long-lived, revocable token exchanged for
//! fresh access credentials. Records live under `token:{handle}` with a
//! 7-day TTL; every registry operation is a single atomic store call, so the
//! registry introduces no cross-request races of its own. Two concurrent
//! refreshes with the same handle may both succeed; handles are reusable
//! until revoked, not single-use. Rotation-on-use was considered and
//! deliberately not adopted: long-lived mobile sessions would otherwise need
//! reissue on every refresh.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::crypto;
use crate::errors::IgError;
use crate::store::SharedStore;

/// Refresh handles live for seven days.
pub const REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Store key for a refresh record.
#[must_use]
pub fn refresh_key(handle: &str) -> String {
    format!("token:{handle}")
}

/// Refresh record as stored under `token:{handle}`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRecord {
    /// Owning user.
    pub user_id: String,
    /// The access credential that was active when the handle was issued.
    pub bound_credential: String,
    /// Expiry timestamp (Unix epoch seconds); the store TTL enforces it.
    pub expires_at: i64,
}

/// Custom Debug implementation that redacts the identifying fields. The
/// bound credential is a live JWT and must never reach logs.
impl fmt::Debug for RefreshRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRecord")
            .field("user_id", &"[REDACTED]")
            .field("bound_credential", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues, resolves, and revokes refresh handles.
#[derive(Clone)]
pub struct RefreshRegistry {
    store: Arc<dyn SharedStore>,
}

impl RefreshRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// Generate a handle and persist its record with the 7-day TTL.
    ///
    /// The caller is responsible for delivering the handle to the client
    /// out-of-band from the access credential (response body, not cookie).
    ///
    /// # Errors
    ///
    /// Returns `IgError::Store` if the record cannot be written and
    /// `IgError::Internal` on serialization or CSPRNG failure.
    #[instrument(skip_all)]
    pub async fn issue_handle(
        &self,
        user_id: &str,
        bound_credential: &str,
    ) -> Result<String, IgError> {
        let handle = crypto::generate_refresh_handle()?;

        // Safe cast: REFRESH_TTL is seven days, well within i64 range
        #[allow(clippy::cast_possible_wrap)]
        let expires_at = Utc::now().timestamp() + REFRESH_TTL.as_secs() as i64;

        let record = RefreshRecord {
            user_id: user_id.to_string(),
            bound_credential: bound_credential.to_string(),
            expires_at,
        };

        let json = serde_json::to_string(&record).map_err(|e| {
            tracing::error!(target: "ig.auth.refresh", error = %e, "Failed to serialize refresh record");
            IgError::Internal
        })?;

        self.store
            .set_with_ttl(&refresh_key(&handle), &json, REFRESH_TTL)
            .await?;

        debug!(target: "ig.auth.refresh", "Issued refresh handle");
        Ok(handle)
    }

    /// Look up the record for a handle. Absent or expired handles resolve to
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns `IgError::Store` if the store is unreachable and
    /// `IgError::Internal` if a stored record fails to parse.
    #[instrument(skip_all)]
    pub async fn resolve(&self, handle: &str) -> Result<Option<RefreshRecord>, IgError> {
        let raw = self.store.get(&refresh_key(handle)).await?;

        match raw {
            Some(json) => {
                let record: RefreshRecord = serde_json::from_str(&json).map_err(|e| {
                    tracing::error!(
                        target: "ig.auth.refresh",
                        error = %e,
                        "Failed to deserialize refresh record"
                    );
                    IgError::Internal
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Delete the record for a handle. Idempotent: revoking an absent handle
    /// is not an error.
    ///
    /// # Errors
    ///
    /// Returns `IgError::Store` if the store is unreachable.
    #[instrument(skip_all)]
    pub async fn revoke(&self, handle: &str) -> Result<(), IgError> {
        let removed = self.store.delete(&refresh_key(handle)).await?;

        if removed {
            debug!(target: "ig.auth.refresh", "Revoked refresh handle");
        } else {
            warn!(
                target: "ig.auth.refresh",
                "Revoke on absent handle (already revoked or expired)"
            );
        }

        Ok(())
    }
}
