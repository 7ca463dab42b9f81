//! Anti-spoofing velocity check for session-bound position reports.
//!
//! The guard keeps one baseline `(lat, lng, timestamp)` per session and
//! rejects a new report when the implied average speed from the last
//! *accepted* point exceeds a configured maximum. This is a coarse
//! anti-cheat heuristic, not a precise geofence: false positives near the
//! threshold are acceptable; the threshold stays conservative so spoofing
//! is what gets missed least.
//!
//! Speed semantics: `distance_km / (elapsed_seconds / 60)` compared against
//! `max_km_per_minute`, using the full timestamp difference. A non-positive
//! elapsed time with any displacement implies infinite speed and is
//! rejected; zero displacement is always plausible.
//!
//! # Concurrency
//!
//! The read-decide-write sequence is not safe against concurrent reports on
//! the same session, so the write is a compare-and-swap against the exact
//! baseline the decision was derived from. When the swap loses the race the
//! decision is re-derived from the fresh baseline. Rejected reports perform
//! no write at all (reject-and-hold): an attacker cannot walk the baseline
//! forward with a sequence of rejected guesses.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::errors::IgError;
use crate::session::SESSION_TTL;
use crate::store::SharedStore;

/// Default maximum plausible travel speed (km per minute). 10 km/min is
/// 600 km/h: above any ground vehicle, below a commercial jet at cruise.
pub const DEFAULT_MAX_KM_PER_MINUTE: f64 = 10.0;

/// Mean Earth radius in kilometers (IUGG).
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Store key for a session's position baseline.
#[must_use]
pub fn position_key(session_id: &str) -> String {
    format!("session:{session_id}:pos")
}

/// Position baseline as stored under `session:{id}:pos`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionState {
    pub lat: f64,
    pub lng: f64,
    /// Timestamp of the last accepted report (Unix epoch milliseconds).
    pub updated_at_ms: i64,
}

/// Outcome of a position report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOutcome {
    /// Report accepted; the baseline now points at it.
    Accepted,
    /// Implied speed exceeded the maximum; the baseline is unchanged.
    Rejected,
}

/// Great-circle distance between two points, in kilometers (haversine).
#[must_use]
pub fn great_circle_distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Validates successive geolocation reports against a plausibility model.
#[derive(Clone)]
pub struct SessionPositionGuard {
    store: Arc<dyn SharedStore>,
    max_km_per_minute: f64,
}

impl SessionPositionGuard {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>, max_km_per_minute: f64) -> Self {
        Self {
            store,
            max_km_per_minute,
        }
    }

    /// Whether moving from `prev` to `(lat, lng)` at `now_ms` stays within
    /// the plausible speed envelope.
    fn is_plausible(&self, prev: &PositionState, lat: f64, lng: f64, now_ms: i64) -> bool {
        let distance_km = great_circle_distance_km(prev.lat, prev.lng, lat, lng);
        if distance_km <= f64::EPSILON {
            return true;
        }

        let elapsed_ms = now_ms - prev.updated_at_ms;
        if elapsed_ms <= 0 {
            // Displacement in zero (or negative) time: implied speed is
            // unbounded.
            return false;
        }

        // Full timestamp difference, coherent km-per-minute units.
        #[allow(clippy::cast_precision_loss)]
        let elapsed_minutes = elapsed_ms as f64 / 60_000.0;
        let implied_speed = distance_km / elapsed_minutes;

        implied_speed <= self.max_km_per_minute
    }

    /// Validate a position report for `session_id` and, when plausible,
    /// advance the baseline to it.
    ///
    /// The first report of a session always seeds the baseline and is
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns `IgError::Store` if the store is unreachable and
    /// `IgError::Internal` if a stored baseline fails to parse.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn report_position(
        &self,
        session_id: &str,
        lat: f64,
        lng: f64,
        now: DateTime<Utc>,
    ) -> Result<PositionOutcome, IgError> {
        let key = position_key(session_id);
        let now_ms = now.timestamp_millis();

        let next = PositionState {
            lat,
            lng,
            updated_at_ms: now_ms,
        };
        let next_json = serde_json::to_string(&next).map_err(|e| {
            tracing::error!(target: "ig.session.guard", error = %e, "Failed to serialize baseline");
            IgError::Internal
        })?;

        loop {
            let current = self.store.get(&key).await?;

            match current {
                None => {
                    // Unseeded: the first accepted report becomes the baseline.
                    if self
                        .store
                        .compare_and_swap(&key, None, &next_json, SESSION_TTL)
                        .await?
                    {
                        debug!(target: "ig.session.guard", "Seeded position baseline");
                        return Ok(PositionOutcome::Accepted);
                    }
                    // Another report seeded first; re-derive against it.
                }
                Some(prev_json) => {
                    let prev: PositionState = serde_json::from_str(&prev_json).map_err(|e| {
                        tracing::error!(
                            target: "ig.session.guard",
                            error = %e,
                            "Failed to deserialize baseline"
                        );
                        IgError::Internal
                    })?;

                    if !self.is_plausible(&prev, lat, lng, now_ms) {
                        // Reject-and-hold: no write, baseline stays put.
                        debug!(
                            target: "ig.session.guard",
                            "Rejected position report: implausible speed"
                        );
                        return Ok(PositionOutcome::Rejected);
                    }

                    if self
                        .store
                        .compare_and_swap(&key, Some(&prev_json), &next_json, SESSION_TTL)
                        .await?
                    {
                        debug!(target: "ig.session.guard", "Advanced position baseline");
                        return Ok(PositionOutcome::Accepted);
                    }
                    // Baseline moved underneath us; re-derive the decision.
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::store::mock::MockStore;

    // Paris seed, a nearby nudge, and the Marseille jump.
    const PARIS: (f64, f64) = (48.8566, 2.3522);
    const PARIS_NEARBY: (f64, f64) = (48.8567, 2.3523);
    const MARSEILLE: (f64, f64) = (43.2965, 5.3698);

    fn guard(store: &MockStore) -> SessionPositionGuard {
        SessionPositionGuard::new(Arc::new(store.clone()), DEFAULT_MAX_KM_PER_MINUTE)
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    // -------------------------------------------------------------------------
    // Distance function
    // -------------------------------------------------------------------------

    #[test]
    fn test_distance_identical_points_is_zero() {
        let d = great_circle_distance_km(PARIS.0, PARIS.1, PARIS.0, PARIS.1);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn test_distance_paris_marseille() {
        let d = great_circle_distance_km(PARIS.0, PARIS.1, MARSEILLE.0, MARSEILLE.1);
        // ~660 km by great circle.
        assert!((640.0..=680.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = great_circle_distance_km(PARIS.0, PARIS.1, MARSEILLE.0, MARSEILLE.1);
        let b = great_circle_distance_km(MARSEILLE.0, MARSEILLE.1, PARIS.0, PARIS.1);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_distance_tiny_displacement() {
        let d = great_circle_distance_km(PARIS.0, PARIS.1, PARIS_NEARBY.0, PARIS_NEARBY.1);
        assert!(d < 0.05, "got {d}");
    }

    // -------------------------------------------------------------------------
    // Speed semantics (the coherent unit arithmetic, pinned deliberately)
    // -------------------------------------------------------------------------

    #[test]
    fn test_speed_uses_full_elapsed_time_not_subsecond_remainder() {
        let store = MockStore::new();
        let g = guard(&store);
        let prev = PositionState {
            lat: PARIS.0,
            lng: PARIS.1,
            updated_at_ms: 0,
        };

        // 660 km in 90 minutes is ~7.3 km/min: plausible. Under the broken
        // sub-second arithmetic the elapsed value would collapse to zero and
        // this would be rejected.
        let ninety_minutes_ms = 90 * 60 * 1000;
        assert!(g.is_plausible(&prev, MARSEILLE.0, MARSEILLE.1, ninety_minutes_ms));

        // The same trip in one second is ~39,600 km/min: rejected.
        assert!(!g.is_plausible(&prev, MARSEILLE.0, MARSEILLE.1, 1000));
    }

    #[test]
    fn test_speed_exactly_at_threshold_is_accepted() {
        let store = MockStore::new();
        let g = guard(&store);
        let prev = PositionState {
            lat: 0.0,
            lng: 0.0,
            updated_at_ms: 0,
        };

        // One degree of longitude at the equator is ~111.19 km. Find the
        // elapsed time that puts the implied speed exactly at the maximum,
        // then nudge either side of it.
        let d = great_circle_distance_km(0.0, 0.0, 0.0, 1.0);
        let exact_ms = (d / DEFAULT_MAX_KM_PER_MINUTE * 60_000.0).ceil() as i64;

        assert!(g.is_plausible(&prev, 0.0, 1.0, exact_ms));
        assert!(!g.is_plausible(&prev, 0.0, 1.0, exact_ms / 2));
    }

    #[test]
    fn test_zero_elapsed_zero_displacement_is_plausible() {
        let store = MockStore::new();
        let g = guard(&store);
        let prev = PositionState {
            lat: PARIS.0,
            lng: PARIS.1,
            updated_at_ms: 5000,
        };

        assert!(g.is_plausible(&prev, PARIS.0, PARIS.1, 5000));
    }

    #[test]
    fn test_zero_elapsed_with_displacement_is_rejected() {
        let store = MockStore::new();
        let g = guard(&store);
        let prev = PositionState {
            lat: PARIS.0,
            lng: PARIS.1,
            updated_at_ms: 5000,
        };

        assert!(!g.is_plausible(&prev, MARSEILLE.0, MARSEILLE.1, 5000));
        // Clock regression with displacement is equally implausible.
        assert!(!g.is_plausible(&prev, MARSEILLE.0, MARSEILLE.1, 4000));
    }

    // -------------------------------------------------------------------------
    // Report lifecycle
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_first_report_always_seeds_and_accepts() {
        let store = MockStore::new();
        let g = guard(&store);

        let outcome = g
            .report_position("sess-1", PARIS.0, PARIS.1, at(0))
            .await
            .unwrap();
        assert_eq!(outcome, PositionOutcome::Accepted);

        let stored: PositionState =
            serde_json::from_str(&store.raw_get(&position_key("sess-1")).unwrap()).unwrap();
        assert!((stored.lat - PARIS.0).abs() < 1e-9);
        assert!((stored.lng - PARIS.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_plausible_report_advances_baseline() {
        let store = MockStore::new();
        let g = guard(&store);

        g.report_position("sess-1", PARIS.0, PARIS.1, at(0))
            .await
            .unwrap();

        // Tiny displacement, five seconds: accepted.
        let outcome = g
            .report_position("sess-1", PARIS_NEARBY.0, PARIS_NEARBY.1, at(5))
            .await
            .unwrap();
        assert_eq!(outcome, PositionOutcome::Accepted);

        let stored: PositionState =
            serde_json::from_str(&store.raw_get(&position_key("sess-1")).unwrap()).unwrap();
        assert!((stored.lat - PARIS_NEARBY.0).abs() < 1e-9);
        assert_eq!(stored.updated_at_ms, at(5).timestamp_millis());
    }

    #[tokio::test]
    async fn test_implausible_report_rejected_and_baseline_held() {
        let store = MockStore::new();
        let g = guard(&store);

        g.report_position("sess-1", PARIS.0, PARIS.1, at(0))
            .await
            .unwrap();
        g.report_position("sess-1", PARIS_NEARBY.0, PARIS_NEARBY.1, at(5))
            .await
            .unwrap();
        let before = store.raw_get(&position_key("sess-1")).unwrap();

        // Paris -> Marseille one second after the last accepted point.
        let outcome = g
            .report_position("sess-1", MARSEILLE.0, MARSEILLE.1, at(6))
            .await
            .unwrap();
        assert_eq!(outcome, PositionOutcome::Rejected);

        // Reject-and-hold: the stored triple is byte-identical.
        let after = store.raw_get(&position_key("sess-1")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_rejected_guesses_cannot_walk_the_baseline() {
        let store = MockStore::new();
        let g = guard(&store);

        g.report_position("sess-1", PARIS.0, PARIS.1, at(0))
            .await
            .unwrap();

        // A burst of implausible jumps, each a little further along: every
        // one must be judged against the original baseline and rejected.
        for (i, lat_step) in [1.0f64, 2.0, 3.0, 4.0].iter().enumerate() {
            let outcome = g
                .report_position(
                    "sess-1",
                    PARIS.0 - lat_step,
                    PARIS.1,
                    at(1 + i as i64),
                )
                .await
                .unwrap();
            assert_eq!(outcome, PositionOutcome::Rejected);
        }

        let stored: PositionState =
            serde_json::from_str(&store.raw_get(&position_key("sess-1")).unwrap()).unwrap();
        assert!((stored.lat - PARIS.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_marseille_is_reachable_given_enough_time() {
        let store = MockStore::new();
        let g = guard(&store);

        g.report_position("sess-1", PARIS.0, PARIS.1, at(0))
            .await
            .unwrap();

        // 90 minutes later the same trip is within the envelope.
        let outcome = g
            .report_position("sess-1", MARSEILLE.0, MARSEILLE.1, at(90 * 60))
            .await
            .unwrap();
        assert_eq!(outcome, PositionOutcome::Accepted);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = MockStore::new();
        let g = guard(&store);

        g.report_position("sess-1", PARIS.0, PARIS.1, at(0))
            .await
            .unwrap();

        // A different session seeding in Marseille is its own first report.
        let outcome = g
            .report_position("sess-2", MARSEILLE.0, MARSEILLE.1, at(1))
            .await
            .unwrap();
        assert_eq!(outcome, PositionOutcome::Accepted);
    }

    #[tokio::test]
    async fn test_store_outage_fails_closed() {
        let store = MockStore::new();
        let g = guard(&store);

        store.set_unavailable(true);
        let result = g.report_position("sess-1", PARIS.0, PARIS.1, at(0)).await;
        assert!(matches!(result, Err(IgError::Store(_))));
    }
}
