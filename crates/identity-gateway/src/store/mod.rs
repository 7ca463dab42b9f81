//! Shared store abstraction.
//!
//! Every piece of mutable, time-sensitive state in the gateway (refresh
//! records, sessions, position baselines, rate-window counters) lives in a
//! single shared key-value store so that stateless gateway replicas observe
//! one truth. The store is an explicitly constructed, injected dependency
//! with a connect/ping/close lifecycle; no component reaches for a
//! process-wide singleton.
//!
//! The [`SharedStore`] trait is the seam: production wires
//! [`redis_store::RedisStore`], tests wire an in-memory mock.

pub mod lua_scripts;
pub mod redis_store;

// Test fixture: mock-store assertions may panic by design. Available to unit
// tests here and, via the `test-utils` feature, to the ig-test-utils crate.
#[cfg(any(test, feature = "test-utils"))]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub mod mock;

use std::time::Duration;
use thiserror::Error;

pub use redis_store::RedisStore;

/// Errors surfaced by shared store operations.
///
/// Any failure to reach the store must propagate to the caller: the
/// components built on top of it fail closed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or the operation failed in transit.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store returned a value the caller cannot interpret.
    #[error("invalid stored value: {0}")]
    InvalidValue(String),
}

/// Post-increment view of a rate window counter.
#[derive(Debug, Clone, Copy)]
pub struct WindowCount {
    /// Counter value after this increment.
    pub count: i64,
    /// Time remaining until the window resets.
    pub reset_after: Duration,
}

/// Key-value store with per-key TTLs and the two atomic primitives the
/// gateway core depends on.
///
/// All methods are single round-trips; no multi-step transaction spans the
/// store, so no cross-request race is introduced by callers that stick to
/// one call per decision.
#[async_trait::async_trait]
pub trait SharedStore: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key` with the given TTL, replacing any existing
    /// value.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Delete `key`. Returns `true` if a value was removed. Deleting an
    /// absent key is not an error.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Reset the TTL of `key`. Returns `false` if the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Atomically increment the counter at `key`, arming a TTL of `window`
    /// when the increment creates the key. The returned count is the single
    /// point of truth for quota decisions; callers must not cache it across
    /// the decision boundary.
    async fn incr_with_window(&self, key: &str, window: Duration)
        -> Result<WindowCount, StoreError>;

    /// Atomically replace the value at `key` with `new`, but only if the
    /// current value equals `expected` (`None` = key must be absent).
    /// Returns `true` when the swap happened.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Health check round-trip.
    async fn ping(&self) -> Result<(), StoreError>;
}
