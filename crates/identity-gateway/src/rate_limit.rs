//! Distributed fixed-window rate limiter.
//!
//! Counters live in the shared store, so every gateway replica enforces the
//! same quota for a given client identity. The post-increment count returned
//! by the store's atomic increment-with-expiry primitive is the single point
//! of truth: no handler caches a count across the decision boundary, and a
//! read-then-write split never happens.
//!
//! Store unreachable means **fail closed**: the limiter surfaces the error
//! and the request is refused; unavailability never silently allows
//! unlimited traffic.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument};

use crate::errors::IgError;
use crate::store::SharedStore;

/// Request quota: `limit` requests per `window`.
///
/// Parsed from the compact `"<limit>/<windowSeconds>"` notation, e.g.
/// `"100/60"` for 100 requests per 60 seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
    pub limit: u32,
    pub window: Duration,
}

impl RateQuota {
    #[must_use]
    pub const fn new(limit: u32, window_secs: u64) -> Self {
        Self {
            limit,
            window: Duration::from_secs(window_secs),
        }
    }
}

impl Default for RateQuota {
    /// 100 requests per 60 seconds.
    fn default() -> Self {
        Self::new(100, 60)
    }
}

/// Errors from parsing the compact quota notation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuotaParseError {
    #[error("expected \"<limit>/<windowSeconds>\", got {0:?}")]
    MissingSeparator(String),

    #[error("invalid limit: {0:?}")]
    InvalidLimit(String),

    #[error("invalid window: {0:?}")]
    InvalidWindow(String),
}

impl FromStr for RateQuota {
    type Err = QuotaParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (limit_part, window_part) = s
            .split_once('/')
            .ok_or_else(|| QuotaParseError::MissingSeparator(s.to_string()))?;

        let limit: u32 = limit_part
            .trim()
            .parse()
            .map_err(|_| QuotaParseError::InvalidLimit(limit_part.to_string()))?;
        if limit == 0 {
            return Err(QuotaParseError::InvalidLimit(limit_part.to_string()));
        }

        let window_secs: u64 = window_part
            .trim()
            .parse()
            .map_err(|_| QuotaParseError::InvalidWindow(window_part.to_string()))?;
        if window_secs == 0 {
            return Err(QuotaParseError::InvalidWindow(window_part.to_string()));
        }

        Ok(Self::new(limit, window_secs))
    }
}

impl fmt::Display for RateQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.limit, self.window.as_secs())
    }
}

/// Outcome of a quota check, carrying the metadata for standard rate-limit
/// response headers.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

/// Counter key derived deterministically from client identity and window so
/// that a quota reconfiguration cannot alias an in-flight window's counter.
#[must_use]
pub fn rate_key(client_key: &str, window: Duration) -> String {
    format!("ratelimit:{client_key}:{}", window.as_secs())
}

/// Enforces a request quota per client identity via shared-store counters.
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn SharedStore>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self { store }
    }

    /// Count this request against `client_key`'s window and decide.
    ///
    /// # Errors
    ///
    /// Returns `IgError::Store` if the store is unreachable; the caller
    /// must refuse the request (fail closed), never treat it as allowed.
    #[instrument(skip_all, fields(client_key = %client_key))]
    pub async fn allow(&self, client_key: &str, quota: RateQuota) -> Result<RateDecision, IgError> {
        let window_count = self
            .store
            .incr_with_window(&rate_key(client_key, quota.window), quota.window)
            .await?;

        let allowed = window_count.count <= i64::from(quota.limit);

        // Saturating: once over the limit, remaining stays at zero.
        let remaining = i64::from(quota.limit) - window_count.count;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let remaining = remaining.max(0) as u32;

        if !allowed {
            debug!(
                target: "ig.rate_limit",
                count = window_count.count,
                limit = quota.limit,
                "Request denied by rate limiter"
            );
        }

        Ok(RateDecision {
            allowed,
            limit: quota.limit,
            remaining,
            reset_after: window_count.reset_after,
        })
    }
}
