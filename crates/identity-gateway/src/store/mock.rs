//! In-memory shared-store mock for tests.
//!
//! Implements [`SharedStore`](super::SharedStore) over a `HashMap` with a
//! mock clock, so TTL behavior (window resets, handle expiry, sliding
//! sessions) is testable without a live Redis and without sleeping.
//!
//! # Example
//!
//! ```rust,ignore
//! use identity_gateway::store::mock::MockStore;
//!
//! let store = MockStore::new();
//! store.raw_set("token:abc", "{...}", Some(Duration::from_secs(60)));
//!
//! store.advance(Duration::from_secs(61));
//! assert!(store.raw_get("token:abc").is_none()); // expired
//!
//! store.set_unavailable(true); // every operation now fails
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::store::{SharedStore, StoreError, WindowCount};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    /// Mock-clock instant at which the entry disappears.
    expires_at_ms: i64,
}

#[derive(Debug, Default)]
struct MockStoreInner {
    entries: HashMap<String, Entry>,
    now_ms: i64,
    unavailable: bool,
}

impl MockStoreInner {
    fn live_value(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|entry| entry.expires_at_ms > self.now_ms)
            .map(|entry| entry.value.clone())
    }
}

/// Mock shared store for gateway tests.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

impl MockStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the mock clock; entries whose TTL elapses become invisible.
    pub fn advance(&self, duration: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.now_ms += i64::try_from(duration.as_millis()).unwrap();
    }

    /// Toggle failure injection. While unavailable, every store operation
    /// returns `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.unavailable = unavailable;
    }

    /// Direct read for assertions (respects the mock clock).
    #[must_use]
    pub fn raw_get(&self, key: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.live_value(key)
    }

    /// Direct write for fixtures. `None` TTL means effectively immortal.
    pub fn raw_set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let mut inner = self.inner.lock().unwrap();
        let expires_at_ms = match ttl {
            Some(ttl) => inner.now_ms + i64::try_from(ttl.as_millis()).unwrap(),
            None => i64::MAX,
        };
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at_ms,
            },
        );
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .values()
            .filter(|entry| entry.expires_at_ms > inner.now_ms)
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(inner: &MockStoreInner) -> Result<(), StoreError> {
        if inner.unavailable {
            return Err(StoreError::Unavailable("mock store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl SharedStore for MockStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(inner.live_value(key))
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        let expires_at_ms = inner.now_ms + i64::try_from(ttl.as_millis()).unwrap();
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at_ms,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        let was_live = inner.live_value(key).is_some();
        inner.entries.remove(key);
        Ok(was_live)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        if inner.live_value(key).is_none() {
            return Ok(false);
        }

        let expires_at_ms = inner.now_ms + i64::try_from(ttl.as_millis()).unwrap();
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.expires_at_ms = expires_at_ms;
        }
        Ok(true)
    }

    async fn incr_with_window(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowCount, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        match inner.live_value(key) {
            Some(raw) => {
                let count: i64 = raw
                    .parse()
                    .map_err(|_| StoreError::InvalidValue(format!("non-integer counter: {raw}")))?;
                let count = count + 1;

                let expires_at_ms = inner
                    .entries
                    .get(key)
                    .map(|entry| entry.expires_at_ms)
                    .unwrap_or(inner.now_ms);

                inner.entries.insert(
                    key.to_string(),
                    Entry {
                        value: count.to_string(),
                        expires_at_ms,
                    },
                );

                let remaining_ms = (expires_at_ms - inner.now_ms).max(0);
                // Ceil to whole seconds, matching Redis TTL granularity.
                let reset_after = Duration::from_secs(((remaining_ms + 999) / 1000) as u64);

                Ok(WindowCount { count, reset_after })
            }
            None => {
                let expires_at_ms = inner.now_ms + i64::try_from(window.as_millis()).unwrap();
                inner.entries.insert(
                    key.to_string(),
                    Entry {
                        value: "1".to_string(),
                        expires_at_ms,
                    },
                );

                Ok(WindowCount {
                    count: 1,
                    reset_after: window,
                })
            }
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&str>,
        new: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;

        let current = inner.live_value(key);
        let matches = match (expected, current.as_deref()) {
            (None, None) => true,
            (Some(expected), Some(current)) => expected == current,
            _ => false,
        };

        if !matches {
            return Ok(false);
        }

        let expires_at_ms = inner.now_ms + i64::try_from(ttl.as_millis()).unwrap();
        inner.entries.insert(
            key.to_string(),
            Entry {
                value: new.to_string(),
                expires_at_ms,
            },
        );
        Ok(true)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let inner = self.inner.lock().unwrap();
        Self::check_available(&inner)?;
        Ok(())
    }
}
