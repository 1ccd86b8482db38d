//! Expiring attempt counters

use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

/// Longest window a counter may hold; longer windows are clamped to it
pub const MAX_WINDOW: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Counter store errors
#[derive(Error, Debug)]
pub enum CounterError {
    #[error("Counter store unavailable: {0}")]
    Unavailable(String),
}

/// Key-value counter store with per-key expiry.
///
/// `incr` must be atomic per key: concurrent callers on the same key each
/// observe a distinct previous value.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment the counter for `key` and return the value it held before
    /// the increment (0 when absent or expired). A freshly created counter
    /// expires `window` after creation; later increments keep that deadline.
    async fn incr(&self, key: &str, window: Duration) -> Result<u64, CounterError>;
}

#[derive(Debug, Clone)]
struct Counter {
    count: u64,
    expires_at: Instant,
}

impl Counter {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-local counter store
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<String, Counter>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired counters (call periodically)
    pub async fn purge_expired(&self) -> usize {
        let mut counters = self.counters.lock().await;
        let now = Instant::now();
        let before = counters.len();
        counters.retain(|_, counter| counter.is_live(now));
        before - counters.len()
    }

    /// Number of live counters
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.counters
            .lock()
            .await
            .values()
            .filter(|c| c.is_live(now))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str, window: Duration) -> Result<u64, CounterError> {
        let mut counters = self.counters.lock().await;
        let now = Instant::now();

        match counters.get_mut(key) {
            Some(counter) if counter.is_live(now) => {
                let previous = counter.count;
                counter.count += 1;
                Ok(previous)
            }
            _ => {
                let expires_at = now.checked_add(window.min(MAX_WINDOW)).ok_or_else(|| {
                    CounterError::Unavailable("counter window overflows the clock".to_string())
                })?;
                counters.insert(
                    key.to_string(),
                    Counter {
                        count: 1,
                        expires_at,
                    },
                );
                Ok(0)
            }
        }
    }
}
