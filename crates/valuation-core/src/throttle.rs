//! Request pacing and response sharing for HTTP sources.
//!
//! Fields of one ticker are fetched concurrently, and several of them usually
//! live in the same upstream response. [`ResponseMemo`] makes those fetches
//! share a single request, and [`RateLimiter`] spaces the requests that remain.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    sync::OnceCell,
    time::{Instant, sleep_until},
};
use tracing::debug;

use crate::error::Result;

/// How long a fetched response body is reused.
pub const DEFAULT_RESPONSE_TTL: Duration = Duration::from_secs(60);

/// Spaces requests at least `interval` apart, including concurrent ones.
///
/// Each caller reserves the next free slot under a lock and then sleeps until
/// it outside the lock, so N simultaneous callers go out over N intervals.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: tokio::sync::Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing one request per `interval`.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: tokio::sync::Mutex::new(None),
        }
    }

    /// The minimum spacing between requests.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Waits for this caller's slot.
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |n| n.max(now));
            *next = Some(slot + self.interval);
            slot
        };

        let now = Instant::now();
        if slot > now {
            debug!(wait_ms = (slot - now).as_millis() as u64, "Rate limiting");
            sleep_until(slot).await;
        }
    }
}

type Slot = Arc<OnceCell<Result<String>>>;

/// Shares response bodies between concurrent and repeated requests.
///
/// The first caller for a key performs the fetch; callers arriving while it
/// is in flight wait for it, and later callers reuse the result until it is
/// older than the time-to-live. Failures are shared the same way, so an
/// unreachable endpoint costs one request per key.
#[derive(Debug)]
pub struct ResponseMemo {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, Slot)>>,
}

impl Default for ResponseMemo {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_TTL)
    }
}

impl ResponseMemo {
    /// Creates a memo keeping bodies for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the body stored under `key`, running `fetch` if there is none.
    ///
    /// # Errors
    ///
    /// Returns the error of the fetch that produced the entry.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        let slot = self.slot(key);
        slot.get_or_init(fetch).await.clone()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing is memoized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &str) -> Slot {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        entries.retain(|_, (created, _)| now.duration_since(*created) < self.ttl);
        Arc::clone(
            &entries
                .entry(key.to_string())
                .or_insert_with(|| (now, Arc::new(OnceCell::new())))
                .1,
        )
    }
}
