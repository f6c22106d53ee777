//! Per-client fixed-window rate limiting.
//!
//! Each (service, client) key owns a counter that lives for one window.
//! Every admitted request refreshes the expiry to a full window from now,
//! so a steady client stays in the same window; a key that goes quiet for
//! a full window starts over. Bursts straddling an expiry can admit up to
//! twice the limit.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::observability::metrics;

/// Longest window the limiter accepts; longer windows are clamped.
pub const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock backed by `Instant::now`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Identifies one rate-limit bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub service: String,
    pub client: String,
}

impl RateLimitKey {
    pub fn new(service: impl Into<String>, client: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            client: client.into(),
        }
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.client)
    }
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    expires_at: Instant,
}

/// `now + window`, with the window clamped to [`MAX_WINDOW`].
fn expiry(now: Instant, window: Duration) -> Instant {
    now.checked_add(window.min(MAX_WINDOW)).unwrap_or(now)
}

impl RateLimitEntry {
    fn fresh(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            expires_at: expiry(now, window),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

/// Shared store of rate-limit counters.
///
/// All reads and writes for one key happen under that key's shard lock,
/// so concurrent requests from the same client cannot lose updates.
pub struct RateLimiter {
    entries: DashMap<RateLimitKey, RateLimitEntry>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Count one request against `key` if it is still under `limit` for the
    /// current window.
    pub fn check_and_increment(
        &self,
        key: &RateLimitKey,
        window: Duration,
        limit: u32,
    ) -> RateDecision {
        if limit == 0 {
            return RateDecision::Limited {
                retry_after: window.min(MAX_WINDOW),
            };
        }

        let now = self.clock.now();
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_expired(now) {
                    *entry = RateLimitEntry::fresh(now, window);
                    RateDecision::Allowed {
                        remaining: limit - 1,
                    }
                } else if entry.count < limit {
                    entry.count += 1;
                    entry.expires_at = expiry(now, window);
                    RateDecision::Allowed {
                        remaining: limit - entry.count,
                    }
                } else {
                    RateDecision::Limited {
                        retry_after: entry.expires_at.saturating_duration_since(now),
                    }
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(RateLimitEntry::fresh(now, window));
                RateDecision::Allowed {
                    remaining: limit - 1,
                }
            }
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of live (possibly expired but not yet swept) entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sweep expired entries every `interval` until shutdown.
    pub fn spawn_sweeper(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = self.purge_expired();
                        metrics::record_rate_limit_entries(self.len());
                        if evicted > 0 {
                            tracing::debug!(evicted, remaining = self.len(), "Swept rate limit entries");
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate limit sweeper stopping");
                        break;
                    }
                }
            }
        })
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("entries", &self.entries.len())
            .finish()
    }
}
