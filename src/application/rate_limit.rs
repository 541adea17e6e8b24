//! Sliding-window write limiter keyed per author.
//!
//! The limiter itself is stateless; event history lives in a
//! [`RateLimitStore`]. Use the Postgres store whenever more than one process
//! serves writes so every instance sees the same window.

use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use metrics::counter;
use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

const METRIC_ALLOWED: &str = "chirp_rate_limit_allowed_total";
const METRIC_DENIED: &str = "chirp_rate_limit_denied_total";

pub const DEFAULT_MAX_REQUESTS: u32 = 3;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: NonZeroU32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(max_requests: NonZeroU32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: NonZeroU32::new(DEFAULT_MAX_REQUESTS).unwrap_or(NonZeroU32::MIN),
            window: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// The event was recorded. `remaining` slots are left in the current window.
    Allowed { remaining: u32 },
    /// Nothing was recorded. The oldest event leaves the window after `retry_after`.
    Denied { retry_after: Duration },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("rate limit backend unavailable: {0}")]
    Backend(String),
}

/// Storage for per-key event timestamps.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Count the events recorded for `key` inside the trailing window and, if
    /// the count is below the policy maximum, record a new event. The check and
    /// the insert must be atomic per key.
    async fn try_acquire(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError>;

    /// Forget keys whose every event is older than `window`.
    async fn purge_expired(&self, window: Duration) -> Result<(), RateLimitError>;
}

#[derive(Clone)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy, store: Arc<dyn RateLimitStore>) -> Self {
        Self { policy, store }
    }

    /// Limiter whose state lives only in this process.
    pub fn in_memory(policy: RateLimitPolicy) -> Self {
        Self::new(policy, Arc::new(InMemoryRateLimitStore::new()))
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub async fn allow(&self, key: &str) -> Result<RateLimitDecision, RateLimitError> {
        let decision = self.store.try_acquire(key, &self.policy).await?;
        match decision {
            RateLimitDecision::Allowed { .. } => counter!(METRIC_ALLOWED).increment(1),
            RateLimitDecision::Denied { retry_after } => {
                counter!(METRIC_DENIED).increment(1);
                info!(
                    target = "chirp::rate_limit",
                    key,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "write rate limited"
                );
            }
        }
        Ok(decision)
    }

    pub async fn purge_expired(&self) -> Result<(), RateLimitError> {
        self.store.purge_expired(self.policy.window).await
    }
}

/// Process-local sliding window. Each key's history is guarded by its map
/// shard, so the count-and-record step cannot interleave for one key.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    buckets: DashMap<String, VecDeque<Instant>>,
}

impl InMemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop keys whose events have all left `window`.
    pub fn purge_idle(&self, window: Duration) {
        let now = Instant::now();
        self.buckets.retain(|_, events| {
            events
                .back()
                .is_some_and(|last| now.duration_since(*last) < window)
        });
    }

    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    fn acquire_at(&self, key: &str, policy: &RateLimitPolicy, now: Instant) -> RateLimitDecision {
        let window = policy.window;
        let max = policy.max_requests.get();

        let mut events = self.buckets.entry(key.to_owned()).or_default();
        while events
            .front()
            .is_some_and(|oldest| now.duration_since(*oldest) >= window)
        {
            events.pop_front();
        }

        let used = u32::try_from(events.len()).unwrap_or(u32::MAX);
        if used >= max {
            let retry_after = events
                .front()
                .map(|oldest| window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(window);
            return RateLimitDecision::Denied { retry_after };
        }

        events.push_back(now);
        RateLimitDecision::Allowed {
            remaining: max - used - 1,
        }
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn try_acquire(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        Ok(self.acquire_at(key, policy, Instant::now()))
    }

    async fn purge_expired(&self, window: Duration) -> Result<(), RateLimitError> {
        self.purge_idle(window);
        Ok(())
    }
}
