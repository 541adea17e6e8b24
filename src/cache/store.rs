//! Cache storage.

use std::sync::Mutex;

use lru::LruCache;
use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::entities::EnrichedPost;

use super::config::{CacheConfig, ExpiryPolicy};
use super::keys::FeedKey;
use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";
const METRIC_HIT: &str = "chirp_feed_cache_hit_total";
const METRIC_MISS: &str = "chirp_feed_cache_miss_total";
const METRIC_EVICT: &str = "chirp_feed_cache_evict_total";
const METRIC_EXPIRED: &str = "chirp_feed_cache_expired_total";

struct CacheEntry {
    posts: Vec<EnrichedPost>,
    touched_at: Instant,
}

struct CacheState {
    entries: LruCache<FeedKey, CacheEntry>,
    /// Bumped by every write invalidation.
    generation: u64,
}

/// Snapshot of the invalidation generation taken before a store read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket(u64);

/// Bounded, time-expiring map from feed scope to enriched post list.
///
/// All bookkeeping (promotion on hit, expiry, eviction on insert) happens under
/// a single mutex, so concurrent readers and writers observe each operation
/// atomically.
pub struct FeedCache {
    config: CacheConfig,
    state: Mutex<CacheState>,
}

impl FeedCache {
    pub fn new(config: CacheConfig) -> Self {
        let capacity = config.max_entries_non_zero();
        Self {
            config,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                generation: 0,
            }),
        }
    }

    /// Return the cached feed for `key` unless it is absent or expired. A hit
    /// marks the entry most recently used and, under
    /// [`ExpiryPolicy::RefreshOnRead`], restarts its TTL.
    pub fn get(&self, key: &FeedKey) -> Option<Vec<EnrichedPost>> {
        if !self.config.enabled {
            counter!(METRIC_MISS).increment(1);
            return None;
        }

        let now = Instant::now();
        let mut state = mutex_lock(&self.state, SOURCE, "get");

        let Some(entry) = state.entries.get_mut(key) else {
            counter!(METRIC_MISS).increment(1);
            return None;
        };

        if now.duration_since(entry.touched_at) < self.config.ttl {
            if self.config.expiry == ExpiryPolicy::RefreshOnRead {
                entry.touched_at = now;
            }
            counter!(METRIC_HIT).increment(1);
            return Some(entry.posts.clone());
        }

        state.entries.pop(key);
        debug!(target = "chirp::cache", key = %key, "expired entry dropped");
        counter!(METRIC_EXPIRED).increment(1);
        counter!(METRIC_MISS).increment(1);
        None
    }

    /// Store `posts` under `key`, resetting its age. Inserting a new key into a
    /// full cache evicts the least recently used entry.
    pub fn set(&self, key: FeedKey, posts: Vec<EnrichedPost>) {
        if !self.config.enabled {
            return;
        }
        let mut state = mutex_lock(&self.state, SOURCE, "set");
        Self::insert(&mut state, key, posts);
    }

    /// Take a ticket before reading the store for a cache fill.
    pub fn ticket(&self) -> FillTicket {
        FillTicket(mutex_lock(&self.state, SOURCE, "ticket").generation)
    }

    /// Like [`FeedCache::set`], but drops the value if a write invalidation ran
    /// after `ticket` was taken, since the value may predate that write.
    /// Returns whether the value was stored.
    pub fn fill(&self, ticket: FillTicket, key: FeedKey, posts: Vec<EnrichedPost>) -> bool {
        if !self.config.enabled {
            return false;
        }
        let mut state = mutex_lock(&self.state, SOURCE, "fill");
        if state.generation != ticket.0 {
            debug!(target = "chirp::cache", key = %key, "discarded fill raced by a write");
            return false;
        }
        Self::insert(&mut state, key, posts);
        true
    }

    fn insert(state: &mut CacheState, key: FeedKey, posts: Vec<EnrichedPost>) {
        let entry = CacheEntry {
            posts,
            touched_at: Instant::now(),
        };
        let replaced = state.entries.push(key.clone(), entry);
        if let Some((evicted, _)) = replaced.filter(|(evicted, _)| *evicted != key) {
            debug!(target = "chirp::cache", key = %evicted, "evicted least recently used entry");
            counter!(METRIC_EVICT).increment(1);
        }
    }

    pub fn invalidate(&self, key: &FeedKey) {
        mutex_lock(&self.state, SOURCE, "invalidate").entries.pop(key);
    }

    /// Drop every feed a new post by `author_id` belongs to, in one critical
    /// section, and void outstanding fill tickets.
    pub fn invalidate_for_new_post(&self, author_id: &str) {
        let mut state = mutex_lock(&self.state, SOURCE, "invalidate_for_new_post");
        state.generation = state.generation.wrapping_add(1);
        for key in FeedKey::affected_by_post(author_id) {
            state.entries.pop(&key);
        }
    }

    /// Whether `key` holds an unexpired entry. Does not touch recency or age.
    pub fn contains(&self, key: &FeedKey) -> bool {
        let now = Instant::now();
        mutex_lock(&self.state, SOURCE, "contains")
            .entries
            .peek(key)
            .is_some_and(|entry| now.duration_since(entry.touched_at) < self.config.ttl)
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
