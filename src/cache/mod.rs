//! Feed result cache.
//!
//! Holds enriched post lists keyed by feed scope. Bounded by entry count with
//! LRU eviction and expired lazily on read after a fixed time-to-live. It is
//! an accelerator only: a miss always falls back to the store.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! max_entries = 500
//! ttl_seconds = 10
//! refresh_on_read = true
//! ```

mod config;
mod keys;
mod lock;
mod store;

pub use config::{CacheConfig, ExpiryPolicy};
pub use keys::FeedKey;
pub use store::{FeedCache, FillTicket};
