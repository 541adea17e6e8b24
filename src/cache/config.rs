//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_MAX_ENTRIES: usize = 500;
const DEFAULT_TTL: Duration = Duration::from_secs(10);

/// How a cache hit affects the entry's age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpiryPolicy {
    /// A hit resets the entry's age, so a key read more often than the TTL
    /// never expires.
    #[default]
    RefreshOnRead,
    /// The entry expires one TTL after it was stored, whatever the traffic.
    FixedFromInsert,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// When false every lookup misses and stores are dropped.
    pub enabled: bool,
    /// Maximum number of cached feeds before LRU eviction.
    pub max_entries: usize,
    pub ttl: Duration,
    pub expiry: ExpiryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: DEFAULT_MAX_ENTRIES,
            ttl: DEFAULT_TTL,
            expiry: ExpiryPolicy::default(),
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            max_entries: settings.max_entries.get(),
            ttl: settings.ttl,
            expiry: if settings.refresh_on_read {
                ExpiryPolicy::RefreshOnRead
            } else {
                ExpiryPolicy::FixedFromInsert
            },
        }
    }
}

impl CacheConfig {
    /// Returns the entry limit as NonZeroUsize, clamping to 1 if zero.
    pub fn max_entries_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.max_entries).unwrap_or(NonZeroUsize::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_entries, 500);
        assert_eq!(config.ttl, Duration::from_secs(10));
        assert_eq!(config.expiry, ExpiryPolicy::RefreshOnRead);
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            max_entries: 0,
            ..Default::default()
        };
        assert_eq!(config.max_entries_non_zero().get(), 1);
    }
}
