//! Tracing subscriber setup and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

/// Every counter the service emits, with its description.
pub const COUNTERS: &[(&str, &str)] = &[
    ("chirp_feed_cache_hit_total", "Feed reads answered from the cache."),
    (
        "chirp_feed_cache_miss_total",
        "Feed reads that fell through to the store, expired entries included.",
    ),
    (
        "chirp_feed_cache_evict_total",
        "Feeds dropped to make room for a newer one.",
    ),
    (
        "chirp_feed_cache_expired_total",
        "Feeds dropped on read after outliving their TTL.",
    ),
    (
        "chirp_rate_limit_allowed_total",
        "Post writes admitted by the rate limiter.",
    ),
    (
        "chirp_rate_limit_denied_total",
        "Post writes rejected by the rate limiter.",
    ),
    (
        "chirp_identity_batches_total",
        "Bulk profile requests sent to the identity service.",
    ),
];

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global subscriber. `RUST_LOG` refines the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    METRIC_DESCRIPTIONS.call_once(|| {
        for (name, description) in COUNTERS {
            describe_counter!(*name, Unit::Count, *description);
        }
    });

    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let output = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default())
        .with(output)
        .try_init()
        .map_err(|err| InfraError::Telemetry(err.to_string()))
}
