//! Sliding-window event log shared by every service instance.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use time::OffsetDateTime;

use crate::application::rate_limit::{
    RateLimitDecision, RateLimitError, RateLimitPolicy, RateLimitStore,
};

use super::PostgresRepositories;

#[derive(Clone)]
pub struct PostgresRateLimitStore {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn rate_limit_store(&self) -> PostgresRateLimitStore {
        PostgresRateLimitStore {
            pool: self.shared_pool(),
        }
    }
}

fn backend_error(err: sqlx::Error) -> RateLimitError {
    RateLimitError::Backend(err.to_string())
}

fn window_span(window: Duration) -> Result<time::Duration, RateLimitError> {
    time::Duration::try_from(window)
        .map_err(|_| RateLimitError::Backend("rate limit window out of range".to_string()))
}

#[async_trait]
impl RateLimitStore for PostgresRateLimitStore {
    /// Runs prune, count and insert in one transaction holding a per-key
    /// advisory lock, so concurrent callers for one key are serialized across
    /// all instances.
    async fn try_acquire(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let window = window_span(policy.window)?;
        let max = i64::from(policy.max_requests.get());

        let mut tx = self.pool.begin().await.map_err(backend_error)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(backend_error)?;

        let now: OffsetDateTime = sqlx::query_scalar("SELECT clock_timestamp()")
            .fetch_one(&mut *tx)
            .await
            .map_err(backend_error)?;

        sqlx::query("DELETE FROM rate_limit_events WHERE limiter_key = $1 AND recorded_at <= $2")
            .bind(key)
            .bind(now - window)
            .execute(&mut *tx)
            .await
            .map_err(backend_error)?;

        let (used, oldest): (i64, Option<OffsetDateTime>) = sqlx::query_as(
            "SELECT COUNT(*), MIN(recorded_at) FROM rate_limit_events WHERE limiter_key = $1",
        )
        .bind(key)
        .fetch_one(&mut *tx)
        .await
        .map_err(backend_error)?;

        if used >= max {
            tx.rollback().await.map_err(backend_error)?;
            let retry_after = oldest
                .map(|oldest| {
                    Duration::try_from(window - (now - oldest)).unwrap_or(Duration::ZERO)
                })
                .unwrap_or(policy.window);
            return Ok(RateLimitDecision::Denied { retry_after });
        }

        sqlx::query("INSERT INTO rate_limit_events (limiter_key, recorded_at) VALUES ($1, $2)")
            .bind(key)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(backend_error)?;

        tx.commit().await.map_err(backend_error)?;

        let remaining = u32::try_from(max - used - 1).unwrap_or(0);
        Ok(RateLimitDecision::Allowed { remaining })
    }

    async fn purge_expired(&self, window: Duration) -> Result<(), RateLimitError> {
        let window = window_span(window)?;
        sqlx::query("DELETE FROM rate_limit_events WHERE recorded_at <= clock_timestamp() - $1")
            .bind(window)
            .execute(self.pool.as_ref())
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}
