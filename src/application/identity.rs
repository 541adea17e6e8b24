//! Author identity resolution against the external identity service.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use metrics::counter;
use thiserror::Error;
use tracing::debug;

use crate::domain::entities::ProfileRecord;

const METRIC_IDENTITY_BATCHES: &str = "chirp_identity_batches_total";

/// Upper bound the identity service accepts per bulk lookup.
pub const DEFAULT_IDENTITY_BATCH_LIMIT: usize = 100;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity service request failed: {0}")]
    Transport(String),
    #[error("identity service responded with status {status}")]
    Status { status: u16 },
    #[error("identity service payload could not be decoded: {0}")]
    Decode(String),
}

/// Bulk profile lookup offered by the identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Fetch at most `limit` profiles for `ids`. Unknown ids are omitted from
    /// the result rather than reported as errors.
    async fn get_profiles(
        &self,
        ids: &[String],
        limit: usize,
    ) -> Result<Vec<ProfileRecord>, IdentityError>;
}

/// Deduplicates author ids and fans them out to the identity service in
/// batches no larger than the configured limit.
#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    batch_limit: NonZeroUsize,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, batch_limit: NonZeroUsize) -> Self {
        Self {
            provider,
            batch_limit,
        }
    }

    /// Resolve the given author ids. Ids the service does not know are absent
    /// from the returned map.
    pub async fn resolve<I, S>(
        &self,
        ids: I,
    ) -> Result<HashMap<String, ProfileRecord>, IdentityError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<String> = ids
            .into_iter()
            .filter_map(|id| {
                let id = id.as_ref();
                seen.insert(id.to_owned()).then(|| id.to_owned())
            })
            .collect();

        if unique.is_empty() {
            return Ok(HashMap::new());
        }

        let limit = self.batch_limit.get();
        let batches = unique.chunks(limit).collect::<Vec<_>>();
        debug!(
            target = "chirp::identity",
            ids = unique.len(),
            batches = batches.len(),
            "resolving authors"
        );

        let responses = try_join_all(batches.into_iter().map(|batch| {
            counter!(METRIC_IDENTITY_BATCHES).increment(1);
            self.provider.get_profiles(batch, limit)
        }))
        .await?;

        let requested: HashSet<&str> = unique.iter().map(String::as_str).collect();
        Ok(responses
            .into_iter()
            .flatten()
            .filter(|profile| requested.contains(profile.id.as_str()))
            .map(|profile| (profile.id.clone(), profile))
            .collect())
    }
}
