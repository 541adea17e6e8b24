//! Post feed orchestration: cached enriched reads and rate-limited writes.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::enrichment::{self, EnrichmentError};
use crate::application::identity::{IdentityError, IdentityResolver};
use crate::application::rate_limit::{RateLimitDecision, RateLimitError, RateLimiter};
use crate::application::repos::{CreatePostParams, PostQuery, PostsRepo, PostsWriteRepo, RepoError};
use crate::cache::{FeedCache, FeedKey};
use crate::domain::entities::{EnrichedPost, PostRecord};
use crate::domain::error::DomainError;
use crate::domain::posts::PostContent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    All,
    Author(String),
}

impl FeedScope {
    pub fn cache_key(&self) -> FeedKey {
        match self {
            FeedScope::All => FeedKey::AllPosts,
            FeedScope::Author(id) => FeedKey::author(id.clone()),
        }
    }

    pub fn query(&self) -> PostQuery {
        match self {
            FeedScope::All => PostQuery::recent(),
            FeedScope::Author(id) => PostQuery::by_author(id.clone()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PostsError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("rate limited; retry in {}s", retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },
    #[error("post not found")]
    NotFound,
    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),
    #[error("post store failed: {0}")]
    Store(#[from] RepoError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Limiter(#[from] RateLimitError),
}

#[derive(Clone)]
pub struct PostsService {
    reader: Arc<dyn PostsRepo>,
    writer: Arc<dyn PostsWriteRepo>,
    identity: IdentityResolver,
    cache: Arc<FeedCache>,
    limiter: RateLimiter,
}

impl PostsService {
    pub fn new(
        reader: Arc<dyn PostsRepo>,
        writer: Arc<dyn PostsWriteRepo>,
        identity: IdentityResolver,
        cache: Arc<FeedCache>,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            reader,
            writer,
            identity,
            cache,
            limiter,
        }
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub async fn list_all(&self) -> Result<Vec<EnrichedPost>, PostsError> {
        self.list(FeedScope::All).await
    }

    pub async fn list_by_author(&self, author_id: &str) -> Result<Vec<EnrichedPost>, PostsError> {
        self.list(FeedScope::Author(author_id.to_owned())).await
    }

    /// Newest posts for `scope`, enriched with author profiles. Served from
    /// cache when possible; otherwise read from the store, joined and cached.
    #[instrument(skip(self))]
    pub async fn list(&self, scope: FeedScope) -> Result<Vec<EnrichedPost>, PostsError> {
        let key = scope.cache_key();
        if let Some(posts) = self.cache.get(&key) {
            debug!(target = "chirp::posts", key = %key, "returning from cache");
            return Ok(posts);
        }

        let ticket = self.cache.ticket();
        let posts = self.reader.find_posts(&scope.query()).await?;
        let enriched = self.enrich(posts).await?;

        debug!(
            target = "chirp::posts",
            key = %key,
            count = enriched.len(),
            "returning from store"
        );
        self.cache.fill(ticket, key, enriched.clone());
        Ok(enriched)
    }

    /// A single enriched post. Not cached.
    #[instrument(skip(self))]
    pub async fn get_post(&self, id: Uuid) -> Result<EnrichedPost, PostsError> {
        let post = self
            .reader
            .find_by_id(id)
            .await?
            .ok_or(PostsError::NotFound)?;
        let mut enriched = self.enrich(vec![post]).await?;
        enriched.pop().ok_or(PostsError::NotFound)
    }

    /// Publish `content` as `author_id`.
    ///
    /// Content is validated before anything else; a rate-limited call has no
    /// side effects. Feeds containing the new post are invalidated only after
    /// the insert succeeds.
    #[instrument(skip(self, content), fields(content_len = content.len()))]
    pub async fn create_post(
        &self,
        author_id: &str,
        content: &str,
    ) -> Result<PostRecord, PostsError> {
        let content = PostContent::parse(content)?;

        if let RateLimitDecision::Denied { retry_after } = self.limiter.allow(author_id).await? {
            return Err(PostsError::RateLimited { retry_after });
        }

        let post = self
            .writer
            .insert_post(CreatePostParams {
                author_id: author_id.to_owned(),
                content,
            })
            .await?;

        self.cache.invalidate_for_new_post(author_id);
        debug!(target = "chirp::posts", post_id = %post.id, "post created; feeds invalidated");
        Ok(post)
    }

    async fn enrich(&self, posts: Vec<PostRecord>) -> Result<Vec<EnrichedPost>, PostsError> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }
        let profiles = self
            .identity
            .resolve(posts.iter().map(|post| post.author_id.as_str()))
            .await?;
        Ok(enrichment::join(posts, &profiles)?)
    }
}
