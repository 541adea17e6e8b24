#![allow(dead_code)]

use std::collections::HashMap;
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use chirp::application::identity::{IdentityError, IdentityProvider, IdentityResolver};
use chirp::application::posts::PostsService;
use chirp::application::rate_limit::{RateLimitPolicy, RateLimiter};
use chirp::application::repos::{
    CreatePostParams, CreatedAtOrder, PostQuery, PostsRepo, PostsWriteRepo, RepoError,
};
use chirp::cache::{CacheConfig, FeedCache};
use chirp::domain::entities::{PostRecord, ProfileRecord};

/// Post store kept in memory. Timestamps advance one second per insert so
/// ordering is deterministic.
pub struct InMemoryPosts {
    posts: Mutex<Vec<PostRecord>>,
    reads: AtomicUsize,
    unavailable: AtomicBool,
    base: OffsetDateTime,
}

impl Default for InMemoryPosts {
    fn default() -> Self {
        Self {
            posts: Mutex::new(Vec::new()),
            reads: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            base: OffsetDateTime::UNIX_EPOCH + time::Duration::days(20_000),
        }
    }
}

impl InMemoryPosts {
    /// Write straight to storage, bypassing the service and its cache.
    pub async fn insert_direct(&self, author_id: &str, content: &str) -> PostRecord {
        let mut posts = self.posts.lock().await;
        let record = PostRecord {
            id: Uuid::new_v4(),
            content: content.to_string(),
            author_id: author_id.to_string(),
            created_at: self.base + time::Duration::seconds(posts.len() as i64),
        };
        posts.push(record.clone());
        record
    }

    pub async fn count(&self) -> usize {
        self.posts.lock().await.len()
    }

    /// Number of feed queries served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl PostsRepo for InMemoryPosts {
    async fn find_posts(&self, query: &PostQuery) -> Result<Vec<PostRecord>, RepoError> {
        self.check_available()?;
        self.reads.fetch_add(1, Ordering::SeqCst);

        let posts = self.posts.lock().await;
        let mut matching: Vec<PostRecord> = posts
            .iter()
            .filter(|post| {
                query
                    .author_id
                    .as_deref()
                    .is_none_or(|author| post.author_id == author)
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        if query.order == CreatedAtOrder::NewestFirst {
            matching.reverse();
        }
        matching.truncate(query.limit as usize);
        Ok(matching)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        self.check_available()?;
        let posts = self.posts.lock().await;
        Ok(posts.iter().find(|post| post.id == id).cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryPosts {
    async fn insert_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        self.check_available()?;
        Ok(self
            .insert_direct(&params.author_id, params.content.as_str())
            .await)
    }
}

/// Identity service double holding a fixed profile table.
#[derive(Default)]
pub struct StaticIdentity {
    profiles: Mutex<HashMap<String, ProfileRecord>>,
    calls: Mutex<Vec<Vec<String>>>,
    unavailable: AtomicBool,
}

impl StaticIdentity {
    pub fn with_users(users: &[&str]) -> Self {
        let profiles = users
            .iter()
            .map(|id| {
                (
                    id.to_string(),
                    ProfileRecord {
                        id: id.to_string(),
                        username: Some(format!("{id}_handle")),
                        profile_picture: Some(format!("https://img.example/{id}.png")),
                    },
                )
            })
            .collect();
        Self {
            profiles: Mutex::new(profiles),
            ..Default::default()
        }
    }

    pub async fn add_user(&self, id: &str) {
        self.profiles.lock().await.insert(
            id.to_string(),
            ProfileRecord {
                id: id.to_string(),
                username: Some(format!("{id}_handle")),
                profile_picture: None,
            },
        );
    }

    pub async fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().await.clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn get_profiles(
        &self,
        ids: &[String],
        limit: usize,
    ) -> Result<Vec<ProfileRecord>, IdentityError> {
        self.calls.lock().await.push(ids.to_vec());
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(IdentityError::Status { status: 503 });
        }
        let profiles = self.profiles.lock().await;
        Ok(ids
            .iter()
            .filter_map(|id| profiles.get(id).cloned())
            .take(limit)
            .collect())
    }
}

pub struct Harness {
    pub service: Arc<PostsService>,
    pub posts: Arc<InMemoryPosts>,
    pub identity: Arc<StaticIdentity>,
}

pub struct HarnessBuilder {
    cache: CacheConfig,
    policy: RateLimitPolicy,
    batch_limit: usize,
    users: Vec<String>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            policy: RateLimitPolicy::default(),
            batch_limit: 100,
            users: vec!["alice".to_string(), "bob".to_string()],
        }
    }
}

impl HarnessBuilder {
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn rate_limit(mut self, max_requests: u32, window: Duration) -> Self {
        self.policy = RateLimitPolicy::new(
            NonZeroU32::new(max_requests).expect("non-zero max"),
            window,
        );
        self
    }

    pub fn batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    pub fn users(mut self, users: &[&str]) -> Self {
        self.users = users.iter().map(|user| user.to_string()).collect();
        self
    }

    pub fn build(self) -> Harness {
        let posts = Arc::new(InMemoryPosts::default());
        let users: Vec<&str> = self.users.iter().map(String::as_str).collect();
        let identity = Arc::new(StaticIdentity::with_users(&users));
        let resolver = IdentityResolver::new(
            identity.clone(),
            NonZeroUsize::new(self.batch_limit).expect("non-zero batch limit"),
        );
        let service = PostsService::new(
            posts.clone(),
            posts.clone(),
            resolver,
            Arc::new(FeedCache::new(self.cache)),
            RateLimiter::in_memory(self.policy),
        );
        Harness {
            service: Arc::new(service),
            posts,
            identity,
        }
    }
}

pub fn harness() -> Harness {
    HarnessBuilder::default().build()
}
