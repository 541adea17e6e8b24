//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::PostRecord;
use crate::domain::posts::PostContent;

/// Hard ceiling on rows returned by a single feed query.
pub const FEED_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CreatedAtOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub author_id: Option<String>,
    pub limit: u32,
    pub order: CreatedAtOrder,
}

impl PostQuery {
    /// Newest posts across all authors.
    pub fn recent() -> Self {
        Self {
            author_id: None,
            limit: FEED_PAGE_LIMIT,
            order: CreatedAtOrder::NewestFirst,
        }
    }

    /// Newest posts written by `author_id`.
    pub fn by_author(author_id: impl Into<String>) -> Self {
        Self {
            author_id: Some(author_id.into()),
            ..Self::recent()
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: String,
    pub content: PostContent,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn find_posts(&self, query: &PostQuery) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn insert_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;
}
