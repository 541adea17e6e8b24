//! Joins posts with resolved author profiles.

use std::collections::HashMap;

use thiserror::Error;

use crate::domain::entities::{EnrichedPost, PostRecord, ProfileRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    #[error("author `{author_id}` not found for post `{post_id}`")]
    AuthorNotFound { author_id: String, post_id: String },
}

/// Attach an author to every post, preserving input order.
///
/// Fails on the first post whose author is missing from `profiles` or lacks a
/// username; no partial list is ever returned.
pub fn join(
    posts: Vec<PostRecord>,
    profiles: &HashMap<String, ProfileRecord>,
) -> Result<Vec<EnrichedPost>, EnrichmentError> {
    posts
        .into_iter()
        .map(|post| {
            let author = profiles
                .get(&post.author_id)
                .cloned()
                .and_then(ProfileRecord::into_author)
                .ok_or_else(|| EnrichmentError::AuthorNotFound {
                    author_id: post.author_id.clone(),
                    post_id: post.id.to_string(),
                })?;
            Ok(EnrichedPost { post, author })
        })
        .collect()
}
