//! Cache key definitions.

use std::fmt;

/// Identifies one cached feed.
///
/// The "all posts" feed is a dedicated variant, so no author id can collide
/// with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedKey {
    AllPosts,
    Author(String),
}

impl FeedKey {
    pub fn author(author_id: impl Into<String>) -> Self {
        Self::Author(author_id.into())
    }

    /// Every feed a new post by `author_id` appears in.
    pub fn affected_by_post(author_id: &str) -> [FeedKey; 2] {
        [FeedKey::AllPosts, FeedKey::author(author_id)]
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKey::AllPosts => f.write_str("posts"),
            FeedKey::Author(id) => write!(f, "author:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_named_like_sentinel_is_distinct() {
        assert_ne!(FeedKey::AllPosts, FeedKey::author("posts"));
    }

    #[test]
    fn new_post_affects_global_and_author_feeds() {
        let keys = FeedKey::affected_by_post("user_1");
        assert_eq!(keys, [FeedKey::AllPosts, FeedKey::author("user_1")]);
    }
}
