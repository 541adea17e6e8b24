use std::sync::Arc;

use axum::http::HeaderName;

use crate::application::posts::PostsService;

#[derive(Clone)]
pub struct ApiState {
    pub posts: Arc<PostsService>,
    /// Header the upstream auth proxy uses to carry the authenticated user id.
    pub user_header: HeaderName,
}
