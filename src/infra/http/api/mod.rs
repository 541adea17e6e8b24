pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use middleware::SessionUser;
pub use state::ApiState;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::infra::http::RouterState;
use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    let session_state = state.api.clone();

    Router::new()
        .route(
            "/api/v1/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route("/api/v1/posts/{id}", get(handlers::get_post))
        .route(
            "/api/v1/users/{author_id}/posts",
            get(handlers::list_author_posts),
        )
        .with_state(state)
        .layer(axum_middleware::from_fn_with_state(
            session_state,
            middleware::session_context,
        ))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
