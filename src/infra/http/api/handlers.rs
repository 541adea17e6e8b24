//! Feed and post handlers.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chirp_api_types::CreatePostRequest;
use tracing::error;
use uuid::Uuid;

use crate::application::enrichment::EnrichmentError;
use crate::application::posts::PostsError;
use crate::application::repos::RepoError;

use super::error::ApiError;
use super::middleware::SessionUser;
use super::state::ApiState;

pub async fn list_posts(State(state): State<ApiState>) -> Response {
    match state.posts.list_all().await {
        Ok(posts) => Json(posts).into_response(),
        Err(err) => posts_error_to_api(err).into_response(),
    }
}

pub async fn list_author_posts(
    State(state): State<ApiState>,
    Path(author_id): Path<String>,
) -> Response {
    match state.posts.list_by_author(&author_id).await {
        Ok(posts) => Json(posts).into_response(),
        Err(err) => posts_error_to_api(err).into_response(),
    }
}

pub async fn get_post(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let Ok(id) = Uuid::parse_str(&id) else {
        return ApiError::bad_request("Invalid post id", Some(id)).into_response();
    };

    match state.posts.get_post(id).await {
        Ok(post) => Json(post).into_response(),
        Err(err) => posts_error_to_api(err).into_response(),
    }
}

pub async fn create_post(
    State(state): State<ApiState>,
    session: Option<Extension<SessionUser>>,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Response {
    let Some(Extension(user)) = session else {
        return ApiError::unauthorized().into_response();
    };
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return ApiError::bad_request("Malformed request body", Some(rejection.body_text()))
                .into_response();
        }
    };

    match state.posts.create_post(user.id(), &payload.content).await {
        Ok(post) => (StatusCode::CREATED, Json(post)).into_response(),
        Err(err) => posts_error_to_api(err).into_response(),
    }
}

pub(crate) fn posts_error_to_api(err: PostsError) -> ApiError {
    match err {
        PostsError::Validation(err) => ApiError::invalid_input(err.to_string()),
        PostsError::RateLimited { retry_after } => ApiError::rate_limited(retry_after),
        PostsError::NotFound => ApiError::not_found("Post not found"),
        PostsError::Enrichment(err @ EnrichmentError::AuthorNotFound { .. }) => {
            error!(
                target = "chirp::http::posts",
                error = %err,
                "post references an author the identity service does not know"
            );
            ApiError::data_inconsistency(err.to_string())
        }
        PostsError::Store(err) => repo_to_api(err),
        PostsError::Identity(err) => ApiError::dependency_unavailable(err.to_string()),
        PostsError::Limiter(err) => ApiError::dependency_unavailable(err.to_string()),
    }
}

pub(crate) fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => ApiError::invalid_input(message),
        RepoError::Integrity { message } => ApiError::data_inconsistency(message),
        RepoError::Timeout => ApiError::dependency_unavailable("database timeout"),
        RepoError::Persistence(message) => ApiError::dependency_unavailable(message),
    }
}
