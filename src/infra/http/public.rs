use std::sync::Arc;

use async_trait::async_trait;
use axum::{Router, extract::State, middleware, response::Response, routing::get};

use crate::infra::db::PostgresRepositories;

use super::{
    RouterState, db_health_response,
    middleware::{log_responses, set_request_context},
};

/// Liveness of the backing database.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn check(&self) -> Result<(), sqlx::Error>;
}

#[async_trait]
impl ReadinessProbe for PostgresRepositories {
    async fn check(&self) -> Result<(), sqlx::Error> {
        self.health_check().await
    }
}

#[derive(Clone)]
pub struct HttpState {
    pub readiness: Arc<dyn ReadinessProbe>,
}

pub fn build_router(state: RouterState) -> Router<RouterState> {
    Router::new()
        .route("/health", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.readiness.check().await)
}
