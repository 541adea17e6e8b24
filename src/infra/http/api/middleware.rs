use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use super::state::ApiState;

/// Opaque id of the authenticated caller, as asserted by the auth proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser(pub String);

impl SessionUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Record the session user, if the request carries one. Handlers that write
/// decide for themselves whether a missing session is an error.
pub async fn session_context(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let user = request
        .headers()
        .get(&state.user_header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| SessionUser(value.to_string()));

    if let Some(user) = user.clone() {
        request.extensions_mut().insert(user);
    }

    let mut response = next.run(request).await;
    if let Some(user) = user {
        response.extensions_mut().insert(user);
    }
    response
}
