use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

use super::api::SessionUser;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Correlation data attached to every request and echoed on its response.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    /// Reuse an id assigned upstream, or mint a fresh one.
    fn from_request(request: &Request<Body>) -> Self {
        let request_id = request
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty() && value.len() <= 128)
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self { request_id }
    }
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::from_request(&request);
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Log every response; failures carry the attached [`ErrorReport`].
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    let user_id = response
        .extensions()
        .get::<SessionUser>()
        .map(|user| user.id().to_owned())
        .unwrap_or_default();

    if !status.is_client_error() && !status.is_server_error() {
        debug!(
            target = "chirp::http::response",
            status = status.as_u16(),
            %method,
            path = %path,
            elapsed_ms,
            request_id = %request_id,
            user_id = %user_id,
            "request served"
        );
        return response;
    }

    let (source, chain) = response
        .extensions_mut()
        .remove::<ErrorReport>()
        .map(|report| (report.source, report.messages))
        .unwrap_or(("unknown", Vec::new()));
    let detail = chain.first().map(String::as_str).unwrap_or("-");

    if status.is_server_error() {
        error!(
            target = "chirp::http::response",
            status = status.as_u16(),
            %method,
            path = %path,
            elapsed_ms,
            source,
            detail,
            ?chain,
            request_id = %request_id,
            user_id = %user_id,
            "request failed"
        );
    } else {
        warn!(
            target = "chirp::http::response",
            status = status.as_u16(),
            %method,
            path = %path,
            elapsed_ms,
            source,
            detail,
            request_id = %request_id,
            user_id = %user_id,
            "request rejected"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_request_id_is_reused() {
        let request = Request::builder()
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .expect("request");
        assert_eq!(RequestContext::from_request(&request).request_id, "abc-123");
    }

    #[test]
    fn blank_request_id_is_replaced() {
        let request = Request::builder()
            .header("x-request-id", "  ")
            .body(Body::empty())
            .expect("request");
        let ctx = RequestContext::from_request(&request);
        assert!(Uuid::parse_str(&ctx.request_id).is_ok());
    }
}
