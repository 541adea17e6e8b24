use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;
use url::Url;

use chirp::application::identity::{IdentityError, IdentityProvider, IdentityResolver};
use chirp::infra::identity::HttpIdentityProvider;

#[derive(Clone, Default)]
struct Directory {
    requests: Arc<Mutex<Vec<(Vec<String>, Option<String>, Option<String>)>>>,
    fail_with: Option<StatusCode>,
}

async fn users(
    State(directory): State<Directory>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    let query = query.unwrap_or_default();
    let mut ids = Vec::new();
    let mut limit = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "user_id" => ids.push(value.into_owned()),
            "limit" => limit = Some(value.into_owned()),
            _ => {}
        }
    }
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    directory
        .requests
        .lock()
        .expect("requests lock")
        .push((ids.clone(), limit, auth));

    if let Some(status) = directory.fail_with {
        return status.into_response();
    }

    let profiles: Vec<_> = ids
        .iter()
        .filter(|id| id.as_str() != "unknown")
        .map(|id| {
            json!({
                "id": id,
                "username": format!("{id}_handle"),
                "profile_image_url": format!("https://img.example/{id}.png"),
            })
        })
        .collect();
    Json(profiles).into_response()
}

async fn spawn_directory(directory: Directory) -> SocketAddr {
    let app = Router::new()
        .route("/v1/users", get(users))
        .with_state(directory);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve directory");
    });
    addr
}

fn provider(addr: SocketAddr, api_key: Option<&str>) -> HttpIdentityProvider {
    let base = Url::parse(&format!("http://{addr}/v1")).expect("base url");
    HttpIdentityProvider::new(base, api_key, Duration::from_secs(5)).expect("provider")
}

#[tokio::test]
async fn decodes_profiles_and_sends_bearer_key() {
    let directory = Directory::default();
    let addr = spawn_directory(directory.clone()).await;
    let provider = provider(addr, Some("s3cret"));

    let profiles = provider
        .get_profiles(&["alice".to_string(), "unknown".to_string()], 10)
        .await
        .expect("lookup");

    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].id, "alice");
    assert_eq!(profiles[0].username.as_deref(), Some("alice_handle"));
    assert_eq!(
        profiles[0].profile_picture.as_deref(),
        Some("https://img.example/alice.png")
    );

    let requests = directory.requests.lock().expect("requests lock").clone();
    assert_eq!(requests.len(), 1);
    let (ids, limit, auth) = &requests[0];
    assert_eq!(ids, &vec!["alice".to_string(), "unknown".to_string()]);
    assert_eq!(limit.as_deref(), Some("10"));
    assert_eq!(auth.as_deref(), Some("Bearer s3cret"));
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let directory = Directory {
        fail_with: Some(StatusCode::BAD_GATEWAY),
        ..Default::default()
    };
    let addr = spawn_directory(directory).await;

    let err = provider(addr, None)
        .get_profiles(&["alice".to_string()], 10)
        .await
        .expect_err("upstream failure");
    assert!(matches!(err, IdentityError::Status { status: 502 }));
}

#[tokio::test]
async fn resolver_splits_lookups_over_http() {
    let directory = Directory::default();
    let addr = spawn_directory(directory.clone()).await;
    let resolver = IdentityResolver::new(
        Arc::new(provider(addr, None)),
        std::num::NonZeroUsize::new(2).expect("non-zero"),
    );

    let resolved = resolver
        .resolve(["a", "b", "c", "a", "unknown"])
        .await
        .expect("resolve");
    assert_eq!(resolved.len(), 3);
    assert!(!resolved.contains_key("unknown"));

    let requests = directory.requests.lock().expect("requests lock").clone();
    let mut sizes: Vec<usize> = requests.iter().map(|(ids, _, _)| ids.len()).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![2, 2]);
    assert!(requests.iter().all(|(_, _, auth)| auth.is_none()));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let err = provider(addr, None)
        .get_profiles(&["alice".to_string()], 1)
        .await
        .expect_err("nothing listening");
    assert!(matches!(err, IdentityError::Transport(_)));
}
