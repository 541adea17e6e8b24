//! HTTP client for the external identity service.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderValue, header};
use reqwest::{Client, Url};
use tracing::warn;

use crate::application::identity::{IdentityError, IdentityProvider};
use crate::domain::entities::ProfileRecord;

use super::error::InfraError;

const USERS_PATH: &str = "users";

/// Calls `GET {base}/users?user_id=..&user_id=..&limit=N` and decodes a JSON
/// array of profiles.
#[derive(Clone, Debug)]
pub struct HttpIdentityProvider {
    client: Client,
    users_url: Url,
    auth: Option<HeaderValue>,
}

impl HttpIdentityProvider {
    pub fn new(base: Url, api_key: Option<&str>, timeout: Duration) -> Result<Self, InfraError> {
        let users_url = directory_url(base)
            .join(USERS_PATH)
            .map_err(|err| InfraError::configuration("identity.base_url", err.to_string()))?;

        let auth = api_key
            .map(|key| {
                let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                    .map_err(|err| InfraError::configuration("identity.api_key", err.to_string()))?;
                value.set_sensitive(true);
                Ok::<_, InfraError>(value)
            })
            .transpose()?;

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            users_url,
            auth,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("chirp/", env!("CARGO_PKG_VERSION"))
    }

    fn lookup_url(&self, ids: &[String], limit: usize) -> Url {
        let mut url = self.users_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for id in ids {
                pairs.append_pair("user_id", id);
            }
            pairs.append_pair("limit", &limit.to_string());
        }
        url
    }
}

/// Treat the last path segment as a directory so `join` appends instead of
/// replacing it.
fn directory_url(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn get_profiles(
        &self,
        ids: &[String],
        limit: usize,
    ) -> Result<Vec<ProfileRecord>, IdentityError> {
        let mut request = self.client.get(self.lookup_url(ids, limit));
        if let Some(auth) = self.auth.as_ref() {
            request = request.header(header::AUTHORIZATION, auth.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|err| IdentityError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                target = "chirp::identity",
                status = status.as_u16(),
                requested = ids.len(),
                "identity lookup rejected"
            );
            return Err(IdentityError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<Vec<ProfileRecord>>()
            .await
            .map_err(|err| IdentityError::Decode(err.to_string()))
    }
}
