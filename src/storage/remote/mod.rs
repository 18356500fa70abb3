//! Remote identity server registries over HTTP.
//!
//! Scope, API resource and role registries are reached with basic-auth JSON
//! requests. Non-success statuses become [`StorageError::UnexpectedStatus`]
//! carrying the response body.

mod api_resources;
mod roles;
mod scopes;

pub use api_resources::RemoteApiResourceContainer;
pub use roles::RemoteRoleRegistry;
pub use scopes::RemoteScopeRegistry;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::errors::StorageError;
use crate::storage::traits::Result;

/// Authenticated HTTP client shared by the remote registries
#[derive(Clone)]
pub struct RemoteClient {
    http_client: reqwest::Client,
    username: String,
    password: String,
}

impl RemoteClient {
    pub fn new(http_client: reqwest::Client, username: &str, password: &str) -> Self {
        Self {
            http_client,
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }
}

/// Append percent-encoded path segments to a base endpoint
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|e| StorageError::InvalidData(format!("Invalid endpoint {}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| StorageError::InvalidData(format!("Invalid endpoint {}", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}

/// Fail with the status and body unless the response is a success
pub(crate) async fn expect_success(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    if status == StatusCode::NOT_FOUND {
        return Err(StorageError::NotFound(format!("{}: {}", endpoint, body)));
    }
    Err(StorageError::UnexpectedStatus {
        status: status.as_u16(),
        endpoint: endpoint.to_string(),
        body,
    })
}

pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, endpoint: &str) -> Result<T> {
    let response = expect_success(response, endpoint).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        StorageError::SerializationFailed(format!("Failed to parse response from {}: {}", endpoint, e))
    })
}
