use async_trait::async_trait;
use reqwest::{Method, StatusCode};

use super::{RemoteClient, endpoint, expect_success, read_json};
use crate::errors::StorageError;
use crate::scopes::types::LegacyScope;
use crate::storage::traits::{Result, ScopeRegistry};

/// Legacy scope registry at the OAuth2 scope management endpoint
pub struct RemoteScopeRegistry {
    client: RemoteClient,
    base_url: String,
}

impl RemoteScopeRegistry {
    pub fn new(client: RemoteClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn scope_url(&self, key: &str) -> Result<String> {
        endpoint(&self.base_url, &["name", key])
    }
}

#[async_trait]
impl ScopeRegistry for RemoteScopeRegistry {
    async fn exists(&self, key: &str) -> Result<bool> {
        let url = self.scope_url(key)?;
        let response = self.client.request(Method::HEAD, &url).send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StorageError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: url,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<LegacyScope>> {
        let url = self.scope_url(key)?;
        let response = self.client.request(Method::GET, &url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response, &url).await.map(Some)
    }

    async fn create(&self, scope: &LegacyScope) -> Result<()> {
        let response = self
            .client
            .request(Method::POST, &self.base_url)
            .json(scope)
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(StorageError::AlreadyExists(format!("Scope {}", scope.name)));
        }
        expect_success(response, &self.base_url).await.map(|_| ())
    }

    async fn update(&self, scope: &LegacyScope) -> Result<()> {
        let url = self.scope_url(&scope.name)?;
        let response = self
            .client
            .request(Method::PUT, &url)
            .json(scope)
            .send()
            .await?;
        expect_success(response, &url).await.map(|_| ())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let url = self.scope_url(key)?;
        let response = self.client.request(Method::DELETE, &url).send().await?;
        expect_success(response, &url).await.map(|_| ())
    }

    async fn get_all(&self) -> Result<Vec<LegacyScope>> {
        let response = self
            .client
            .request(Method::GET, &self.base_url)
            .send()
            .await?;
        read_json(response, &self.base_url).await
    }
}
