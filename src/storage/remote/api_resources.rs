use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{RemoteClient, endpoint, expect_success, read_json};
use crate::scopes::types::{ApiResource, ResourceScope};
use crate::storage::traits::{Result, ScopeResourceContainer};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResourceList {
    #[serde(default)]
    api_resources: Vec<ApiResourceSummary>,
}

#[derive(Deserialize)]
struct ApiResourceSummary {
    id: String,
}

#[derive(Deserialize)]
struct ScopeName {
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddScopesPatch<'a> {
    added_scopes: &'a [ResourceScope],
}

/// API resource container at the API resource management endpoint
pub struct RemoteApiResourceContainer {
    client: RemoteClient,
    base_url: String,
}

impl RemoteApiResourceContainer {
    pub fn new(client: RemoteClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ScopeResourceContainer for RemoteApiResourceContainer {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<String>> {
        let filter = format!("identifier eq {}", identifier);
        let response = self
            .client
            .request(Method::GET, &self.base_url)
            .query(&[("filter", filter.as_str())])
            .send()
            .await?;
        let list: ApiResourceList = read_json(response, &self.base_url).await?;
        Ok(list.api_resources.into_iter().next().map(|r| r.id))
    }

    async fn list_scope_names(&self, container_id: &str) -> Result<Vec<String>> {
        let url = endpoint(&self.base_url, &[container_id, "scopes"])?;
        let response = self.client.request(Method::GET, &url).send().await?;
        let scopes: Vec<ScopeName> = read_json(response, &url).await?;
        Ok(scopes.into_iter().map(|s| s.name).collect())
    }

    async fn patch_add_scopes(&self, container_id: &str, scopes: &[ResourceScope]) -> Result<()> {
        let url = endpoint(&self.base_url, &[container_id])?;
        let response = self
            .client
            .request(Method::PATCH, &url)
            .json(&AddScopesPatch {
                added_scopes: scopes,
            })
            .send()
            .await?;
        expect_success(response, &url).await.map(|_| ())
    }

    async fn create(&self, resource: &ApiResource) -> Result<String> {
        let response = self
            .client
            .request(Method::POST, &self.base_url)
            .json(resource)
            .send()
            .await?;
        let created: ApiResourceSummary = read_json(response, &self.base_url).await?;
        Ok(created.id)
    }

    async fn delete_scope(&self, container_id: &str, scope_name: &str) -> Result<()> {
        let url = endpoint(&self.base_url, &[container_id, "scopes", scope_name])?;
        let response = self.client.request(Method::DELETE, &url).send().await?;
        expect_success(response, &url).await.map(|_| ())
    }
}
