use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};

use super::{RemoteClient, endpoint, expect_success, read_json};
use crate::scopes::types::{Role, RolePermission};
use crate::storage::traits::{Result, RoleRegistry};

const SCIM_ROLE_SCHEMA: &str = "urn:ietf:params:scim:schemas:extension:2.0:Role";

#[derive(Deserialize)]
struct RoleList {
    #[serde(rename = "Resources", default)]
    resources: Vec<RoleSummary>,
}

#[derive(Deserialize)]
struct RoleSummary {
    id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRole<'a> {
    schemas: [&'static str; 1],
    display_name: &'a str,
    permissions: &'a [RolePermission],
}

#[derive(Serialize)]
struct PatchOperation<'a> {
    op: &'static str,
    path: &'static str,
    value: &'a [RolePermission],
}

#[derive(Serialize)]
struct PatchRequest<'a> {
    #[serde(rename = "Operations")]
    operations: [PatchOperation<'a>; 1],
}

/// SCIM2 role registry
pub struct RemoteRoleRegistry {
    client: RemoteClient,
    base_url: String,
}

impl RemoteRoleRegistry {
    pub fn new(client: RemoteClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RoleRegistry for RemoteRoleRegistry {
    async fn find_by_display_name(&self, display_name: &str) -> Result<Option<String>> {
        let filter = format!("displayName eq {}", display_name);
        let response = self
            .client
            .request(Method::GET, &self.base_url)
            .query(&[("filter", filter.as_str())])
            .send()
            .await?;
        let list: RoleList = read_json(response, &self.base_url).await?;
        Ok(list.resources.into_iter().next().map(|r| r.id))
    }

    async fn get(&self, role_id: &str) -> Result<Option<Role>> {
        let url = endpoint(&self.base_url, &[role_id])?;
        let response = self.client.request(Method::GET, &url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_json(response, &url).await.map(Some)
    }

    async fn create(&self, role: &Role) -> Result<String> {
        let response = self
            .client
            .request(Method::POST, &self.base_url)
            .json(&CreateRole {
                schemas: [SCIM_ROLE_SCHEMA],
                display_name: &role.display_name,
                permissions: &role.permissions,
            })
            .send()
            .await?;
        let created: RoleSummary = read_json(response, &self.base_url).await?;
        Ok(created.id)
    }

    async fn patch_permissions(&self, role_id: &str, permissions: &[RolePermission]) -> Result<()> {
        let url = endpoint(&self.base_url, &[role_id])?;
        let response = self
            .client
            .request(Method::PATCH, &url)
            .json(&PatchRequest {
                operations: [PatchOperation {
                    op: "replace",
                    path: "permissions",
                    value: permissions,
                }],
            })
            .send()
            .await?;
        expect_success(response, &url).await.map(|_| ())
    }
}
