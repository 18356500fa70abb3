//! Scope, API resource and role types exchanged with the scope registries.

use serde::{Deserialize, Serialize};

/// Identifier of the API resource that groups every scope
pub const DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER: &str = "User-defined-oauth2-resource";
pub const DEFAULT_OAUTH_2_RESOURCE_NAME: &str = "User-defined OAuth2 Resource";
pub const DEFAULT_OAUTH_2_RESOURCE_DESCRIPTION: &str = "This is Default OAuth2 Resource Representation";

/// Gateway-declared scope
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scope {
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Display names of the roles bound to this scope
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Scope {
    pub fn new(key: &str, display_name: &str, description: &str, roles: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            description: description.to_string(),
            roles: parse_roles(roles),
        }
    }

    /// Roles joined the way the legacy registry reports them
    pub fn roles_string(&self) -> String {
        self.roles.join(",")
    }
}

/// Split a comma-separated role list, dropping blanks and duplicates
pub fn parse_roles(roles: &str) -> Vec<String> {
    let mut parsed: Vec<String> = Vec::new();
    for role in roles.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        if !parsed.iter().any(|existing| existing == role) {
            parsed.push(role.to_string());
        }
    }
    parsed
}

/// Scope record of the legacy flat scope registry
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyScope {
    /// Scope key
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bindings: Vec<String>,
}

impl From<&Scope> for LegacyScope {
    fn from(scope: &Scope) -> Self {
        Self {
            name: scope.key.clone(),
            display_name: scope.display_name.clone(),
            description: scope.description.clone(),
            bindings: scope.roles.clone(),
        }
    }
}

impl From<LegacyScope> for Scope {
    fn from(scope: LegacyScope) -> Self {
        Self {
            key: scope.name,
            display_name: scope.display_name,
            description: scope.description,
            roles: scope.bindings,
        }
    }
}

/// Scope as declared on an API resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceScope {
    /// Scope key
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

impl From<&Scope> for ResourceScope {
    fn from(scope: &Scope) -> Self {
        Self {
            name: scope.key.clone(),
            display_name: scope.display_name.clone(),
            description: scope.description.clone(),
        }
    }
}

/// Grouped representation of an API's scopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub identifier: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_authorization: bool,
    #[serde(default)]
    pub scopes: Vec<ResourceScope>,
}

impl ApiResource {
    /// The well-known resource, pre-populated with `scopes`
    pub fn default_resource(scopes: Vec<ResourceScope>) -> Self {
        Self {
            id: None,
            identifier: DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER.to_string(),
            name: DEFAULT_OAUTH_2_RESOURCE_NAME.to_string(),
            description: DEFAULT_OAUTH_2_RESOURCE_DESCRIPTION.to_string(),
            requires_authorization: true,
            scopes,
        }
    }
}

/// Scope binding held in a role's permission list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermission {
    /// Scope key
    pub value: String,
    /// Scope display name
    #[serde(default)]
    pub display: String,
}

impl From<&Scope> for RolePermission {
    fn from(scope: &Scope) -> Self {
        Self {
            value: scope.key.clone(),
            display: scope.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub permissions: Vec<RolePermission>,
}

/// Resource path of an API, passed through to the attachment hooks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UriTemplate {
    pub http_verb: String,
    pub uri_template: String,
    #[serde(default)]
    pub scopes: Vec<String>,
}
