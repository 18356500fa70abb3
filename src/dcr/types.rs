//! Registration data types: requests, the composed application view and the
//! two backing records it is assembled from.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// OAuth version recorded on every created client
pub const OAUTH_VERSION_2: &str = "OAuth-2.0";

/// Inbound authentication type written when a client is linked to its service provider
pub const INBOUND_AUTH_TYPE_OAUTH2: &str = "oauth2";

/// Separator used to persist grant types as a single value
pub const GRANT_TYPE_SEPARATOR: &str = " ";

/// Identity of the caller driving a registration flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    pub username: String,
    pub tenant_domain: String,
}

impl CallerContext {
    pub fn new(username: &str, tenant_domain: &str) -> Self {
        Self {
            username: username.to_string(),
            tenant_domain: tenant_domain.to_string(),
        }
    }
}

/// Dynamic client registration request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationRequest {
    /// Owner recorded on the service provider, defaults to the caller
    #[serde(rename = "ext_param_owner", default)]
    pub application_owner: Option<String>,
    /// Name shared by the service provider and the OAuth client
    #[serde(default)]
    pub client_name: String,
    /// Service provider template applied on creation
    #[serde(rename = "ext_param_sp_template", default)]
    pub sp_template_name: Option<String>,
    #[serde(default)]
    pub grant_types: Vec<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(rename = "token_type_extension", default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub backchannel_logout_uri: Option<String>,
    /// Preset client identifier
    #[serde(rename = "ext_param_client_id", default)]
    pub consumer_key: Option<String>,
    /// Preset client secret
    #[serde(rename = "ext_param_client_secret", default)]
    pub consumer_secret: Option<String>,
}

/// Partial update of an existing application; absent fields stay unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(rename = "ext_param_owner", default)]
    pub application_owner: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub grant_types: Option<Vec<String>>,
    #[serde(default)]
    pub redirect_uris: Option<Vec<String>>,
    #[serde(rename = "token_type_extension", default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub backchannel_logout_uri: Option<String>,
}

/// Composed application view returned to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub client_name: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Stored callback value as a single element
    pub redirect_uris: Vec<String>,
    /// Stored grant type value as a single element
    pub grant_types: Vec<String>,
}

impl From<&OAuthApplication> for Application {
    fn from(app: &OAuthApplication) -> Self {
        Self {
            client_name: app.application_name.clone(),
            client_id: app.client_id.clone(),
            client_secret: app.client_secret.clone(),
            redirect_uris: vec![app.callback_url.clone()],
            grant_types: vec![app.grant_types.clone()],
        }
    }
}

/// Owner of a service provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProviderOwner {
    pub username: String,
    pub tenant_domain: String,
}

/// Inbound authentication binding of a service provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundAuthConfig {
    /// Client identifier of the linked OAuth application
    pub key: String,
    pub auth_type: String,
}

/// Identity provider record representing a registered application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceProvider {
    pub id: String,
    pub name: String,
    pub description: String,
    pub owner: ServiceProviderOwner,
    pub inbound_auth: Option<InboundAuthConfig>,
    pub saas_app: bool,
}

impl ServiceProvider {
    /// Unsaved service provider for an application name
    pub fn for_application(name: &str, owner: &str, tenant_domain: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: format!("Service Provider for application {}", name),
            owner: ServiceProviderOwner {
                username: owner.to_string(),
                tenant_domain: tenant_domain.to_string(),
            },
            inbound_auth: None,
            saas_app: false,
        }
    }

    /// Client identifier this service provider is linked to, if any
    pub fn linked_client_id(&self) -> Option<&str> {
        self.inbound_auth
            .as_ref()
            .filter(|auth| auth.auth_type == INBOUND_AUTH_TYPE_OAUTH2)
            .map(|auth| auth.key.as_str())
    }
}

/// Stored OAuth client record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthApplication {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub application_name: String,
    pub username: String,
    /// Encoded callback value, see [`crate::dcr::uri_validator`]
    pub callback_url: String,
    /// Grant types joined with [`GRANT_TYPE_SEPARATOR`]
    pub grant_types: String,
    pub oauth_version: String,
    pub token_type: Option<String>,
    pub backchannel_logout_url: Option<String>,
}

/// OAuth client record before creation, identifier and secret optional
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OAuthApplicationDraft {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub application_name: String,
    pub username: String,
    pub callback_url: String,
    pub grant_types: String,
    pub oauth_version: String,
    pub token_type: Option<String>,
    pub backchannel_logout_url: Option<String>,
}

impl OAuthApplicationDraft {
    /// Record produced from this draft once identifier and secret are known
    pub fn into_application(self, client_id: String, client_secret: String) -> OAuthApplication {
        OAuthApplication {
            client_id,
            client_secret: Some(client_secret),
            application_name: self.application_name,
            username: self.username,
            callback_url: self.callback_url,
            grant_types: self.grant_types,
            oauth_version: self.oauth_version,
            token_type: self.token_type,
            backchannel_logout_url: self.backchannel_logout_url,
        }
    }
}

/// Generate a client identifier
pub fn generate_client_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Generate a client secret
pub fn generate_client_secret() -> String {
    use base64::Engine;
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.r#gen();
    base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(bytes)
}
