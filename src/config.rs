//! Environment-based configuration types for the key manager runtime settings.

use anyhow::Result;
use regex::Regex;
use std::time::Duration;

use crate::errors::ConfigError;

/// Tenant that is addressed without a `/t/<tenant>` context prefix
pub const SUPER_TENANT_DOMAIN: &str = "carbon.super";

const DEFAULT_APPLICATION_NAME_PATTERN: &str = r"^[a-zA-Z0-9\s.+_-]*$";
const DEFAULT_CLIENT_ID_PATTERN: &str = r"^[a-zA-Z0-9_]{15,30}$";

const SCOPE_MANAGEMENT_PATH: &str = "/api/identity/oauth2/v1.0/scopes";
const API_RESOURCE_MANAGEMENT_PATH: &str = "/api/server/v1/api-resources";
const ROLES_PATH: &str = "/scim2/v2/Roles";

/// HTTP server port configuration
#[derive(Clone)]
pub struct HttpPort(u16);

/// Certificate bundles for HTTPS connections
#[derive(Clone)]
pub struct CertificateBundles(Vec<String>);

/// HTTP client timeout configuration
#[derive(Clone)]
pub struct HttpClientTimeout(Duration);

/// Pattern a requested client name must match in full
#[derive(Clone, Debug)]
pub struct ApplicationNamePattern(String, Regex);

/// Pattern a caller-supplied client identifier must match in full
#[derive(Clone, Debug)]
pub struct ClientIdPattern(String, Regex);

/// Usernames authorized to manage every application
#[derive(Clone, Debug, Default)]
pub struct AdminUsernames(Vec<String>);

/// Toggle for an optional group of HTTP routes
#[derive(Clone, Copy)]
pub struct FeatureToggle(bool);

/// Backing store selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    /// Every collaborator kept in process memory
    Memory,
    /// Scope, API resource and role registries on a remote identity server
    Remote(RemoteEndpoints),
}

/// Locations and credentials of the remote identity server registries
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEndpoints {
    pub username: String,
    pub password: String,
    pub scope_management_endpoint: String,
    pub api_resource_management_endpoint: String,
    pub roles_endpoint: String,
}

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub version: String,
    pub http_port: HttpPort,
    pub certificate_bundles: CertificateBundles,
    pub user_agent: String,
    pub http_client_timeout: HttpClientTimeout,
    pub tenant_domain: String,
    pub application_name_pattern: ApplicationNamePattern,
    pub client_id_pattern: ClientIdPattern,
    pub admin_usernames: AdminUsernames,
    pub storage_backend: StorageBackend,
    pub enable_registration_api: FeatureToggle,
    pub enable_scope_api: FeatureToggle,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let certificate_bundles: CertificateBundles =
            optional_env("CERTIFICATE_BUNDLES").try_into()?;
        let default_user_agent = format!("keyman/{}", version()?);
        let http_client_timeout: HttpClientTimeout =
            default_env("HTTP_CLIENT_TIMEOUT", "10s").try_into()?;
        let http_port: HttpPort = default_env("HTTP_PORT", "8080").try_into()?;
        let user_agent = default_env("USER_AGENT", &default_user_agent);
        let tenant_domain = default_env("TENANT_DOMAIN", SUPER_TENANT_DOMAIN);
        let application_name_pattern: ApplicationNamePattern =
            default_env("APPLICATION_NAME_PATTERN", DEFAULT_APPLICATION_NAME_PATTERN).try_into()?;
        let client_id_pattern: ClientIdPattern =
            default_env("CLIENT_ID_PATTERN", DEFAULT_CLIENT_ID_PATTERN).try_into()?;
        let admin_usernames: AdminUsernames = optional_env("ADMIN_USERNAMES").try_into()?;
        let storage_backend = storage_backend_from_env(&tenant_domain)?;
        let enable_registration_api: FeatureToggle =
            default_env("ENABLE_REGISTRATION_API", "true").try_into()?;
        let enable_scope_api: FeatureToggle =
            default_env("ENABLE_SCOPE_API", "true").try_into()?;

        Ok(Self {
            version: version()?,
            http_port,
            certificate_bundles,
            user_agent,
            http_client_timeout,
            tenant_domain,
            application_name_pattern,
            client_id_pattern,
            admin_usernames,
            storage_backend,
            enable_registration_api,
            enable_scope_api,
        })
    }

    /// Configuration with defaults only, used by tests and embedders
    pub fn for_tenant(tenant_domain: &str) -> Result<Self> {
        Ok(Self {
            version: version()?,
            http_port: HttpPort(8080),
            certificate_bundles: CertificateBundles(Vec::new()),
            user_agent: format!("keyman/{}", version()?),
            http_client_timeout: HttpClientTimeout(Duration::from_secs(10)),
            tenant_domain: tenant_domain.to_string(),
            application_name_pattern: DEFAULT_APPLICATION_NAME_PATTERN.to_string().try_into()?,
            client_id_pattern: DEFAULT_CLIENT_ID_PATTERN.to_string().try_into()?,
            admin_usernames: AdminUsernames::default(),
            storage_backend: StorageBackend::Memory,
            enable_registration_api: FeatureToggle(true),
            enable_scope_api: FeatureToggle(true),
        })
    }
}

fn storage_backend_from_env(tenant_domain: &str) -> Result<StorageBackend> {
    match default_env("STORAGE_BACKEND", "memory").as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "remote" => {
            let server_url = require_env("IDENTITY_SERVER_URL")?;
            let base = url::Url::parse(&server_url)
                .map_err(|e| ConfigError::InvalidUrl(server_url.clone(), e))?;
            let base = base.as_str().trim_end_matches('/').to_string();
            let context = tenant_context(tenant_domain);

            let endpoint = |name: &str, path: &str| -> Result<String> {
                match optional_env(name).filter(|v| !v.is_empty()) {
                    Some(value) => {
                        url::Url::parse(&value)
                            .map_err(|e| ConfigError::InvalidUrl(value.clone(), e))?;
                        Ok(value.trim_end_matches('/').to_string())
                    }
                    None => Ok(format!("{}{}{}", base, context, path)),
                }
            };

            Ok(StorageBackend::Remote(RemoteEndpoints {
                username: default_env("IDENTITY_SERVER_USERNAME", ""),
                password: default_env("IDENTITY_SERVER_PASSWORD", ""),
                scope_management_endpoint: endpoint(
                    "SCOPE_MANAGEMENT_ENDPOINT",
                    SCOPE_MANAGEMENT_PATH,
                )?,
                api_resource_management_endpoint: endpoint(
                    "API_RESOURCE_MANAGEMENT_ENDPOINT",
                    API_RESOURCE_MANAGEMENT_PATH,
                )?,
                roles_endpoint: endpoint("ROLES_ENDPOINT", ROLES_PATH)?,
            }))
        }
        other => Err(ConfigError::UnknownStorageBackend(other.to_string()).into()),
    }
}

/// Tenant path segment for remote endpoints, empty for the super tenant
pub fn tenant_context(tenant_domain: &str) -> String {
    if tenant_domain.is_empty() || tenant_domain.eq_ignore_ascii_case(SUPER_TENANT_DOMAIN) {
        String::new()
    } else {
        format!("/t/{}", tenant_domain)
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ConfigError::EnvVarRequired(name.to_string()).into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn default_env(name: &str, default_value: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default_value.to_string())
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            Ok(Self(8080))
        } else {
            value
                .parse::<u16>()
                .map(Self)
                .map_err(|err| ConfigError::PortParsingFailed(err).into())
        }
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<Option<String>> for CertificateBundles {
    type Error = anyhow::Error;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        let value = value.unwrap_or_default();
        Ok(Self(
            value
                .split(';')
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect::<Vec<String>>(),
        ))
    }
}

impl AsRef<Vec<String>> for CertificateBundles {
    fn as_ref(&self) -> &Vec<String> {
        &self.0
    }
}

impl TryFrom<String> for HttpClientTimeout {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Ok(Self(Duration::from_secs(10)));
        }
        duration_str::parse(&value)
            .map(Self)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))
    }
}

impl AsRef<Duration> for HttpClientTimeout {
    fn as_ref(&self) -> &Duration {
        &self.0
    }
}

impl TryFrom<String> for ApplicationNamePattern {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match Regex::new(&format!("^(?:{})$", value)) {
            Ok(regex) => Ok(Self(value, regex)),
            Err(e) => Err(ConfigError::InvalidPattern(value, e)),
        }
    }
}

impl ApplicationNamePattern {
    /// Pattern as configured
    pub fn pattern(&self) -> &str {
        &self.0
    }
}

impl AsRef<Regex> for ApplicationNamePattern {
    fn as_ref(&self) -> &Regex {
        &self.1
    }
}

impl TryFrom<String> for ClientIdPattern {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match Regex::new(&format!("^(?:{})$", value)) {
            Ok(regex) => Ok(Self(value, regex)),
            Err(e) => Err(ConfigError::InvalidPattern(value, e)),
        }
    }
}

impl ClientIdPattern {
    /// Pattern as configured
    pub fn pattern(&self) -> &str {
        &self.0
    }
}

impl AsRef<Regex> for ClientIdPattern {
    fn as_ref(&self) -> &Regex {
        &self.1
    }
}

impl TryFrom<Option<String>> for AdminUsernames {
    type Error = anyhow::Error;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        let value = value.unwrap_or_default();
        Ok(Self(
            value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<String>>(),
        ))
    }
}

impl TryFrom<String> for AdminUsernames {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(Some(value))
    }
}

impl AsRef<Vec<String>> for AdminUsernames {
    fn as_ref(&self) -> &Vec<String> {
        &self.0
    }
}

impl TryFrom<String> for FeatureToggle {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Self(true)),
            "false" | "0" | "no" | "off" => Ok(Self(false)),
            _ => Err(ConfigError::BoolParsingFailed(value).into()),
        }
    }
}

impl AsRef<bool> for FeatureToggle {
    fn as_ref(&self) -> &bool {
        &self.0
    }
}
