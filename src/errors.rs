//! Standardized error types following the `error-keyman-<domain>-<number>` format.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-keyman-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when PORT cannot be parsed
    #[error("error-keyman-config-2 Parsing PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-keyman-config-3 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when duration string cannot be parsed
    #[error("error-keyman-config-4 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when boolean string cannot be parsed
    #[error(
        "error-keyman-config-5 Failed to parse boolean '{0}': expected true/false/1/0/yes/no/on/off"
    )]
    BoolParsingFailed(String),

    /// Error when a validation pattern does not compile
    #[error("error-keyman-config-6 Invalid pattern '{0}': {1}")]
    InvalidPattern(String, regex::Error),

    /// Error when an endpoint URL cannot be parsed
    #[error("error-keyman-config-7 Invalid URL '{0}': {1}")]
    InvalidUrl(String, url::ParseError),

    /// Error when the storage backend name is not recognized
    #[error("error-keyman-config-8 Unknown storage backend: {0}")]
    UnknownStorageBackend(String),
}

/// Backing store errors, local or remote
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when the backing store cannot be reached
    #[error("error-keyman-storage-1 Backing store connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when a store operation fails
    #[error("error-keyman-storage-2 Query execution failed: {0}")]
    QueryFailed(String),

    /// Error when data serialization fails
    #[error("error-keyman-storage-3 Data serialization failed: {0}")]
    SerializationFailed(String),

    /// Error when data validation fails
    #[error("error-keyman-storage-4 Invalid data: {0}")]
    InvalidData(String),

    /// Error when requested resource is not found
    #[error("error-keyman-storage-5 Not found: {0}")]
    NotFound(String),

    /// Error when a uniqueness constraint is violated
    #[error("error-keyman-storage-6 Already exists: {0}")]
    AlreadyExists(String),

    /// Error when a remote registry answers with a non-success status
    #[error("error-keyman-storage-7 Unexpected status {status} from {endpoint}: {body}")]
    UnexpectedStatus {
        status: u16,
        endpoint: String,
        body: String,
    },
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StorageError::SerializationFailed(err.to_string())
        } else {
            StorageError::ConnectionFailed(err.to_string())
        }
    }
}

/// Caller-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Client,
    Conflict,
    NotFound,
    Forbidden,
    Server,
}

impl ErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorKind::Client => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Backing store operation performed by the registration flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    GetServiceProvider,
    CheckServiceProviderTemplate,
    RegisterServiceProvider,
    UpdateServiceProvider,
    DeleteServiceProvider,
    GetApplication,
    RegisterApplication,
    UpdateApplication,
    DeleteApplication,
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            StoreOperation::GetServiceProvider => "get service provider",
            StoreOperation::CheckServiceProviderTemplate => "check service provider template",
            StoreOperation::RegisterServiceProvider => "register service provider",
            StoreOperation::UpdateServiceProvider => "update service provider",
            StoreOperation::DeleteServiceProvider => "delete service provider",
            StoreOperation::GetApplication => "get application",
            StoreOperation::RegisterApplication => "register application",
            StoreOperation::UpdateApplication => "update application",
            StoreOperation::DeleteApplication => "delete application",
        };
        f.write_str(label)
    }
}

/// Application registration errors
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Malformed request input
    #[error("error-keyman-dcr-1 Invalid input: {0}")]
    InvalidInput(String),

    /// Application name does not match the configured pattern
    #[error("error-keyman-dcr-2 Invalid application name, expected pattern: {0}")]
    InvalidApplicationName(String),

    /// Redirect URI fails syntax validation
    #[error("error-keyman-dcr-3 Invalid redirect URI: {0}")]
    InvalidRedirectUri(String),

    /// Grant types need a redirect URI but none was supplied
    #[error(
        "error-keyman-dcr-4 Redirect URI required for this grant type: at least one URI must be supplied for authorization_code or implicit"
    )]
    RedirectUriRequired,

    /// Backchannel logout URI fails syntax validation
    #[error("error-keyman-dcr-5 Invalid backchannel logout URI: {0}")]
    InvalidBackchannelLogoutUri(String),

    /// Preset client identifier does not match the configured pattern
    #[error("error-keyman-dcr-6 Client ID violates pattern: {0}")]
    ClientIdViolatesPattern(String),

    /// Service provider template is unknown
    #[error("error-keyman-dcr-7 Invalid service provider template: {0}")]
    InvalidTemplate(String),

    /// Service provider was created but could not be read back
    #[error("error-keyman-dcr-8 Service provider could not be registered: {0}")]
    ServiceProviderNotRegistered(String),

    /// A service provider with the requested name already exists
    #[error("error-keyman-dcr-9 Application already exists: {0}")]
    ApplicationExists(String),

    /// An OAuth application already uses the preset client identifier
    #[error("error-keyman-dcr-10 Client ID already exists: {0}")]
    ClientIdExists(String),

    /// No application with this client identifier
    #[error("error-keyman-dcr-11 Application not found: {0}")]
    ApplicationNotFound(String),

    /// Caller may not manage this application
    #[error("error-keyman-dcr-12 Caller is not authorized for application: {0}")]
    Forbidden(String),

    /// Backing store failure
    #[error("error-keyman-dcr-13 Failed to {operation} for {subject}: {source}")]
    Server {
        operation: StoreOperation,
        subject: String,
        #[source]
        source: StorageError,
    },

    /// Backing store accepted a write but returned nothing
    #[error("error-keyman-dcr-14 Failed to {operation} for {subject}: no record returned")]
    MissingRecord {
        operation: StoreOperation,
        subject: String,
    },
}

impl RegistrationError {
    pub fn server(operation: StoreOperation, subject: &str, source: StorageError) -> Self {
        RegistrationError::Server {
            operation,
            subject: subject.to_string(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistrationError::InvalidInput(_)
            | RegistrationError::InvalidApplicationName(_)
            | RegistrationError::InvalidRedirectUri(_)
            | RegistrationError::RedirectUriRequired
            | RegistrationError::InvalidBackchannelLogoutUri(_)
            | RegistrationError::ClientIdViolatesPattern(_)
            | RegistrationError::InvalidTemplate(_)
            | RegistrationError::ServiceProviderNotRegistered(_) => ErrorKind::Client,
            RegistrationError::ApplicationExists(_) | RegistrationError::ClientIdExists(_) => {
                ErrorKind::Conflict
            }
            RegistrationError::ApplicationNotFound(_) => ErrorKind::NotFound,
            RegistrationError::Forbidden(_) => ErrorKind::Forbidden,
            RegistrationError::Server { .. } | RegistrationError::MissingRecord { .. } => {
                ErrorKind::Server
            }
        }
    }

    /// Stable machine-checkable rejection code
    pub fn code(&self) -> &'static str {
        match self {
            RegistrationError::InvalidInput(_) => "invalid_input",
            RegistrationError::InvalidApplicationName(_) => "invalid_client_name",
            RegistrationError::InvalidRedirectUri(_) => "invalid_redirect_uri",
            RegistrationError::RedirectUriRequired => "redirect_uri_required",
            RegistrationError::InvalidBackchannelLogoutUri(_) => "invalid_backchannel_logout_uri",
            RegistrationError::ClientIdViolatesPattern(_) => "client_id_violates_pattern",
            RegistrationError::InvalidTemplate(_) => "invalid_sp_template",
            RegistrationError::ServiceProviderNotRegistered(_) => "failed_to_register_sp",
            RegistrationError::ApplicationExists(_) => "conflict_existing_application",
            RegistrationError::ClientIdExists(_) => "conflict_existing_client_id",
            RegistrationError::ApplicationNotFound(_) => "not_found_application",
            RegistrationError::Forbidden(_) => "forbidden_unauthorized_user",
            RegistrationError::Server { .. } | RegistrationError::MissingRecord { .. } => {
                "server_error"
            }
        }
    }
}

/// Scope and role synchronization errors
#[derive(Debug, Error)]
pub enum ScopeSyncError {
    /// API resource lookup failed
    #[error("error-keyman-scope-1 Failed to get the ID of API resource {identifier}: {source}")]
    ResourceLookup {
        identifier: String,
        #[source]
        source: StorageError,
    },

    /// Removing a scope from the API resource failed
    #[error("error-keyman-scope-2 Failed to delete scope {scope} from API resource {identifier}: {source}")]
    ResourceScopeDelete {
        scope: String,
        identifier: String,
        #[source]
        source: StorageError,
    },

    /// Adding scopes to the API resource failed
    #[error("error-keyman-scope-3 Failed to add scopes to API resource {identifier}: {source}")]
    ResourceScopeAdd {
        identifier: String,
        #[source]
        source: StorageError,
    },

    /// Creating the API resource failed
    #[error("error-keyman-scope-4 Failed to create API resource {identifier} with scopes: {source}")]
    ResourceCreate {
        identifier: String,
        #[source]
        source: StorageError,
    },

    /// Looking up, creating or patching a role failed
    #[error("error-keyman-scope-5 Failed to bind scope {scope} to role {role}: {source}")]
    RoleBinding {
        role: String,
        scope: String,
        #[source]
        source: StorageError,
    },

    /// Legacy scope registry operation failed
    #[error("error-keyman-scope-6 Scope registry operation failed for {scope}: {source}")]
    Registry {
        scope: String,
        #[source]
        source: StorageError,
    },

    /// Scope does not exist in the legacy registry
    #[error("error-keyman-scope-7 Scope not found: {0}")]
    ScopeNotFound(String),
}

impl ScopeSyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScopeSyncError::ScopeNotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Server,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ScopeSyncError::ScopeNotFound(_) => "scope_not_found",
            _ => "server_error",
        }
    }
}

/// HTTP server errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Error when the fronting gateway did not identify the caller
    #[error("error-keyman-http-1 Missing authenticated caller")]
    MissingCaller,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            HttpError::MissingCaller => (StatusCode::UNAUTHORIZED, "unauthorized"),
        };
        (
            status,
            axum::Json(json!({
                "error": error_code,
                "error_description": self.to_string()
            })),
        )
            .into_response()
    }
}
