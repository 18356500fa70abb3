//! Storage trait definitions for the identity and scope collaborators.
//!
//! Registration drives a service provider directory and an OAuth client
//! directory; scope synchronization drives a legacy scope registry, an API
//! resource container and a role registry. Each is an async interface that
//! can be backed in memory or by a remote identity server.

use crate::dcr::types::{CallerContext, OAuthApplication, OAuthApplicationDraft, ServiceProvider};
use crate::errors::StorageError;
use crate::scopes::types::{ApiResource, LegacyScope, ResourceScope, Role, RolePermission};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, StorageError>;

// ===== Identity Storage Traits =====

/// Trait for storing and retrieving service providers
#[async_trait]
pub trait ServiceProviderStore: Send + Sync {
    /// Retrieve a service provider by name within a tenant
    async fn get_by_name(&self, name: &str, tenant_domain: &str)
    -> Result<Option<ServiceProvider>>;

    /// Store a new service provider, optionally applying a template
    async fn create(
        &self,
        sp: &ServiceProvider,
        tenant_domain: &str,
        owner: &str,
        template: Option<&str>,
    ) -> Result<()>;

    /// Update an existing service provider
    async fn update(&self, sp: &ServiceProvider, tenant_domain: &str, owner: &str) -> Result<()>;

    /// Delete a service provider by name
    async fn delete(&self, name: &str, tenant_domain: &str, owner: &str) -> Result<()>;

    /// Whether a service provider template exists
    async fn is_existing_template(&self, template: &str, tenant_domain: &str) -> Result<bool>;

    /// Name of the service provider linked to a client identifier
    async fn get_name_by_client_id(
        &self,
        client_id: &str,
        tenant_domain: &str,
    ) -> Result<Option<String>>;
}

/// Trait for storing and retrieving OAuth client records
#[async_trait]
pub trait OAuthClientStore: Send + Sync {
    /// Retrieve a client by ID
    async fn get_by_client_id(&self, client_id: &str) -> Result<Option<OAuthApplication>>;

    /// Store a new client, generating identifier and secret when the draft has none
    async fn create(&self, draft: &OAuthApplicationDraft) -> Result<Option<OAuthApplication>>;

    /// Update an existing client
    async fn update(&self, app: &OAuthApplication) -> Result<()>;

    /// Delete a client
    async fn delete(&self, client_id: &str) -> Result<()>;
}

/// Decides whether a caller may manage an application
#[async_trait]
pub trait AuthorizationChecker: Send + Sync {
    async fn is_authorized(
        &self,
        service_provider_name: &str,
        caller: &CallerContext,
    ) -> Result<bool>;
}

// ===== Scope Storage Traits =====

/// Legacy flat scope registry, keyed by scope key
#[async_trait]
pub trait ScopeRegistry: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool>;

    async fn get(&self, key: &str) -> Result<Option<LegacyScope>>;

    async fn create(&self, scope: &LegacyScope) -> Result<()>;

    async fn update(&self, scope: &LegacyScope) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn get_all(&self) -> Result<Vec<LegacyScope>>;
}

/// Grouped API resource holding declared scopes
#[async_trait]
pub trait ScopeResourceContainer: Send + Sync {
    /// Container id for a resource identifier, `None` when no such container exists
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<String>>;

    /// Names of every scope in a container
    async fn list_scope_names(&self, container_id: &str) -> Result<Vec<String>>;

    /// Add scopes to an existing container
    async fn patch_add_scopes(&self, container_id: &str, scopes: &[ResourceScope]) -> Result<()>;

    /// Create a container, returning its id
    async fn create(&self, resource: &ApiResource) -> Result<String>;

    /// Remove one scope from a container
    async fn delete_scope(&self, container_id: &str, scope_name: &str) -> Result<()>;
}

/// Role registry holding scope bindings as role permissions
#[async_trait]
pub trait RoleRegistry: Send + Sync {
    /// Role id for an exact display name match
    async fn find_by_display_name(&self, display_name: &str) -> Result<Option<String>>;

    async fn get(&self, role_id: &str) -> Result<Option<Role>>;

    /// Create a role, returning its id
    async fn create(&self, role: &Role) -> Result<String>;

    /// Replace the full permission list of a role
    async fn patch_permissions(&self, role_id: &str, permissions: &[RolePermission]) -> Result<()>;
}
