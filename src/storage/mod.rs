//! Trait-based storage abstractions with in-memory and remote backends.

pub mod inmemory;
pub mod remote;
pub mod traits;

// Re-export commonly used types and traits
pub use inmemory::{
    MemoryApiResourceContainer, MemoryOAuthClientStore, MemoryRoleRegistry, MemoryScopeRegistry,
    MemoryServiceProviderStore,
};
pub use remote::{RemoteApiResourceContainer, RemoteClient, RemoteRoleRegistry, RemoteScopeRegistry};
pub use traits::*;

use crate::config::StorageBackend;
use std::sync::Arc;

/// Every collaborator the registration and scope services drive
#[derive(Clone)]
pub struct Stores {
    pub service_providers: Arc<dyn ServiceProviderStore>,
    pub oauth_clients: Arc<dyn OAuthClientStore>,
    pub scope_registry: Arc<dyn ScopeRegistry>,
    pub resources: Arc<dyn ScopeResourceContainer>,
    pub roles: Arc<dyn RoleRegistry>,
}

impl Stores {
    /// All collaborators kept in memory
    pub fn in_memory() -> Self {
        Self {
            service_providers: Arc::new(MemoryServiceProviderStore::new()),
            oauth_clients: Arc::new(MemoryOAuthClientStore::new()),
            scope_registry: Arc::new(MemoryScopeRegistry::new()),
            resources: Arc::new(MemoryApiResourceContainer::new()),
            roles: Arc::new(MemoryRoleRegistry::new()),
        }
    }
}

/// Create the storage collaborators based on configuration.
///
/// The remote backend reaches the scope, API resource and role registries
/// over HTTP; service providers and OAuth clients stay in memory.
pub fn create_storage_backend(backend: &StorageBackend, http_client: &reqwest::Client) -> Stores {
    match backend {
        StorageBackend::Memory => Stores::in_memory(),
        StorageBackend::Remote(endpoints) => {
            let client = RemoteClient::new(
                http_client.clone(),
                &endpoints.username,
                &endpoints.password,
            );
            Stores {
                scope_registry: Arc::new(RemoteScopeRegistry::new(
                    client.clone(),
                    &endpoints.scope_management_endpoint,
                )),
                resources: Arc::new(RemoteApiResourceContainer::new(
                    client.clone(),
                    &endpoints.api_resource_management_endpoint,
                )),
                roles: Arc::new(RemoteRoleRegistry::new(client, &endpoints.roles_endpoint)),
                ..Stores::in_memory()
            }
        }
    }
}
