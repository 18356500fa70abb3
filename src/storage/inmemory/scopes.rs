//! In-memory scope, API resource and role storage

use crate::errors::StorageError;
use crate::scopes::types::{ApiResource, LegacyScope, ResourceScope, Role, RolePermission};
use crate::storage::traits::*;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

fn lock_error<T>(e: PoisonError<T>) -> StorageError {
    StorageError::SerializationFailed(format!("Lock error: {}", e))
}

/// In-memory legacy scope registry
#[derive(Default)]
pub struct MemoryScopeRegistry {
    scopes: Mutex<BTreeMap<String, LegacyScope>>,
}

impl MemoryScopeRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScopeRegistry for MemoryScopeRegistry {
    async fn exists(&self, key: &str) -> Result<bool> {
        let scopes = self.scopes.lock().map_err(lock_error)?;
        Ok(scopes.contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<LegacyScope>> {
        let scopes = self.scopes.lock().map_err(lock_error)?;
        Ok(scopes.get(key).cloned())
    }

    async fn create(&self, scope: &LegacyScope) -> Result<()> {
        let mut scopes = self.scopes.lock().map_err(lock_error)?;
        if scopes.contains_key(&scope.name) {
            return Err(StorageError::AlreadyExists(format!("Scope {}", scope.name)));
        }
        scopes.insert(scope.name.clone(), scope.clone());
        Ok(())
    }

    async fn update(&self, scope: &LegacyScope) -> Result<()> {
        let mut scopes = self.scopes.lock().map_err(lock_error)?;
        match scopes.get_mut(&scope.name) {
            Some(existing) => {
                *existing = scope.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("Scope {}", scope.name))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut scopes = self.scopes.lock().map_err(lock_error)?;
        scopes
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("Scope {}", key)))
    }

    async fn get_all(&self) -> Result<Vec<LegacyScope>> {
        let scopes = self.scopes.lock().map_err(lock_error)?;
        Ok(scopes.values().cloned().collect())
    }
}

/// In-memory API resource container
#[derive(Default)]
pub struct MemoryApiResourceContainer {
    resources: Mutex<HashMap<String, ApiResource>>,
}

impl MemoryApiResourceContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resource stored under a container id
    pub fn resource(&self, container_id: &str) -> Result<Option<ApiResource>> {
        let resources = self.resources.lock().map_err(lock_error)?;
        Ok(resources.get(container_id).cloned())
    }
}

#[async_trait]
impl ScopeResourceContainer for MemoryApiResourceContainer {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<String>> {
        let resources = self.resources.lock().map_err(lock_error)?;
        Ok(resources
            .iter()
            .find(|(_, resource)| resource.identifier == identifier)
            .map(|(id, _)| id.clone()))
    }

    async fn list_scope_names(&self, container_id: &str) -> Result<Vec<String>> {
        let resources = self.resources.lock().map_err(lock_error)?;
        resources
            .get(container_id)
            .map(|resource| resource.scopes.iter().map(|s| s.name.clone()).collect())
            .ok_or_else(|| StorageError::NotFound(format!("API resource {}", container_id)))
    }

    async fn patch_add_scopes(&self, container_id: &str, scopes: &[ResourceScope]) -> Result<()> {
        let mut resources = self.resources.lock().map_err(lock_error)?;
        let resource = resources
            .get_mut(container_id)
            .ok_or_else(|| StorageError::NotFound(format!("API resource {}", container_id)))?;
        resource.scopes.extend(scopes.iter().cloned());
        Ok(())
    }

    async fn create(&self, resource: &ApiResource) -> Result<String> {
        let mut resources = self.resources.lock().map_err(lock_error)?;
        if resources
            .values()
            .any(|existing| existing.identifier == resource.identifier)
        {
            return Err(StorageError::AlreadyExists(format!(
                "API resource {}",
                resource.identifier
            )));
        }
        let id = Uuid::new_v4().to_string();
        let mut stored = resource.clone();
        stored.id = Some(id.clone());
        resources.insert(id.clone(), stored);
        Ok(id)
    }

    async fn delete_scope(&self, container_id: &str, scope_name: &str) -> Result<()> {
        let mut resources = self.resources.lock().map_err(lock_error)?;
        let resource = resources
            .get_mut(container_id)
            .ok_or_else(|| StorageError::NotFound(format!("API resource {}", container_id)))?;
        resource.scopes.retain(|scope| scope.name != scope_name);
        Ok(())
    }
}

/// In-memory role registry
#[derive(Default)]
pub struct MemoryRoleRegistry {
    roles: Mutex<HashMap<String, Role>>,
}

impl MemoryRoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRegistry for MemoryRoleRegistry {
    async fn find_by_display_name(&self, display_name: &str) -> Result<Option<String>> {
        let roles = self.roles.lock().map_err(lock_error)?;
        Ok(roles
            .values()
            .find(|role| role.display_name == display_name)
            .map(|role| role.id.clone()))
    }

    async fn get(&self, role_id: &str) -> Result<Option<Role>> {
        let roles = self.roles.lock().map_err(lock_error)?;
        Ok(roles.get(role_id).cloned())
    }

    async fn create(&self, role: &Role) -> Result<String> {
        let mut roles = self.roles.lock().map_err(lock_error)?;
        if roles
            .values()
            .any(|existing| existing.display_name == role.display_name)
        {
            return Err(StorageError::AlreadyExists(format!(
                "Role {}",
                role.display_name
            )));
        }
        let id = Uuid::new_v4().to_string();
        let mut stored = role.clone();
        stored.id = id.clone();
        roles.insert(id.clone(), stored);
        Ok(id)
    }

    async fn patch_permissions(&self, role_id: &str, permissions: &[RolePermission]) -> Result<()> {
        let mut roles = self.roles.lock().map_err(lock_error)?;
        let role = roles
            .get_mut(role_id)
            .ok_or_else(|| StorageError::NotFound(format!("Role {}", role_id)))?;
        role.permissions = permissions.to_vec();
        Ok(())
    }
}
