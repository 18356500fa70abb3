//! Keeps role permission lists aligned with scope role bindings.
//!
//! Adding a scope to an existing role reads the full permission list, appends
//! the binding and replaces the list. There is no version check, so two
//! binders updating the same role concurrently can lose one of the writes.

use std::sync::Arc;
use tracing::debug;

use crate::errors::{ScopeSyncError, StorageError};
use crate::scopes::types::{Role, RolePermission, Scope};
use crate::storage::traits::RoleRegistry;

pub struct RoleBindingManager {
    roles: Arc<dyn RoleRegistry>,
}

impl RoleBindingManager {
    pub fn new(roles: Arc<dyn RoleRegistry>) -> Self {
        Self { roles }
    }

    /// Bind every scope to each of its roles, creating missing roles
    pub async fn bind(&self, scopes: &[Scope]) -> Result<(), ScopeSyncError> {
        for scope in scopes {
            for role in &scope.roles {
                let role_id = self
                    .roles
                    .find_by_display_name(role)
                    .await
                    .map_err(|e| binding_error(role, scope, e))?;

                match role_id {
                    Some(role_id) => self.add_scope_to_role(scope, role, &role_id).await?,
                    None => self.create_role(scope, role).await?,
                }
            }
        }
        Ok(())
    }

    async fn add_scope_to_role(
        &self,
        scope: &Scope,
        role: &str,
        role_id: &str,
    ) -> Result<(), ScopeSyncError> {
        let existing = self
            .roles
            .get(role_id)
            .await
            .map_err(|e| binding_error(role, scope, e))?
            .ok_or_else(|| {
                binding_error(role, scope, StorageError::NotFound(format!("Role {}", role_id)))
            })?;

        let mut permissions = existing.permissions;
        permissions.push(RolePermission::from(scope));

        debug!(role = %role, scope = %scope.key, "Adding scope to role");
        self.roles
            .patch_permissions(role_id, &permissions)
            .await
            .map_err(|e| binding_error(role, scope, e))
    }

    async fn create_role(&self, scope: &Scope, role: &str) -> Result<(), ScopeSyncError> {
        debug!(role = %role, scope = %scope.key, "Creating role for scope");
        self.roles
            .create(&Role {
                id: String::new(),
                display_name: role.to_string(),
                permissions: vec![RolePermission::from(scope)],
            })
            .await
            .map(|_| ())
            .map_err(|e| binding_error(role, scope, e))
    }
}

fn binding_error(role: &str, scope: &Scope, source: StorageError) -> ScopeSyncError {
    ScopeSyncError::RoleBinding {
        role: role.to_string(),
        scope: scope.key.clone(),
        source,
    }
}
