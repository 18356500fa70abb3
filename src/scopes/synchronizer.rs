//! Scope synchronization between gateway-declared scopes and the remote
//! scope registries.
//!
//! Scopes live in two places: the API resource container, compared by scope
//! display name, and the legacy flat registry, compared by scope key. The two
//! are reconciled independently and without a transaction.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::errors::ScopeSyncError;
use crate::scopes::attachment::ResourceScopeAttachment;
use crate::scopes::role_binding::RoleBindingManager;
use crate::scopes::types::{
    ApiResource, DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER, LegacyScope, ResourceScope, Scope,
    UriTemplate,
};
use crate::storage::traits::{ScopeRegistry, ScopeResourceContainer};

type Result<T> = std::result::Result<T, ScopeSyncError>;

pub struct ScopeSynchronizer {
    registry: Arc<dyn ScopeRegistry>,
    resources: Arc<dyn ScopeResourceContainer>,
    role_binding: RoleBindingManager,
    attachment: Arc<dyn ResourceScopeAttachment>,
    resource_identifier: String,
}

impl ScopeSynchronizer {
    pub fn new(
        registry: Arc<dyn ScopeRegistry>,
        resources: Arc<dyn ScopeResourceContainer>,
        role_binding: RoleBindingManager,
        attachment: Arc<dyn ResourceScopeAttachment>,
    ) -> Self {
        Self {
            registry,
            resources,
            role_binding,
            attachment,
            resource_identifier: DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER.to_string(),
        }
    }

    /// Reconcile the remote registries with a new set of scopes.
    ///
    /// Old scopes are removed from the API resource container (a failure
    /// aborts) and from the legacy registry (a failure is logged). New scopes
    /// whose display name the container does not know yet are added to it,
    /// creating the container if needed. Roles are then bound, and scopes
    /// missing from the legacy registry are registered there; failures in
    /// that last step are logged and skipped.
    pub async fn synchronize(
        &self,
        old_scope_keys: &[String],
        new_scopes: &[Scope],
        old_uri_templates: &[UriTemplate],
        new_uri_templates: &[UriTemplate],
    ) -> Result<()> {
        let identifier = self.resource_identifier.as_str();
        let container_id = self
            .resources
            .find_by_identifier(identifier)
            .await
            .map_err(|source| ScopeSyncError::ResourceLookup {
                identifier: identifier.to_string(),
                source,
            })?;

        self.attachment.detach(old_uri_templates).await?;

        for old_scope in old_scope_keys {
            if let Some(container_id) = container_id.as_deref() {
                self.resources
                    .delete_scope(container_id, old_scope)
                    .await
                    .map_err(|source| ScopeSyncError::ResourceScopeDelete {
                        scope: old_scope.clone(),
                        identifier: identifier.to_string(),
                        source,
                    })?;
            }
            if let Err(err) = self.registry.delete(old_scope).await {
                warn!(scope = %old_scope, error = ?err, "Failed to delete legacy scope");
            }
        }

        match container_id.as_deref() {
            Some(container_id) => {
                let existing_names: HashSet<String> = self
                    .resources
                    .list_scope_names(container_id)
                    .await
                    .map_err(|source| ScopeSyncError::ResourceScopeAdd {
                        identifier: identifier.to_string(),
                        source,
                    })?
                    .into_iter()
                    .collect();
                let scopes_to_add = scopes_to_add(new_scopes, &existing_names);
                self.resources
                    .patch_add_scopes(container_id, &scopes_to_add)
                    .await
                    .map_err(|source| ScopeSyncError::ResourceScopeAdd {
                        identifier: identifier.to_string(),
                        source,
                    })?;
            }
            None => {
                let scopes_to_add = scopes_to_add(new_scopes, &HashSet::new());
                let mut resource = ApiResource::default_resource(scopes_to_add);
                resource.identifier = identifier.to_string();
                self.resources.create(&resource).await.map_err(|source| {
                    ScopeSyncError::ResourceCreate {
                        identifier: identifier.to_string(),
                        source,
                    }
                })?;
            }
        }

        self.role_binding.bind(new_scopes).await?;

        for scope in new_scopes {
            match self.registry.exists(&scope.key).await {
                Ok(false) => {
                    if let Err(err) = self.register_scope(scope).await {
                        warn!(scope = %scope.key, error = ?err, "Failed to register legacy scope");
                    }
                }
                Ok(true) => {
                    debug!(
                        scope = %scope.key,
                        "Scope already registered, skipping registering scope"
                    );
                }
                Err(err) => {
                    warn!(scope = %scope.key, error = ?err, "Failed to check legacy scope existence");
                }
            }
        }

        self.attachment.attach(new_uri_templates).await
    }

    /// Register a scope with its role bindings in the legacy registry.
    ///
    /// Only the legacy record is written. Container scopes and role
    /// permissions are left to [`Self::synchronize`].
    pub async fn register_scope(&self, scope: &Scope) -> Result<()> {
        self.registry
            .create(&LegacyScope::from(scope))
            .await
            .map_err(|source| registry_error(&scope.key, source))
    }

    pub async fn get_scope(&self, key: &str) -> Result<Scope> {
        self.registry
            .get(key)
            .await
            .map_err(|source| registry_error(key, source))?
            .map(Scope::from)
            .ok_or_else(|| ScopeSyncError::ScopeNotFound(key.to_string()))
    }

    /// Every legacy scope, keyed by scope key
    pub async fn get_all_scopes(&self) -> Result<BTreeMap<String, Scope>> {
        let scopes = self
            .registry
            .get_all()
            .await
            .map_err(|source| registry_error("*", source))?;
        Ok(scopes
            .into_iter()
            .map(|scope| (scope.name.clone(), Scope::from(scope)))
            .collect())
    }

    pub async fn update_scope(&self, scope: &Scope) -> Result<()> {
        self.registry
            .update(&LegacyScope::from(scope))
            .await
            .map_err(|source| registry_error(&scope.key, source))
    }

    pub async fn delete_scope(&self, key: &str) -> Result<()> {
        self.registry
            .delete(key)
            .await
            .map_err(|source| registry_error(key, source))
    }

    pub async fn is_scope_exists(&self, key: &str) -> Result<bool> {
        self.registry
            .exists(key)
            .await
            .map_err(|source| registry_error(key, source))
    }

    /// Fill display name, description and roles of each scope from the registry
    pub async fn validate_scopes(&self, scopes: &mut [Scope]) -> Result<()> {
        for scope in scopes.iter_mut() {
            let shared = self.get_scope(&scope.key).await?;
            scope.display_name = shared.display_name;
            scope.description = shared.description;
            scope.roles = shared.roles;
        }
        Ok(())
    }
}

/// New scopes whose display name is not among the container's scope names
fn scopes_to_add(new_scopes: &[Scope], existing_names: &HashSet<String>) -> Vec<ResourceScope> {
    new_scopes
        .iter()
        .filter(|scope| !existing_names.contains(&scope.display_name))
        .map(ResourceScope::from)
        .collect()
}

fn registry_error(scope: &str, source: crate::errors::StorageError) -> ScopeSyncError {
    ScopeSyncError::Registry {
        scope: scope.to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scopes::attachment::NoopResourceAttachment;
    use crate::storage::inmemory::{
        MemoryApiResourceContainer, MemoryRoleRegistry, MemoryScopeRegistry,
    };

    struct Fixture {
        registry: Arc<MemoryScopeRegistry>,
        resources: Arc<MemoryApiResourceContainer>,
        synchronizer: ScopeSynchronizer,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(MemoryScopeRegistry::new());
        let resources = Arc::new(MemoryApiResourceContainer::new());
        let roles = Arc::new(MemoryRoleRegistry::new());
        let synchronizer = ScopeSynchronizer::new(
            registry.clone(),
            resources.clone(),
            RoleBindingManager::new(roles),
            Arc::new(NoopResourceAttachment),
        );
        Fixture {
            registry,
            resources,
            synchronizer,
        }
    }

    #[test]
    fn test_scopes_to_add_compares_display_names() {
        let existing: HashSet<String> = ["Read Orders".to_string()].into_iter().collect();
        let scopes = vec![
            Scope::new("read:orders", "Read Orders", "", ""),
            Scope::new("write:orders", "Write Orders", "", ""),
        ];
        let added = scopes_to_add(&scopes, &existing);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].name, "write:orders");
    }

    #[tokio::test]
    async fn test_first_synchronize_creates_container_and_legacy_scopes() {
        let f = fixture();
        let scopes = vec![Scope::new("read:orders", "Read Orders", "Read", "reader")];

        f.synchronizer
            .synchronize(&[], &scopes, &[], &[])
            .await
            .unwrap();

        let container_id = f
            .resources
            .find_by_identifier(DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER)
            .await
            .unwrap()
            .unwrap();
        let resource = f.resources.resource(&container_id).unwrap().unwrap();
        assert!(resource.requires_authorization);
        assert_eq!(resource.scopes, vec![ResourceScope::from(&scopes[0])]);

        let legacy = f.synchronizer.get_scope("read:orders").await.unwrap();
        assert_eq!(legacy, scopes[0]);
    }

    #[tokio::test]
    async fn test_synchronize_removes_old_scopes() {
        let f = fixture();
        let old = vec![Scope::new("read:orders", "Read Orders", "", "")];
        f.synchronizer.synchronize(&[], &old, &[], &[]).await.unwrap();

        let new = vec![Scope::new("read:invoices", "Read Invoices", "", "")];
        f.synchronizer
            .synchronize(&["read:orders".to_string()], &new, &[], &[])
            .await
            .unwrap();

        let container_id = f
            .resources
            .find_by_identifier(DEFAULT_OAUTH_2_RESOURCE_IDENTIFIER)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            f.resources.list_scope_names(&container_id).await.unwrap(),
            vec!["read:invoices".to_string()]
        );
        assert!(!f.registry.exists("read:orders").await.unwrap());
        assert!(f.registry.exists("read:invoices").await.unwrap());
    }

    #[tokio::test]
    async fn test_legacy_registration_never_overwrites() {
        let f = fixture();
        f.synchronizer
            .register_scope(&Scope::new("read:orders", "Original", "kept", ""))
            .await
            .unwrap();

        f.synchronizer
            .synchronize(
                &[],
                &[Scope::new("read:orders", "Read Orders", "replaced", "")],
                &[],
                &[],
            )
            .await
            .unwrap();

        let legacy = f.synchronizer.get_scope("read:orders").await.unwrap();
        assert_eq!(legacy.display_name, "Original");
        assert_eq!(legacy.description, "kept");
    }

    #[tokio::test]
    async fn test_legacy_scope_operations() {
        let f = fixture();
        let scope = Scope::new("read:orders", "Read Orders", "Read", "reader, auditor");
        f.synchronizer.register_scope(&scope).await.unwrap();
        assert!(f.synchronizer.is_scope_exists("read:orders").await.unwrap());

        let mut updated = scope.clone();
        updated.description = "Read all orders".to_string();
        f.synchronizer.update_scope(&updated).await.unwrap();

        let mut partial = vec![Scope {
            key: "read:orders".to_string(),
            ..Default::default()
        }];
        f.synchronizer.validate_scopes(&mut partial).await.unwrap();
        assert_eq!(partial[0], updated);
        assert_eq!(partial[0].roles_string(), "reader,auditor");

        let all = f.synchronizer.get_all_scopes().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all["read:orders"], updated);

        f.synchronizer.delete_scope("read:orders").await.unwrap();
        let err = f.synchronizer.get_scope("read:orders").await.unwrap_err();
        assert!(matches!(err, ScopeSyncError::ScopeNotFound(_)));
    }
}
