//! Application state shared by every request handler.

use std::sync::Arc;

use crate::config::Config;
use crate::dcr::policy::{ApplicationNamePolicy, ClientIdPolicy};
use crate::dcr::{OwnerOrAdminAuthorizationChecker, RegistrationService};
use crate::scopes::{NoopResourceAttachment, RoleBindingManager, ScopeSynchronizer};
use crate::storage::Stores;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Application registration across service providers and OAuth clients
    pub registration_service: Arc<RegistrationService>,
    /// Scope reconciliation and legacy scope operations
    pub scope_synchronizer: Arc<ScopeSynchronizer>,
}

impl AppState {
    /// Wire the services on top of the given storage collaborators
    pub fn new(config: Arc<Config>, stores: Stores) -> Self {
        let authorization = Arc::new(OwnerOrAdminAuthorizationChecker::new(
            stores.service_providers.clone(),
            config.admin_usernames.as_ref().clone(),
        ));

        let registration_service = Arc::new(RegistrationService::new(
            stores.service_providers.clone(),
            stores.oauth_clients.clone(),
            authorization,
            ApplicationNamePolicy::new(config.application_name_pattern.clone()),
            ClientIdPolicy::new(config.client_id_pattern.clone()),
        ));

        let scope_synchronizer = Arc::new(ScopeSynchronizer::new(
            stores.scope_registry.clone(),
            stores.resources.clone(),
            RoleBindingManager::new(stores.roles.clone()),
            Arc::new(NoopResourceAttachment),
        ));

        Self {
            config,
            registration_service,
            scope_synchronizer,
        }
    }
}
