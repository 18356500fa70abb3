//! In-memory service provider and OAuth client storage

use crate::dcr::types::{
    OAuthApplication, OAuthApplicationDraft, ServiceProvider, ServiceProviderOwner,
    generate_client_id, generate_client_secret,
};
use crate::errors::StorageError;
use crate::storage::traits::*;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

fn lock_error<T>(e: PoisonError<T>) -> StorageError {
    StorageError::SerializationFailed(format!("Lock error: {}", e))
}

/// In-memory implementation for service provider storage
#[derive(Default)]
pub struct MemoryServiceProviderStore {
    // (tenant_domain, id) -> service provider
    service_providers: Mutex<HashMap<(String, String), ServiceProvider>>,
    // (tenant_domain, template name)
    templates: Mutex<HashSet<(String, String)>>,
}

impl MemoryServiceProviderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service provider template for a tenant
    pub fn with_template(self, template: &str, tenant_domain: &str) -> Self {
        if let Ok(mut templates) = self.templates.lock() {
            templates.insert((tenant_domain.to_string(), template.to_string()));
        }
        self
    }

    /// Number of service providers in a tenant
    pub fn count(&self, tenant_domain: &str) -> Result<usize> {
        let service_providers = self.service_providers.lock().map_err(lock_error)?;
        Ok(service_providers
            .keys()
            .filter(|(tenant, _)| tenant == tenant_domain)
            .count())
    }
}

#[async_trait]
impl ServiceProviderStore for MemoryServiceProviderStore {
    async fn get_by_name(
        &self,
        name: &str,
        tenant_domain: &str,
    ) -> Result<Option<ServiceProvider>> {
        let service_providers = self.service_providers.lock().map_err(lock_error)?;
        Ok(service_providers
            .iter()
            .find(|((tenant, _), sp)| tenant == tenant_domain && sp.name == name)
            .map(|(_, sp)| sp.clone()))
    }

    async fn create(
        &self,
        sp: &ServiceProvider,
        tenant_domain: &str,
        owner: &str,
        template: Option<&str>,
    ) -> Result<()> {
        if let Some(template) = template {
            let templates = self.templates.lock().map_err(lock_error)?;
            if !templates.contains(&(tenant_domain.to_string(), template.to_string())) {
                return Err(StorageError::InvalidData(format!(
                    "Unknown service provider template: {}",
                    template
                )));
            }
        }

        let mut service_providers = self.service_providers.lock().map_err(lock_error)?;
        if service_providers
            .iter()
            .any(|((tenant, _), existing)| tenant == tenant_domain && existing.name == sp.name)
        {
            return Err(StorageError::AlreadyExists(format!(
                "Service provider {} in tenant {}",
                sp.name, tenant_domain
            )));
        }

        let mut stored = sp.clone();
        stored.owner = ServiceProviderOwner {
            username: owner.to_string(),
            tenant_domain: tenant_domain.to_string(),
        };
        service_providers.insert((tenant_domain.to_string(), stored.id.clone()), stored);
        Ok(())
    }

    async fn update(&self, sp: &ServiceProvider, tenant_domain: &str, owner: &str) -> Result<()> {
        let mut service_providers = self.service_providers.lock().map_err(lock_error)?;
        let key = (tenant_domain.to_string(), sp.id.clone());
        if !service_providers.contains_key(&key) {
            return Err(StorageError::NotFound(format!(
                "Service provider {} in tenant {}",
                sp.name, tenant_domain
            )));
        }
        if service_providers.iter().any(|((tenant, id), existing)| {
            tenant == tenant_domain && id != &sp.id && existing.name == sp.name
        }) {
            return Err(StorageError::AlreadyExists(format!(
                "Service provider {} in tenant {}",
                sp.name, tenant_domain
            )));
        }

        let mut stored = sp.clone();
        stored.owner = ServiceProviderOwner {
            username: owner.to_string(),
            tenant_domain: tenant_domain.to_string(),
        };
        service_providers.insert(key, stored);
        Ok(())
    }

    async fn delete(&self, name: &str, tenant_domain: &str, _owner: &str) -> Result<()> {
        let mut service_providers = self.service_providers.lock().map_err(lock_error)?;
        let key = service_providers
            .iter()
            .find(|((tenant, _), sp)| tenant == tenant_domain && sp.name == name)
            .map(|(key, _)| key.clone())
            .ok_or_else(|| {
                StorageError::NotFound(format!(
                    "Service provider {} in tenant {}",
                    name, tenant_domain
                ))
            })?;
        service_providers.remove(&key);
        Ok(())
    }

    async fn is_existing_template(&self, template: &str, tenant_domain: &str) -> Result<bool> {
        let templates = self.templates.lock().map_err(lock_error)?;
        Ok(templates.contains(&(tenant_domain.to_string(), template.to_string())))
    }

    async fn get_name_by_client_id(
        &self,
        client_id: &str,
        tenant_domain: &str,
    ) -> Result<Option<String>> {
        let service_providers = self.service_providers.lock().map_err(lock_error)?;
        Ok(service_providers
            .iter()
            .find(|((tenant, _), sp)| {
                tenant == tenant_domain && sp.linked_client_id() == Some(client_id)
            })
            .map(|(_, sp)| sp.name.clone()))
    }
}

/// In-memory implementation for OAuth client storage
#[derive(Default)]
pub struct MemoryOAuthClientStore {
    clients: Mutex<HashMap<String, OAuthApplication>>,
}

impl MemoryOAuthClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored clients
    pub fn count(&self) -> Result<usize> {
        let clients = self.clients.lock().map_err(lock_error)?;
        Ok(clients.len())
    }
}

#[async_trait]
impl OAuthClientStore for MemoryOAuthClientStore {
    async fn get_by_client_id(&self, client_id: &str) -> Result<Option<OAuthApplication>> {
        let clients = self.clients.lock().map_err(lock_error)?;
        Ok(clients.get(client_id).cloned())
    }

    async fn create(&self, draft: &OAuthApplicationDraft) -> Result<Option<OAuthApplication>> {
        let client_id = draft.client_id.clone().unwrap_or_else(generate_client_id);
        let client_secret = draft
            .client_secret
            .clone()
            .unwrap_or_else(generate_client_secret);

        let mut clients = self.clients.lock().map_err(lock_error)?;
        if clients.contains_key(&client_id) {
            return Err(StorageError::AlreadyExists(format!("OAuth client {}", client_id)));
        }

        let app = draft.clone().into_application(client_id.clone(), client_secret);
        clients.insert(client_id, app.clone());
        Ok(Some(app))
    }

    async fn update(&self, app: &OAuthApplication) -> Result<()> {
        let mut clients = self.clients.lock().map_err(lock_error)?;
        match clients.get_mut(&app.client_id) {
            Some(existing) => {
                *existing = app.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(format!("OAuth client {}", app.client_id))),
        }
    }

    async fn delete(&self, client_id: &str) -> Result<()> {
        let mut clients = self.clients.lock().map_err(lock_error)?;
        clients
            .remove(client_id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("OAuth client {}", client_id)))
    }
}
