//! Default application authorization: the service provider owner and the
//! configured administrators may manage an application.

use async_trait::async_trait;
use std::sync::Arc;

use crate::dcr::types::CallerContext;
use crate::storage::traits::{AuthorizationChecker, Result, ServiceProviderStore};

pub struct OwnerOrAdminAuthorizationChecker {
    service_providers: Arc<dyn ServiceProviderStore>,
    admin_usernames: Vec<String>,
}

impl OwnerOrAdminAuthorizationChecker {
    pub fn new(
        service_providers: Arc<dyn ServiceProviderStore>,
        admin_usernames: Vec<String>,
    ) -> Self {
        Self {
            service_providers,
            admin_usernames,
        }
    }
}

#[async_trait]
impl AuthorizationChecker for OwnerOrAdminAuthorizationChecker {
    async fn is_authorized(
        &self,
        service_provider_name: &str,
        caller: &CallerContext,
    ) -> Result<bool> {
        if self.admin_usernames.iter().any(|admin| admin == &caller.username) {
            return Ok(true);
        }

        let sp = self
            .service_providers
            .get_by_name(service_provider_name, &caller.tenant_domain)
            .await?;
        Ok(sp.is_some_and(|sp| {
            sp.owner.username == caller.username && sp.owner.tenant_domain == caller.tenant_domain
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcr::types::ServiceProvider;
    use crate::storage::inmemory::MemoryServiceProviderStore;

    #[tokio::test]
    async fn test_owner_and_admin_are_authorized() {
        let store = Arc::new(MemoryServiceProviderStore::new());
        let sp = ServiceProvider::for_application("reporting-app", "alice", "carbon.super");
        store.create(&sp, "carbon.super", "alice", None).await.unwrap();

        let checker = OwnerOrAdminAuthorizationChecker::new(store, vec!["admin".to_string()]);

        let owner = CallerContext::new("alice", "carbon.super");
        let admin = CallerContext::new("admin", "carbon.super");
        let other = CallerContext::new("mallory", "carbon.super");

        assert!(checker.is_authorized("reporting-app", &owner).await.unwrap());
        assert!(checker.is_authorized("reporting-app", &admin).await.unwrap());
        assert!(!checker.is_authorized("reporting-app", &other).await.unwrap());
        assert!(!checker.is_authorized("unknown-app", &owner).await.unwrap());
    }
}
