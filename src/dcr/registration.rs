//! Application registration across the service provider and OAuth client
//! directories.
//!
//! An application is a service provider paired with an OAuth client. The two
//! live in independent stores, so creation runs as a sequence of steps where
//! a failure undoes the steps already taken and then reports the original
//! error. Undo failures are logged and never replace that error.

use std::sync::Arc;
use tracing::{debug, error};

use crate::dcr::policy::{ApplicationNamePolicy, ClientIdPolicy};
use crate::dcr::types::*;
use crate::dcr::uri_validator::{encode_redirect_uris, validate_backchannel_logout_uri};
use crate::errors::{RegistrationError, StorageError, StoreOperation};
use crate::storage::traits::{AuthorizationChecker, OAuthClientStore, ServiceProviderStore};

type Result<T> = std::result::Result<T, RegistrationError>;

/// Application Registration Service
pub struct RegistrationService {
    service_providers: Arc<dyn ServiceProviderStore>,
    oauth_clients: Arc<dyn OAuthClientStore>,
    authorization: Arc<dyn AuthorizationChecker>,
    name_policy: ApplicationNamePolicy,
    client_id_policy: ClientIdPolicy,
}

impl RegistrationService {
    pub fn new(
        service_providers: Arc<dyn ServiceProviderStore>,
        oauth_clients: Arc<dyn OAuthClientStore>,
        authorization: Arc<dyn AuthorizationChecker>,
        name_policy: ApplicationNamePolicy,
        client_id_policy: ClientIdPolicy,
    ) -> Self {
        Self {
            service_providers,
            oauth_clients,
            authorization,
            name_policy,
            client_id_policy,
        }
    }

    /// Register a new application.
    ///
    /// Creates the service provider, then the OAuth client, then links the
    /// client to the service provider. A failed client creation deletes the
    /// service provider; a failed link deletes both.
    pub async fn register_application(
        &self,
        request: RegistrationRequest,
        caller: &CallerContext,
    ) -> Result<Application> {
        let tenant_domain = caller.tenant_domain.as_str();
        let owner = request
            .application_owner
            .clone()
            .filter(|owner| !owner.is_empty())
            .unwrap_or_else(|| caller.username.clone());
        let sp_name = request.client_name.clone();

        if sp_name.is_empty() {
            return Err(RegistrationError::InvalidInput(
                "client_name is required".to_string(),
            ));
        }
        self.name_policy.validate(&sp_name)?;

        if self.is_service_provider_exist(&sp_name, tenant_domain).await {
            return Err(RegistrationError::ApplicationExists(sp_name));
        }

        if let Some(consumer_key) = non_empty(&request.consumer_key) {
            if self.is_client_id_exist(consumer_key).await? {
                return Err(RegistrationError::ClientIdExists(consumer_key.to_string()));
            }
        }

        let service_provider = self
            .create_service_provider(
                &owner,
                tenant_domain,
                &sp_name,
                request.sp_template_name.as_deref(),
            )
            .await?;

        let created = match self
            .create_oauth_application(&request, &owner, tenant_domain, &sp_name)
            .await
        {
            Ok(created) => created,
            Err(err) => {
                debug!(
                    application = %sp_name,
                    tenant = %tenant_domain,
                    "OAuth application registration failed, deleting service provider to roll back"
                );
                if let Err(rollback) = self
                    .service_providers
                    .delete(&sp_name, tenant_domain, &owner)
                    .await
                {
                    error!(
                        application = %sp_name,
                        tenant = %tenant_domain,
                        error = ?rollback,
                        "Failed to delete service provider during rollback"
                    );
                }
                return Err(err);
            }
        };

        if let Err(err) = self
            .link_service_provider(service_provider, &created, &owner, tenant_domain)
            .await
        {
            debug!(
                application = %sp_name,
                client_id = %created.client_id,
                "Linking OAuth application failed, deleting application to roll back"
            );
            if let Err(rollback) = self
                .remove_application(&created.client_id, &sp_name, tenant_domain, &owner)
                .await
            {
                error!(
                    application = %sp_name,
                    client_id = %created.client_id,
                    error = ?rollback,
                    "Failed to delete application during rollback"
                );
            }
            return Err(err);
        }

        Ok(Application::from(&created))
    }

    /// Get an application the caller is authorized for
    pub async fn get_application(
        &self,
        client_id: &str,
        caller: &CallerContext,
    ) -> Result<Application> {
        let app = self.get_application_by_id(client_id, caller).await?;
        Ok(Application::from(&app))
    }

    /// Update an application.
    ///
    /// Only fields that are present and non-empty are written. A rename is
    /// persisted on the service provider before the OAuth client is stored,
    /// so a later validation failure leaves the service provider renamed.
    pub async fn update_application(
        &self,
        request: UpdateRequest,
        client_id: &str,
        caller: &CallerContext,
    ) -> Result<Application> {
        let mut app = self.get_application_by_id(client_id, caller).await?;
        let tenant_domain = caller.tenant_domain.as_str();

        let client_name = non_empty(&request.client_name);
        if let Some(client_name) = client_name {
            self.name_policy.validate(client_name)?;

            let mut sp = self
                .get_service_provider(&app.application_name, tenant_domain)
                .await?
                .ok_or_else(|| RegistrationError::ApplicationNotFound(client_id.to_string()))?;
            let owner = request
                .application_owner
                .clone()
                .filter(|owner| !owner.is_empty())
                .unwrap_or_else(|| sp.owner.username.clone());

            sp.name = client_name.to_string();
            self.service_providers
                .update(&sp, tenant_domain, &owner)
                .await
                .map_err(|e| {
                    RegistrationError::server(
                        StoreOperation::UpdateServiceProvider,
                        client_name,
                        e,
                    )
                })?;

            app.application_name = client_name.to_string();
        }

        let requested_grant_types = request
            .grant_types
            .as_deref()
            .filter(|grant_types| !grant_types.is_empty());
        if let Some(grant_types) = requested_grant_types {
            app.grant_types = grant_types.join(GRANT_TYPE_SEPARATOR);
        }

        if let Some(redirect_uris) = request
            .redirect_uris
            .as_deref()
            .filter(|redirect_uris| !redirect_uris.is_empty())
        {
            // Requested grant types win over the stored ones for the mandatory check.
            let grant_types: Vec<String> = match requested_grant_types {
                Some(grant_types) => grant_types.to_vec(),
                None => app
                    .grant_types
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            };
            app.callback_url = encode_redirect_uris(redirect_uris, &grant_types)?;
        }

        if let Some(token_type) = request.token_type {
            app.token_type = Some(token_type);
        }

        if let Some(uri) = non_empty(&request.backchannel_logout_uri) {
            app.backchannel_logout_url = validate_backchannel_logout_uri(Some(uri))?;
        }

        self.oauth_clients.update(&app).await.map_err(|e| {
            RegistrationError::server(StoreOperation::UpdateApplication, client_id, e)
        })?;

        self.get_application(client_id, caller).await
    }

    /// Delete an application: the OAuth client first, then its service provider
    pub async fn delete_application(&self, client_id: &str, caller: &CallerContext) -> Result<()> {
        let app = self.get_application_by_id(client_id, caller).await?;
        let tenant_domain = caller.tenant_domain.as_str();

        let sp_name = self
            .service_providers
            .get_name_by_client_id(client_id, tenant_domain)
            .await
            .map_err(|e| {
                RegistrationError::server(StoreOperation::GetServiceProvider, client_id, e)
            })?
            .unwrap_or(app.application_name);

        self.remove_application(client_id, &sp_name, tenant_domain, &caller.username)
            .await
    }

    async fn get_application_by_id(
        &self,
        client_id: &str,
        caller: &CallerContext,
    ) -> Result<OAuthApplication> {
        if client_id.is_empty() {
            return Err(RegistrationError::InvalidInput(
                "Invalid client_id".to_string(),
            ));
        }

        let app = match self.oauth_clients.get_by_client_id(client_id).await {
            Ok(app) => app,
            Err(StorageError::NotFound(_)) => None,
            Err(e) => {
                return Err(RegistrationError::server(
                    StoreOperation::GetApplication,
                    client_id,
                    e,
                ));
            }
        };

        let app = app
            .filter(|app| !app.application_name.is_empty())
            .ok_or_else(|| RegistrationError::ApplicationNotFound(client_id.to_string()))?;

        if !self.is_user_authorized(client_id, caller).await? {
            return Err(RegistrationError::Forbidden(client_id.to_string()));
        }

        Ok(app)
    }

    async fn is_user_authorized(&self, client_id: &str, caller: &CallerContext) -> Result<bool> {
        let sp_name = self
            .service_providers
            .get_name_by_client_id(client_id, &caller.tenant_domain)
            .await
            .map_err(|e| RegistrationError::server(StoreOperation::GetApplication, client_id, e))?;

        let Some(sp_name) = sp_name else {
            return Ok(false);
        };

        self.authorization
            .is_authorized(&sp_name, caller)
            .await
            .map_err(|e| RegistrationError::server(StoreOperation::GetApplication, client_id, e))
    }

    async fn is_service_provider_exist(&self, sp_name: &str, tenant_domain: &str) -> bool {
        match self.get_service_provider(sp_name, tenant_domain).await {
            Ok(sp) => sp.is_some(),
            Err(err) => {
                error!(
                    application = %sp_name,
                    tenant = %tenant_domain,
                    error = ?err,
                    "Error while retrieving service provider"
                );
                false
            }
        }
    }

    async fn is_client_id_exist(&self, client_id: &str) -> Result<bool> {
        match self.oauth_clients.get_by_client_id(client_id).await {
            Ok(app) => Ok(app.is_some_and(|app| !app.application_name.trim().is_empty())),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(RegistrationError::server(
                StoreOperation::GetApplication,
                client_id,
                e,
            )),
        }
    }

    async fn get_service_provider(
        &self,
        sp_name: &str,
        tenant_domain: &str,
    ) -> Result<Option<ServiceProvider>> {
        self.service_providers
            .get_by_name(sp_name, tenant_domain)
            .await
            .map_err(|e| RegistrationError::server(StoreOperation::GetServiceProvider, sp_name, e))
    }

    async fn create_service_provider(
        &self,
        owner: &str,
        tenant_domain: &str,
        sp_name: &str,
        template: Option<&str>,
    ) -> Result<ServiceProvider> {
        if let Some(template) = template {
            let exists = self
                .service_providers
                .is_existing_template(template, tenant_domain)
                .await
                .map_err(|e| {
                    RegistrationError::server(
                        StoreOperation::CheckServiceProviderTemplate,
                        sp_name,
                        e,
                    )
                })?;
            if !exists {
                return Err(RegistrationError::InvalidTemplate(template.to_string()));
            }
        }

        let sp = ServiceProvider::for_application(sp_name, owner, tenant_domain);
        self.service_providers
            .create(&sp, tenant_domain, owner, template)
            .await
            .map_err(|e| {
                RegistrationError::server(StoreOperation::RegisterServiceProvider, sp_name, e)
            })?;

        self.get_service_provider(sp_name, tenant_domain)
            .await?
            .ok_or_else(|| RegistrationError::ServiceProviderNotRegistered(sp_name.to_string()))
    }

    async fn create_oauth_application(
        &self,
        request: &RegistrationRequest,
        owner: &str,
        tenant_domain: &str,
        sp_name: &str,
    ) -> Result<OAuthApplication> {
        let callback_url = encode_redirect_uris(&request.redirect_uris, &request.grant_types)?;
        let backchannel_logout_url =
            validate_backchannel_logout_uri(request.backchannel_logout_uri.as_deref())?;

        let client_id = match non_empty(&request.consumer_key) {
            Some(consumer_key) => {
                self.client_id_policy.validate(consumer_key)?;
                Some(consumer_key.to_string())
            }
            None => None,
        };

        let draft = OAuthApplicationDraft {
            client_id,
            client_secret: non_empty(&request.consumer_secret).map(str::to_string),
            application_name: sp_name.to_string(),
            username: owner.to_string(),
            callback_url,
            grant_types: request.grant_types.join(GRANT_TYPE_SEPARATOR),
            oauth_version: OAUTH_VERSION_2.to_string(),
            token_type: request.token_type.clone(),
            backchannel_logout_url,
        };

        debug!(application = %sp_name, tenant = %tenant_domain, "Creating OAuth application");

        let created = self
            .oauth_clients
            .create(&draft)
            .await
            .map_err(|e| RegistrationError::server(StoreOperation::RegisterApplication, sp_name, e))?
            .ok_or_else(|| RegistrationError::MissingRecord {
                operation: StoreOperation::RegisterApplication,
                subject: sp_name.to_string(),
            })?;

        debug!(
            application = %sp_name,
            tenant = %tenant_domain,
            client_id = %created.client_id,
            "Created OAuth application"
        );

        Ok(created)
    }

    async fn link_service_provider(
        &self,
        mut sp: ServiceProvider,
        created: &OAuthApplication,
        owner: &str,
        tenant_domain: &str,
    ) -> Result<()> {
        sp.inbound_auth = Some(InboundAuthConfig {
            key: created.client_id.clone(),
            auth_type: INBOUND_AUTH_TYPE_OAUTH2.to_string(),
        });
        sp.saas_app = false;

        self.service_providers
            .update(&sp, tenant_domain, owner)
            .await
            .map_err(|e| RegistrationError::server(StoreOperation::UpdateServiceProvider, &sp.name, e))
    }

    /// Delete the OAuth client and then the service provider, without authorization checks
    async fn remove_application(
        &self,
        client_id: &str,
        sp_name: &str,
        tenant_domain: &str,
        owner: &str,
    ) -> Result<()> {
        self.oauth_clients.delete(client_id).await.map_err(|e| {
            RegistrationError::server(StoreOperation::DeleteApplication, client_id, e)
        })?;

        self.service_providers
            .delete(sp_name, tenant_domain, owner)
            .await
            .map_err(|e| {
                RegistrationError::server(StoreOperation::DeleteServiceProvider, client_id, e)
            })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dcr::authorization::OwnerOrAdminAuthorizationChecker;
    use crate::errors::ErrorKind;
    use crate::storage::inmemory::{MemoryOAuthClientStore, MemoryServiceProviderStore};

    struct Fixture {
        service_providers: Arc<MemoryServiceProviderStore>,
        oauth_clients: Arc<MemoryOAuthClientStore>,
        service: RegistrationService,
    }

    fn fixture() -> Fixture {
        let service_providers = Arc::new(MemoryServiceProviderStore::new());
        let oauth_clients = Arc::new(MemoryOAuthClientStore::new());
        let authorization = Arc::new(OwnerOrAdminAuthorizationChecker::new(
            service_providers.clone(),
            vec!["admin".to_string()],
        ));
        let service = RegistrationService::new(
            service_providers.clone(),
            oauth_clients.clone(),
            authorization,
            ApplicationNamePolicy::new(r"^[a-zA-Z0-9\s.+_-]*$".to_string().try_into().unwrap()),
            ClientIdPolicy::new(r"^[a-zA-Z0-9_]{15,30}$".to_string().try_into().unwrap()),
        );
        Fixture {
            service_providers,
            oauth_clients,
            service,
        }
    }

    fn alice() -> CallerContext {
        CallerContext::new("alice", "carbon.super")
    }

    fn reporting_app() -> RegistrationRequest {
        RegistrationRequest {
            client_name: "reporting-app".to_string(),
            grant_types: vec!["client_credentials".to_string()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_register_client_credentials_application() {
        let f = fixture();
        let app = f
            .service
            .register_application(reporting_app(), &alice())
            .await
            .unwrap();

        assert_eq!(app.client_name, "reporting-app");
        assert_eq!(app.redirect_uris, vec!["".to_string()]);
        assert_eq!(app.grant_types, vec!["client_credentials".to_string()]);
        assert!(app.client_secret.is_some());

        let sp = f
            .service_providers
            .get_by_name("reporting-app", "carbon.super")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sp.linked_client_id(), Some(app.client_id.as_str()));
        assert_eq!(sp.owner.username, "alice");
        assert!(!sp.saas_app);

        let stored = f
            .oauth_clients
            .get_by_client_id(&app.client_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.oauth_version, "OAuth-2.0");
        assert_eq!(stored.username, "alice");
    }

    #[tokio::test]
    async fn test_register_with_owner_and_preset_credentials() {
        let f = fixture();
        let request = RegistrationRequest {
            application_owner: Some("bob".to_string()),
            grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
            redirect_uris: vec!["https://a/cb".to_string(), "https://b/cb".to_string()],
            consumer_key: Some("preset_client_id_01".to_string()),
            consumer_secret: Some("preset-secret".to_string()),
            ..reporting_app()
        };

        let app = f
            .service
            .register_application(request, &CallerContext::new("admin", "carbon.super"))
            .await
            .unwrap();

        assert_eq!(app.client_id, "preset_client_id_01");
        assert_eq!(app.client_secret.as_deref(), Some("preset-secret"));
        assert_eq!(app.redirect_uris, vec!["regexp=(https://a/cb|https://b/cb)".to_string()]);
        assert_eq!(app.grant_types, vec!["authorization_code refresh_token".to_string()]);

        let sp = f
            .service_providers
            .get_by_name("reporting-app", "carbon.super")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sp.owner.username, "bob");
    }

    #[tokio::test]
    async fn test_register_conflicts() {
        let f = fixture();
        let request = RegistrationRequest {
            consumer_key: Some("preset_client_id_01".to_string()),
            ..reporting_app()
        };
        f.service
            .register_application(request.clone(), &alice())
            .await
            .unwrap();

        let err = f
            .service
            .register_application(request, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ApplicationExists(_)));

        let other_name = RegistrationRequest {
            client_name: "billing-app".to_string(),
            consumer_key: Some("preset_client_id_01".to_string()),
            ..reporting_app()
        };
        let err = f
            .service
            .register_application(other_name, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::ClientIdExists(_)));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(f.service_providers.count("carbon.super").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_name_before_any_write() {
        let f = fixture();
        let request = RegistrationRequest {
            client_name: "My App!!".to_string(),
            ..reporting_app()
        };

        let err = f
            .service
            .register_application(request, &alice())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Client);
        assert_eq!(err.code(), "invalid_client_name");
        assert_eq!(f.service_providers.count("carbon.super").unwrap(), 0);
        assert_eq!(f.oauth_clients.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_register_redirect_failure_removes_service_provider() {
        let f = fixture();
        let request = RegistrationRequest {
            grant_types: vec!["authorization_code".to_string()],
            ..reporting_app()
        };

        let err = f
            .service
            .register_application(request, &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::RedirectUriRequired));
        assert!(
            f.service_providers
                .get_by_name("reporting-app", "carbon.super")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_register_unknown_template() {
        let f = fixture();
        let request = RegistrationRequest {
            sp_template_name: Some("mobile".to_string()),
            ..reporting_app()
        };

        let err = f
            .service
            .register_application(request, &alice())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_sp_template");
        assert_eq!(f.service_providers.count("carbon.super").unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_is_additive() {
        let f = fixture();
        let created = f
            .service
            .register_application(reporting_app(), &alice())
            .await
            .unwrap();

        let updated = f
            .service
            .update_application(
                UpdateRequest {
                    redirect_uris: Some(vec!["https://a/cb".to_string()]),
                    grant_types: Some(Vec::new()),
                    ..Default::default()
                },
                &created.client_id,
                &alice(),
            )
            .await
            .unwrap();

        assert_eq!(updated.client_name, "reporting-app");
        assert_eq!(updated.redirect_uris, vec!["https://a/cb".to_string()]);
        assert_eq!(updated.grant_types, created.grant_types);
        assert_eq!(updated.client_secret, created.client_secret);
    }

    #[tokio::test]
    async fn test_update_renames_service_provider() {
        let f = fixture();
        let created = f
            .service
            .register_application(reporting_app(), &alice())
            .await
            .unwrap();

        let updated = f
            .service
            .update_application(
                UpdateRequest {
                    client_name: Some("billing-app".to_string()),
                    token_type: Some("JWT".to_string()),
                    ..Default::default()
                },
                &created.client_id,
                &alice(),
            )
            .await
            .unwrap();
        assert_eq!(updated.client_name, "billing-app");

        let sp = f
            .service_providers
            .get_by_name("billing-app", "carbon.super")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sp.owner.username, "alice");
        assert_eq!(sp.linked_client_id(), Some(created.client_id.as_str()));

        let stored = f
            .oauth_clients
            .get_by_client_id(&created.client_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.token_type.as_deref(), Some("JWT"));
    }

    #[tokio::test]
    async fn test_get_checks_existence_and_authorization() {
        let f = fixture();
        let created = f
            .service
            .register_application(reporting_app(), &alice())
            .await
            .unwrap();

        let err = f.service.get_application("", &alice()).await.unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let err = f
            .service
            .get_application("missing", &alice())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = f
            .service
            .get_application(&created.client_id, &CallerContext::new("mallory", "carbon.super"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);

        let app = f
            .service
            .get_application(&created.client_id, &CallerContext::new("admin", "carbon.super"))
            .await
            .unwrap();
        assert_eq!(app, created);
    }

    #[tokio::test]
    async fn test_delete_removes_both_records() {
        let f = fixture();
        let created = f
            .service
            .register_application(reporting_app(), &alice())
            .await
            .unwrap();

        f.service
            .delete_application(&created.client_id, &alice())
            .await
            .unwrap();

        assert_eq!(f.oauth_clients.count().unwrap(), 0);
        assert_eq!(f.service_providers.count("carbon.super").unwrap(), 0);

        let err = f
            .service
            .delete_application(&created.client_id, &alice())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
