//! Attach and detach hooks for resource-to-scope associations.

use async_trait::async_trait;

use crate::errors::ScopeSyncError;
use crate::scopes::types::UriTemplate;

/// Associates API resource paths with scopes on the authorization server.
///
/// Both hooks do nothing unless overridden.
#[async_trait]
pub trait ResourceScopeAttachment: Send + Sync {
    async fn attach(&self, _uri_templates: &[UriTemplate]) -> Result<(), ScopeSyncError> {
        Ok(())
    }

    async fn detach(&self, _uri_templates: &[UriTemplate]) -> Result<(), ScopeSyncError> {
        Ok(())
    }
}

/// Attachment that leaves resource paths untouched
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResourceAttachment;

impl ResourceScopeAttachment for NoopResourceAttachment {}
