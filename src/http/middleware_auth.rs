//! Caller identity extraction.
//!
//! Authentication happens at the fronting gateway, which forwards the
//! authenticated username in a request header. The tenant is the one this
//! deployment is configured for.

use axum::extract::{FromRef, FromRequestParts};
use http::request::Parts;

use crate::dcr::types::CallerContext;
use crate::errors::HttpError;
use crate::http::AppState;

/// Header carrying the authenticated username
pub const AUTHENTICATED_USER_HEADER: &str = "x-authenticated-user";

/// Authenticated caller extractor for the management endpoints
///
/// ```ignore
/// async fn handler(ExtractedCaller(caller): ExtractedCaller) -> String {
///     format!("{}@{}", caller.username, caller.tenant_domain)
/// }
/// ```
#[derive(Clone, Debug)]
pub struct ExtractedCaller(pub CallerContext);

impl<S> FromRequestParts<S> for ExtractedCaller
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let username = parts
            .headers
            .get(AUTHENTICATED_USER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(HttpError::MissingCaller)?;

        Ok(ExtractedCaller(CallerContext::new(
            username,
            &app_state.config.tenant_domain,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::Stores;
    use std::sync::Arc;

    fn app_state() -> AppState {
        let config = Config::for_tenant("wso2.com").expect("config");
        AppState::new(Arc::new(config), Stores::in_memory())
    }

    #[tokio::test]
    async fn test_caller_from_header() {
        let request = http::Request::builder()
            .header(AUTHENTICATED_USER_HEADER, "alice")
            .body(())
            .expect("request");
        let (mut parts, _) = request.into_parts();

        let ExtractedCaller(caller) = ExtractedCaller::from_request_parts(&mut parts, &app_state())
            .await
            .expect("caller");
        assert_eq!(caller.username, "alice");
        assert_eq!(caller.tenant_domain, "wso2.com");
    }

    #[tokio::test]
    async fn test_missing_caller_rejected() {
        let request = http::Request::builder()
            .header(AUTHENTICATED_USER_HEADER, "  ")
            .body(())
            .expect("request");
        let (mut parts, _) = request.into_parts();

        let result = ExtractedCaller::from_request_parts(&mut parts, &app_state()).await;
        assert!(matches!(result, Err(HttpError::MissingCaller)));
    }
}
