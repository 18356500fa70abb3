//! Handles /api/scopes - scope synchronization and legacy scope lookups

use std::collections::BTreeMap;

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::{
    errors::{ErrorKind, ScopeSyncError},
    http::{context::AppState, middleware_auth::ExtractedCaller},
    scopes::types::{Scope, UriTemplate},
};

type HandlerError = (StatusCode, ResponseJson<Value>);

/// Scope set replacing a previously published one
#[derive(Debug, Default, Deserialize)]
pub struct SyncScopesRequest {
    #[serde(default)]
    pub old_scope_keys: Vec<String>,
    #[serde(default)]
    pub new_scopes: Vec<Scope>,
    #[serde(default)]
    pub old_uri_templates: Vec<UriTemplate>,
    #[serde(default)]
    pub new_uri_templates: Vec<UriTemplate>,
}

fn scope_error_response(e: ScopeSyncError) -> HandlerError {
    let kind = e.kind();
    let description = if kind == ErrorKind::Server {
        error!(error = ?e, "Scope request failed");
        "Internal server error".to_string()
    } else {
        e.to_string()
    };

    (
        kind.status_code(),
        ResponseJson(json!({
            "error": e.code(),
            "error_description": description
        })),
    )
}

pub async fn sync_scopes_handler(
    State(state): State<AppState>,
    ExtractedCaller(caller): ExtractedCaller,
    Json(request): Json<SyncScopesRequest>,
) -> Result<StatusCode, HandlerError> {
    debug!(
        username = %caller.username,
        removed = request.old_scope_keys.len(),
        added = request.new_scopes.len(),
        "Synchronizing scopes"
    );

    state
        .scope_synchronizer
        .synchronize(
            &request.old_scope_keys,
            &request.new_scopes,
            &request.old_uri_templates,
            &request.new_uri_templates,
        )
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(scope_error_response)
}

pub async fn list_scopes_handler(
    State(state): State<AppState>,
    ExtractedCaller(_caller): ExtractedCaller,
) -> Result<ResponseJson<BTreeMap<String, Scope>>, HandlerError> {
    state
        .scope_synchronizer
        .get_all_scopes()
        .await
        .map(ResponseJson)
        .map_err(scope_error_response)
}

pub async fn get_scope_handler(
    State(state): State<AppState>,
    ExtractedCaller(_caller): ExtractedCaller,
    Path(key): Path<String>,
) -> Result<ResponseJson<Scope>, HandlerError> {
    state
        .scope_synchronizer
        .get_scope(&key)
        .await
        .map(ResponseJson)
        .map_err(scope_error_response)
}
