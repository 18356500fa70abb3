//! Handles /api/applications - application registration, lookup, update and removal

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
};
use serde_json::{Value, json};
use tracing::error;

use crate::{
    dcr::types::{Application, RegistrationRequest, UpdateRequest},
    errors::{ErrorKind, RegistrationError},
    http::{context::AppState, middleware_auth::ExtractedCaller},
};

type HandlerError = (StatusCode, ResponseJson<Value>);

/// Map a registration failure to its status and error body
pub(crate) fn registration_error_response(e: RegistrationError) -> HandlerError {
    let kind = e.kind();
    let description = if kind == ErrorKind::Server {
        error!(error = ?e, "Application request failed");
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

pub async fn register_application_handler(
    State(state): State<AppState>,
    ExtractedCaller(caller): ExtractedCaller,
    Json(request): Json<RegistrationRequest>,
) -> Result<(StatusCode, ResponseJson<Application>), HandlerError> {
    state
        .registration_service
        .register_application(request, &caller)
        .await
        .map(|application| (StatusCode::CREATED, ResponseJson(application)))
        .map_err(registration_error_response)
}

pub async fn get_application_handler(
    State(state): State<AppState>,
    ExtractedCaller(caller): ExtractedCaller,
    Path(client_id): Path<String>,
) -> Result<ResponseJson<Application>, HandlerError> {
    state
        .registration_service
        .get_application(&client_id, &caller)
        .await
        .map(ResponseJson)
        .map_err(registration_error_response)
}

pub async fn update_application_handler(
    State(state): State<AppState>,
    ExtractedCaller(caller): ExtractedCaller,
    Path(client_id): Path<String>,
    Json(request): Json<UpdateRequest>,
) -> Result<ResponseJson<Application>, HandlerError> {
    state
        .registration_service
        .update_application(request, &client_id, &caller)
        .await
        .map(ResponseJson)
        .map_err(registration_error_response)
}

pub async fn delete_application_handler(
    State(state): State<AppState>,
    ExtractedCaller(caller): ExtractedCaller,
    Path(client_id): Path<String>,
) -> Result<StatusCode, HandlerError> {
    state
        .registration_service
        .delete_application(&client_id, &caller)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(registration_error_response)
}
