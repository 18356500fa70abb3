//! Main router configuration assembling the application and scope endpoints.

use axum::{
    Router,
    http::{HeaderName, Method, header},
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::{
    context::AppState,
    handler_applications::{
        delete_application_handler, get_application_handler, register_application_handler,
        update_application_handler,
    },
    handler_scopes::{get_scope_handler, list_scopes_handler, sync_scopes_handler},
    middleware_auth::AUTHENTICATED_USER_HEADER,
};

/// Build the application router
pub fn build_router(ctx: AppState) -> Router {
    let mut api_routes = Router::new();

    if *ctx.config.enable_registration_api.as_ref() {
        api_routes = api_routes
            .route("/applications", post(register_application_handler))
            .route(
                "/applications/{client_id}",
                get(get_application_handler)
                    .put(update_application_handler)
                    .delete(delete_application_handler),
            );
    }

    if *ctx.config.enable_scope_api.as_ref() {
        api_routes = api_routes
            .route("/scopes", get(list_scopes_handler))
            .route("/scopes/sync", post(sync_scopes_handler))
            .route("/scopes/{key}", get(get_scope_handler));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(AUTHENTICATED_USER_HEADER),
        ]);

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
