//! Axum HTTP surface for application registration and scope management.

pub mod context;
mod handler_applications;
mod handler_scopes;
pub mod middleware_auth;
pub mod server;

pub use context::AppState;
pub use handler_scopes::SyncScopesRequest;
pub use middleware_auth::{AUTHENTICATED_USER_HEADER, ExtractedCaller};
pub use server::build_router;
