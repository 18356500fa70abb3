//! Scope registration and scope-to-role synchronization.

pub mod attachment;
pub mod role_binding;
pub mod synchronizer;
pub mod types;

pub use attachment::{NoopResourceAttachment, ResourceScopeAttachment};
pub use role_binding::RoleBindingManager;
pub use synchronizer::ScopeSynchronizer;
