//! In-memory storage implementations
//!
//! This module provides in-memory implementations of all storage traits.
//! These implementations are suitable for development and testing.

mod identity;
mod scopes;

pub use identity::{MemoryOAuthClientStore, MemoryServiceProviderStore};
pub use scopes::{MemoryApiResourceContainer, MemoryRoleRegistry, MemoryScopeRegistry};
