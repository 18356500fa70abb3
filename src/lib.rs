//! Key manager library crate.
//!
//! Registers OAuth applications as a service provider paired with an OAuth
//! client, and keeps gateway-declared scopes in step with the scope, API
//! resource and role registries of the identity server.

pub mod config;
pub mod dcr;
pub mod errors;
pub mod http;
pub mod scopes;
pub mod storage;
