//! Dynamic client registration of paired service provider and OAuth client records.

pub mod authorization;
pub mod policy;
pub mod registration;
pub mod types;
pub mod uri_validator;

pub use authorization::OwnerOrAdminAuthorizationChecker;
pub use registration::RegistrationService;
