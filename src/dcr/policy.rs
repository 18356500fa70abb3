//! Naming policies for application names and preset client identifiers.

use crate::config::{ApplicationNamePattern, ClientIdPattern};
use crate::errors::RegistrationError;

/// Validates requested application names
#[derive(Clone, Debug)]
pub struct ApplicationNamePolicy {
    pattern: ApplicationNamePattern,
}

impl ApplicationNamePolicy {
    pub fn new(pattern: ApplicationNamePattern) -> Self {
        Self { pattern }
    }

    pub fn validate(&self, name: &str) -> Result<(), RegistrationError> {
        if self.pattern.as_ref().is_match(name) {
            Ok(())
        } else {
            Err(RegistrationError::InvalidApplicationName(
                self.pattern.pattern().to_string(),
            ))
        }
    }
}

/// Validates caller-supplied client identifiers
#[derive(Clone, Debug)]
pub struct ClientIdPolicy {
    pattern: ClientIdPattern,
}

impl ClientIdPolicy {
    pub fn new(pattern: ClientIdPattern) -> Self {
        Self { pattern }
    }

    pub fn validate(&self, client_id: &str) -> Result<(), RegistrationError> {
        if self.pattern.as_ref().is_match(client_id) {
            Ok(())
        } else {
            Err(RegistrationError::ClientIdViolatesPattern(format!(
                "{} does not match {}",
                client_id,
                self.pattern.pattern()
            )))
        }
    }
}
