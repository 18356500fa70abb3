//! Redirect and backchannel logout URI validation.
//!
//! Several redirect URIs are stored as one callback value: an alternation
//! pattern marked with [`CALLBACK_URL_REGEXP_PREFIX`] so that the
//! authorization server matches it as a regex instead of a literal.

use url::Url;

use crate::errors::RegistrationError;

/// Marker prefix of a callback value that holds a regex
pub const CALLBACK_URL_REGEXP_PREFIX: &str = "regexp=";

const AUTHORIZATION_CODE: &str = "authorization_code";
const IMPLICIT: &str = "implicit";

/// Encode redirect URIs into the stored callback value.
///
/// No URIs encode to an empty string unless one of `grant_types` needs a
/// redirect. One URI is stored literally. Two or more become
/// `regexp=(uri1|uri2|...)` in the order given.
pub fn encode_redirect_uris(
    redirect_uris: &[String],
    grant_types: &[String],
) -> Result<String, RegistrationError> {
    match redirect_uris {
        [] => {
            if is_redirect_uri_mandatory(grant_types) {
                Err(RegistrationError::RedirectUriRequired)
            } else {
                Ok(String::new())
            }
        }
        [single] => {
            if is_redirection_uri_valid(single) {
                Ok(single.clone())
            } else {
                Err(RegistrationError::InvalidRedirectUri(single.clone()))
            }
        }
        many => {
            if let Some(invalid) = many.iter().find(|uri| !is_redirection_uri_valid(uri)) {
                return Err(RegistrationError::InvalidRedirectUri(invalid.clone()));
            }
            Ok(format!(
                "{}({})",
                CALLBACK_URL_REGEXP_PREFIX,
                many.join("|")
            ))
        }
    }
}

/// Validate an optional backchannel logout URI; absent or empty values pass.
pub fn validate_backchannel_logout_uri(
    uri: Option<&str>,
) -> Result<Option<String>, RegistrationError> {
    match uri {
        None => Ok(None),
        Some(value) if value.is_empty() => Ok(Some(String::new())),
        Some(value) if is_redirection_uri_valid(value) => Ok(Some(value.to_string())),
        Some(value) => Err(RegistrationError::InvalidBackchannelLogoutUri(
            value.to_string(),
        )),
    }
}

/// Whether any grant type needs at least one redirect URI
pub fn is_redirect_uri_mandatory(grant_types: &[String]) -> bool {
    grant_types
        .iter()
        .any(|grant| grant == AUTHORIZATION_CODE || grant == IMPLICIT)
}

/// Absolute URI with a scheme
fn is_redirection_uri_valid(uri: &str) -> bool {
    !uri.trim().is_empty() && Url::parse(uri).is_ok()
}
