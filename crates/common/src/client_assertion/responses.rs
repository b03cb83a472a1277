//! JSON documents handed to the boundary handlers.
//!
//! The key-set endpoint serves `{ "keys": [ ... ] }` and the assertion
//! endpoint serves `{ "client_assertion": "<jwt>" }`. Handlers only need to
//! write these strings out.

use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};

use crate::error::AssertionIssuerError;

use super::keys::KeyProvider;
use super::signer::AssertionSigner;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientAssertionResponse {
    pub client_assertion: String,
}

/// Serializes the current key set.
///
/// # Errors
///
/// Returns the key provider's error, or a key material error if
/// serialization fails.
pub fn key_set_json(provider: &KeyProvider) -> Result<String, Report<AssertionIssuerError>> {
    let key_set = provider.key_set()?;

    serde_json::to_string(&key_set).change_context(AssertionIssuerError::KeyMaterial {
        message: "Failed to serialize key set".into(),
    })
}

/// Signs a fresh assertion and wraps it in the response document.
///
/// # Errors
///
/// Returns the signer's error, or a signing error if serialization fails.
pub fn client_assertion_json(
    signer: &AssertionSigner,
) -> Result<String, Report<AssertionIssuerError>> {
    let response = ClientAssertionResponse {
        client_assertion: signer.generate_client_assertion()?,
    };

    serde_json::to_string(&response).change_context(AssertionIssuerError::Signing {
        message: "Failed to serialize client assertion response".into(),
    })
}
