//! Client assertion signing.
//!
//! Produces the short-lived RS256 JWT a confidential client presents to an
//! OAuth2 token endpoint (`private_key_jwt` client authentication).

use std::sync::Arc;

use chrono::Utc;
use error_stack::{Report, ResultExt};
use jsonwebtoken::{encode, Algorithm, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AssertionIssuerError;
use crate::settings::Settings;

use super::keys::KeyProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAssertionClaims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    /// Expiry in whole seconds since the Unix epoch.
    pub exp: i64,
    /// Single-use token identifier.
    pub jti: String,
}

impl ClientAssertionClaims {
    /// Builds claims issued at `issued_at` (seconds since epoch) with a fresh
    /// random `jti`.
    #[must_use]
    pub fn new(client_id: &str, token_url: &str, issued_at: i64, ttl_seconds: u64) -> Self {
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);

        Self {
            iss: client_id.to_string(),
            sub: client_id.to_string(),
            aud: token_url.to_string(),
            exp: issued_at.saturating_add(ttl),
            jti: Uuid::new_v4().to_string(),
        }
    }
}

pub struct AssertionSigner {
    provider: Arc<KeyProvider>,
    client_id: String,
    token_url: String,
    ttl_seconds: u64,
}

impl AssertionSigner {
    #[must_use]
    pub fn new(settings: &Settings, provider: Arc<KeyProvider>) -> Self {
        Self {
            provider,
            client_id: settings.client_id.clone(),
            token_url: settings.token_url.clone(),
            ttl_seconds: settings.assertion_ttl_seconds,
        }
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        self.provider.key_id()
    }

    /// Signs a fresh client assertion with the provider's current key.
    ///
    /// The private key is fetched on every call; nothing is cached.
    ///
    /// # Errors
    ///
    /// Propagates key provider errors unchanged, and returns a signing error
    /// if token encoding fails.
    pub fn generate_client_assertion(&self) -> Result<String, Report<AssertionIssuerError>> {
        let claims = ClientAssertionClaims::new(
            &self.client_id,
            &self.token_url,
            Utc::now().timestamp(),
            self.ttl_seconds,
        );

        self.sign_claims(&claims)
    }

    /// Signs `claims` as an RS256 JWT with the configured `kid` in the header.
    ///
    /// # Errors
    ///
    /// Propagates key provider errors unchanged, and returns a signing error
    /// if token encoding fails.
    pub fn sign_claims(
        &self,
        claims: &ClientAssertionClaims,
    ) -> Result<String, Report<AssertionIssuerError>> {
        let key = self.provider.private_key()?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.provider.key_id().to_string());

        let token = encode(&header, claims, &key).change_context(AssertionIssuerError::Signing {
            message: "Failed to sign client assertion".into(),
        })?;

        log::debug!(
            "Signed client assertion jti={} kid={} exp={}",
            claims.jti,
            self.provider.key_id(),
            claims.exp
        );
        Ok(token)
    }
}
