//! Key provider and JSON Web Key Set (JWKS) publication.
//!
//! The [`KeyProvider`] owns the single active RSA key pair through an
//! injected [`KeySource`]. It hands out the private key for signing and
//! derives the public key set from the public PEM alone.

use base64::{engine::general_purpose, Engine};
use error_stack::{Report, ResultExt};
use jose_jwk::{
    jose_jwa::{Algorithm, Signing},
    Class, Jwk, JwkSet, Key, Parameters, Rsa,
};
use jsonwebtoken::EncodingKey;
use rsa::traits::PublicKeyParts;

use crate::error::AssertionIssuerError;
use crate::settings::{KeyMode, Settings};

use super::key_source::{key_source_from_settings, KeySource};
use super::material::{parse_public_key, private_key_pkcs1_der, SigningKeyMaterial};

/// Base64 values for moving a key pair into external mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalKeyValues {
    pub private_key_env: String,
    pub private_key_b64: String,
    pub public_key_env: String,
    pub public_key_b64: String,
}

pub struct KeyProvider {
    source: Box<dyn KeySource>,
    key_id: String,
    private_key_env: String,
    public_key_env: String,
}

impl std::fmt::Debug for KeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyProvider")
            .field("mode", &self.source.mode())
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl KeyProvider {
    /// Creates a provider whose key source is selected by `settings.keys.mode`.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let source = key_source_from_settings(&settings.keys);
        log::info!(
            "Key provider using {} key mode with kid {}",
            source.mode(),
            settings.keys.key_id()
        );

        Self {
            source,
            key_id: settings.keys.key_id().to_string(),
            private_key_env: settings.keys.private_key_env.clone(),
            public_key_env: settings.keys.public_key_env.clone(),
        }
    }

    /// Creates a provider over an explicit key source.
    #[must_use]
    pub fn with_source(source: Box<dyn KeySource>, settings: &Settings) -> Self {
        Self {
            source,
            key_id: settings.keys.key_id().to_string(),
            private_key_env: settings.keys.private_key_env.clone(),
            public_key_env: settings.keys.public_key_env.clone(),
        }
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    #[must_use]
    pub fn mode(&self) -> KeyMode {
        self.source.mode()
    }

    /// Startup check: makes the key pair available and verifies that both
    /// halves parse and belong together.
    ///
    /// The host decides whether a failure aborts the process.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when key material is missing, or a key
    /// material error when it is malformed or the halves do not match.
    pub fn initialize(&self) -> Result<(), Report<AssertionIssuerError>> {
        let material = self.key_material()?;
        material
            .verify_pair()
            .attach(format!("while checking key pair for kid {}", self.key_id))?;

        log::info!(
            "Signing key {} ready ({} mode)",
            self.key_id,
            self.source.mode()
        );
        Ok(())
    }

    /// Idempotently makes the key pair available. Generates and persists it
    /// in local mode; only checks presence in external mode.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if external material is absent, or a
    /// key material error if local generation or persistence fails.
    pub fn ensure_key_pair(&self) -> Result<(), Report<AssertionIssuerError>> {
        self.source.ensure_key_pair()
    }

    /// Normalized private key PEM.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key source is missing, or a key
    /// material error if it cannot be read.
    pub fn private_key_pem(&self) -> Result<String, Report<AssertionIssuerError>> {
        self.source.ensure_key_pair()?;
        self.source.private_key_pem()
    }

    /// The current private key, ready for RS256 signing.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key source is missing, or a key
    /// material error if the PEM is malformed.
    pub fn private_key(&self) -> Result<EncodingKey, Report<AssertionIssuerError>> {
        let pem = self.private_key_pem()?;
        let der = private_key_pkcs1_der(&pem)?;

        Ok(EncodingKey::from_rsa_der(&der))
    }

    /// Public JWK for the active key, derived from the public PEM only.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key source is missing, or a key
    /// material error if the public PEM is malformed.
    pub fn public_jwk(&self) -> Result<Jwk, Report<AssertionIssuerError>> {
        self.source.ensure_key_pair()?;
        let pem = self.source.public_key_pem()?;
        let public_key = parse_public_key(&pem)?;

        let rsa = Rsa {
            n: public_key.n().to_bytes_be().into(),
            e: public_key.e().to_bytes_be().into(),
            prv: None,
        };

        Ok(Jwk {
            key: Key::Rsa(rsa),
            prm: Parameters {
                kid: Some(self.key_id.clone()),
                alg: Some(Algorithm::Signing(Signing::Rs256)),
                cls: Some(Class::Signing),
                ..Default::default()
            },
        })
    }

    /// The key set document. Recomputed on every call.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`KeyProvider::public_jwk`].
    pub fn key_set(&self) -> Result<JwkSet, Report<AssertionIssuerError>> {
        let jwk = self.public_jwk()?;

        Ok(JwkSet { keys: vec![jwk] })
    }

    /// Base64 encodings of the normalized key pair, named by the environment
    /// variables external mode reads them from.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`KeyProvider::initialize`].
    pub fn export_env_values(&self) -> Result<ExternalKeyValues, Report<AssertionIssuerError>> {
        let material = self.key_material()?;
        material.verify_pair()?;

        Ok(ExternalKeyValues {
            private_key_env: self.private_key_env.clone(),
            private_key_b64: general_purpose::STANDARD.encode(material.private_pem.as_bytes()),
            public_key_env: self.public_key_env.clone(),
            public_key_b64: general_purpose::STANDARD.encode(material.public_pem.as_bytes()),
        })
    }

    fn key_material(&self) -> Result<SigningKeyMaterial, Report<AssertionIssuerError>> {
        self.source.ensure_key_pair()?;

        Ok(SigningKeyMaterial {
            private_pem: self.source.private_key_pem()?,
            public_pem: self.source.public_key_pem()?,
        })
    }
}
