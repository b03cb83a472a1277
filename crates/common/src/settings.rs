//! Configuration for the assertion issuer.
//!
//! Settings are read once at process start from TOML (either the embedded
//! `assertion-issuer.toml` or a file supplied by the host), layered with
//! environment overrides prefixed `ASSERTION_ISSUER__`. For example,
//! `ASSERTION_ISSUER__CLIENT_ID` overrides `client_id` and
//! `ASSERTION_ISSUER__KEYS__MODE` overrides `keys.mode`.
//!
//! The resulting [`Settings`] value is passed by reference into
//! [`crate::client_assertion::KeyProvider`] and [`crate::client_assertion::AssertionSigner`].

use std::fs;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AssertionIssuerError;

pub const ENVIRONMENT_VARIABLE_PREFIX: &str = "ASSERTION_ISSUER";
pub const ENVIRONMENT_VARIABLE_SEPARATOR: &str = "__";

pub const DEFAULT_ASSERTION_TTL_SECONDS: u64 = 300;
pub const DEFAULT_LOCAL_KEY_ID: &str = "local-signing-key";
pub const DEFAULT_PRIVATE_KEY_PATH: &str = "./signing-private.pem";
pub const DEFAULT_PUBLIC_KEY_PATH: &str = "./signing-public.pem";
pub const DEFAULT_PRIVATE_KEY_ENV: &str = "ASSERTION_ISSUER_PRIVATE_KEY_B64";
pub const DEFAULT_PUBLIC_KEY_ENV: &str = "ASSERTION_ISSUER_PUBLIC_KEY_B64";

const EMBEDDED_SETTINGS: &str = include_str!("../../../assertion-issuer.toml");

/// Where the signing key pair comes from. Fixed for the lifetime of a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyMode {
    /// Generate on first use and persist PEM files at the configured paths.
    #[default]
    Local,
    /// Read base64-encoded PEM text from environment values. Never writes files.
    External,
}

impl std::fmt::Display for KeyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyMode::Local => write!(f, "local"),
            KeyMode::External => write!(f, "external"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct KeySettings {
    #[serde(default)]
    pub mode: KeyMode,

    /// Key identifier published in the JWKS and embedded in token headers.
    /// Required in external mode; defaults to [`DEFAULT_LOCAL_KEY_ID`] locally.
    #[serde(default)]
    pub key_id: Option<String>,

    #[serde(default = "default_private_key_path")]
    pub private_key_path: PathBuf,

    #[serde(default = "default_public_key_path")]
    pub public_key_path: PathBuf,

    /// Name of the environment variable holding the base64 private key PEM.
    #[serde(default = "default_private_key_env")]
    #[validate(length(min = 1))]
    pub private_key_env: String,

    /// Name of the environment variable holding the base64 public key PEM.
    #[serde(default = "default_public_key_env")]
    #[validate(length(min = 1))]
    pub public_key_env: String,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            mode: KeyMode::default(),
            key_id: None,
            private_key_path: default_private_key_path(),
            public_key_path: default_public_key_path(),
            private_key_env: default_private_key_env(),
            public_key_env: default_public_key_env(),
        }
    }
}

impl KeySettings {
    /// The effective key identifier.
    ///
    /// Validation guarantees a configured id in external mode, so the local
    /// default only ever applies to local mode.
    #[must_use]
    pub fn key_id(&self) -> &str {
        self.key_id
            .as_deref()
            .filter(|kid| !kid.trim().is_empty())
            .unwrap_or(DEFAULT_LOCAL_KEY_ID)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Settings {
    /// Client identifier, used as both `iss` and `sub` of every assertion.
    #[serde(default)]
    #[validate(length(min = 1, message = "client_id must not be empty"))]
    pub client_id: String,

    /// Token endpoint URL, used as the assertion audience.
    #[validate(url)]
    pub token_url: String,

    #[serde(default = "default_assertion_ttl_seconds")]
    #[validate(range(min = 1, max = 3600))]
    pub assertion_ttl_seconds: u64,

    #[serde(default)]
    #[validate(nested)]
    pub keys: KeySettings,
}

impl Settings {
    /// Loads the embedded default settings merged with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a settings error if the merged configuration cannot be parsed,
    /// or a configuration error if it fails validation (for example when
    /// `ASSERTION_ISSUER__CLIENT_ID` is not set).
    pub fn new() -> Result<Self, Report<AssertionIssuerError>> {
        Self::from_toml(EMBEDDED_SETTINGS)
    }

    /// Loads settings from a TOML file merged with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns a settings error if the file cannot be read or parsed, or a
    /// configuration error if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, Report<AssertionIssuerError>> {
        let toml_str = fs::read_to_string(path).change_context(AssertionIssuerError::Settings {
            message: format!("Failed to read settings file {}", path.display()),
        })?;

        Self::from_toml(&toml_str)
    }

    /// Parses TOML, applies environment overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns a settings error if the TOML is invalid or does not match the
    /// expected shape, or a configuration error if validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<AssertionIssuerError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_VARIABLE_PREFIX)
            .separator(ENVIRONMENT_VARIABLE_SEPARATOR);

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(AssertionIssuerError::Settings {
                message: "Failed to build configuration".to_string(),
            })?;

        let settings: Self =
            config
                .try_deserialize()
                .change_context(AssertionIssuerError::Settings {
                    message: "Failed to deserialize configuration".to_string(),
                })?;

        settings.check()?;

        Ok(settings)
    }

    /// Validates field constraints and the mode-dependent requirements.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first failed requirement.
    pub fn check(&self) -> Result<(), Report<AssertionIssuerError>> {
        if self.client_id.trim().is_empty() {
            return Err(Report::new(AssertionIssuerError::Configuration {
                message: format!(
                    "client_id is missing (set {ENVIRONMENT_VARIABLE_PREFIX}{ENVIRONMENT_VARIABLE_SEPARATOR}CLIENT_ID)"
                ),
            }));
        }

        self.validate()
            .change_context(AssertionIssuerError::Configuration {
                message: "Settings validation failed".to_string(),
            })?;

        if self.keys.mode == KeyMode::External
            && self
                .keys
                .key_id
                .as_deref()
                .is_none_or(|kid| kid.trim().is_empty())
        {
            return Err(Report::new(AssertionIssuerError::Configuration {
                message: "keys.key_id is required in external mode".to_string(),
            }));
        }

        Ok(())
    }
}

fn default_assertion_ttl_seconds() -> u64 {
    DEFAULT_ASSERTION_TTL_SECONDS
}

fn default_private_key_path() -> PathBuf {
    PathBuf::from(DEFAULT_PRIVATE_KEY_PATH)
}

fn default_public_key_path() -> PathBuf {
    PathBuf::from(DEFAULT_PUBLIC_KEY_PATH)
}

fn default_private_key_env() -> String {
    DEFAULT_PRIVATE_KEY_ENV.to_string()
}

fn default_public_key_env() -> String {
    DEFAULT_PUBLIC_KEY_ENV.to_string()
}
