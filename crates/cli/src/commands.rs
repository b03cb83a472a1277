//! Command implementations.
//!
//! Every command first runs the key provider's startup check, so a
//! misconfigured issuer fails before producing any output. Commands return
//! the text to print instead of printing it.

use std::path::Path;
use std::sync::Arc;

use assertion_issuer_common::client_assertion::{
    client_assertion_json, key_set_json, AssertionSigner, KeyProvider,
};
use assertion_issuer_common::settings::Settings;

use crate::error::CliError;

/// Load settings from `file`, or from the embedded defaults when no file is
/// given. Environment overrides prefixed `ASSERTION_ISSUER__` apply either way.
pub fn load_settings(file: Option<&Path>) -> Result<Settings, CliError> {
    let settings = match file {
        Some(path) => {
            log::debug!("Loading settings from {}", path.display());
            Settings::from_file(path)?
        }
        None => Settings::new()?,
    };

    Ok(settings)
}

/// Build the key provider and run its startup check.
pub fn start_provider(settings: &Settings) -> Result<Arc<KeyProvider>, CliError> {
    let provider = KeyProvider::new(settings);
    provider.initialize()?;

    Ok(Arc::new(provider))
}

pub fn check(settings: &Settings) -> Result<String, CliError> {
    let provider = start_provider(settings)?;

    Ok(format!(
        "Signing key '{}' is ready ({} mode)\n  Client ID: {}\n  Token URL: {}\n  Assertion TTL: {}s",
        provider.key_id(),
        provider.mode(),
        settings.client_id,
        settings.token_url,
        settings.assertion_ttl_seconds
    ))
}

pub fn jwks(settings: &Settings) -> Result<String, CliError> {
    let provider = start_provider(settings)?;

    Ok(key_set_json(&provider)?)
}

pub fn assertion(settings: &Settings) -> Result<String, CliError> {
    let provider = start_provider(settings)?;
    let signer = AssertionSigner::new(settings, provider);

    Ok(client_assertion_json(&signer)?)
}

/// Print the key pair as `NAME=value` lines for external mode.
pub fn export_env(settings: &Settings) -> Result<String, CliError> {
    let provider = start_provider(settings)?;
    let values = provider.export_env_values()?;

    Ok(format!(
        "{}={}\n{}={}",
        values.private_key_env, values.private_key_b64, values.public_key_env, values.public_key_b64
    ))
}
