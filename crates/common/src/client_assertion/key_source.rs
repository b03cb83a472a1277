//! Key sources: where the signing key pair comes from.
//!
//! The key mode is chosen once from [`KeySettings`] and expressed as one of
//! two [`KeySource`] implementations:
//!
//! - [`FileBackedKeySource`] generates a key pair on first use and persists
//!   it as PEM files.
//! - [`EnvBackedKeySource`] decodes base64 PEM text from environment values
//!   and never touches the filesystem.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use base64::{engine::general_purpose, Engine};
use error_stack::{Report, ResultExt};
use once_cell::sync::Lazy;
use tempfile::NamedTempFile;

use crate::error::AssertionIssuerError;
use crate::settings::{KeyMode, KeySettings};

use super::material::{normalize_pem, SigningKeyMaterial};

/// Serializes first-time generation across every file-backed source in the
/// process.
static GENERATION_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// Supplies the normalized PEM halves of the single active key pair.
pub trait KeySource: Send + Sync {
    fn mode(&self) -> KeyMode;

    /// Makes sure key material is available, generating it where the mode
    /// allows. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the material cannot be made
    /// available, or a key material error if persisting it fails.
    fn ensure_key_pair(&self) -> Result<(), Report<AssertionIssuerError>>;

    /// Normalized private key PEM.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the source is missing, or a key
    /// material error if it cannot be read or decoded.
    fn private_key_pem(&self) -> Result<String, Report<AssertionIssuerError>>;

    /// Normalized public key PEM.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the source is missing, or a key
    /// material error if it cannot be read or decoded.
    fn public_key_pem(&self) -> Result<String, Report<AssertionIssuerError>>;
}

/// Builds the key source for the configured mode.
#[must_use]
pub fn key_source_from_settings(keys: &KeySettings) -> Box<dyn KeySource> {
    match keys.mode {
        KeyMode::Local => Box::new(FileBackedKeySource::new(
            keys.private_key_path.clone(),
            keys.public_key_path.clone(),
        )),
        KeyMode::External => Box::new(EnvBackedKeySource::new(
            keys.private_key_env.clone(),
            keys.public_key_env.clone(),
        )),
    }
}

/// Local mode: PEM files generated on first use.
#[derive(Debug, Clone)]
pub struct FileBackedKeySource {
    private_key_path: PathBuf,
    public_key_path: PathBuf,
}

impl FileBackedKeySource {
    #[must_use]
    pub fn new(private_key_path: impl Into<PathBuf>, public_key_path: impl Into<PathBuf>) -> Self {
        Self {
            private_key_path: private_key_path.into(),
            public_key_path: public_key_path.into(),
        }
    }

    #[must_use]
    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    #[must_use]
    pub fn public_key_path(&self) -> &Path {
        &self.public_key_path
    }

    fn both_files_exist(&self) -> bool {
        self.private_key_path.is_file() && self.public_key_path.is_file()
    }

    fn read_pem(path: &Path, label: &str) -> Result<String, Report<AssertionIssuerError>> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Report::new(e).change_context(AssertionIssuerError::Configuration {
                    message: format!("{label} key file {} is missing", path.display()),
                }));
            }
            Err(e) => {
                return Err(Report::new(e).change_context(AssertionIssuerError::KeyMaterial {
                    message: format!("Failed to read {label} key file {}", path.display()),
                }));
            }
        };

        log::debug!("Read {} key from {}", label, path.display());
        Ok(normalize_pem(&contents))
    }
}

impl KeySource for FileBackedKeySource {
    fn mode(&self) -> KeyMode {
        KeyMode::Local
    }

    fn ensure_key_pair(&self) -> Result<(), Report<AssertionIssuerError>> {
        if self.both_files_exist() {
            return Ok(());
        }

        // The guard holds only `()`, so a poisoned lock carries no broken state.
        let _guard = GENERATION_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Another caller may have finished generating while we waited.
        if self.both_files_exist() {
            return Ok(());
        }

        log::info!(
            "Generating RSA signing key pair at {} and {}",
            self.private_key_path.display(),
            self.public_key_path.display()
        );

        let material = SigningKeyMaterial::generate()?;
        write_atomic(&self.private_key_path, &material.private_pem)
            .attach("while persisting the private key")?;
        write_atomic(&self.public_key_path, &material.public_pem)
            .attach("while persisting the public key")?;

        Ok(())
    }

    fn private_key_pem(&self) -> Result<String, Report<AssertionIssuerError>> {
        Self::read_pem(&self.private_key_path, "private")
    }

    fn public_key_pem(&self) -> Result<String, Report<AssertionIssuerError>> {
        Self::read_pem(&self.public_key_path, "public")
    }
}

/// Writes `contents` to a temporary file next to `path`, then renames it into
/// place so readers never observe a partially written key.
fn write_atomic(path: &Path, contents: &str) -> Result<(), Report<AssertionIssuerError>> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let key_material_error = || AssertionIssuerError::KeyMaterial {
        message: format!("Failed to write key file {}", path.display()),
    };

    fs::create_dir_all(dir).change_context_lazy(key_material_error)?;

    let mut file = NamedTempFile::new_in(dir).change_context_lazy(key_material_error)?;
    file.write_all(contents.as_bytes())
        .change_context_lazy(key_material_error)?;
    file.as_file()
        .sync_all()
        .change_context_lazy(key_material_error)?;
    file.persist(path)
        .map_err(|e| e.error)
        .change_context_lazy(key_material_error)?;

    log::debug!("Wrote key file {}", path.display());
    Ok(())
}

/// External mode: base64-encoded PEM text supplied through environment values.
#[derive(Debug, Clone)]
pub struct EnvBackedKeySource {
    private_key_env: String,
    public_key_env: String,
}

impl EnvBackedKeySource {
    #[must_use]
    pub fn new(private_key_env: impl Into<String>, public_key_env: impl Into<String>) -> Self {
        Self {
            private_key_env: private_key_env.into(),
            public_key_env: public_key_env.into(),
        }
    }

    fn is_present(var: &str) -> bool {
        std::env::var_os(var).is_some_and(|value| !value.is_empty())
    }

    fn read_pem(var: &str, label: &str) -> Result<String, Report<AssertionIssuerError>> {
        let encoded = match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => value,
            Ok(_) | Err(std::env::VarError::NotPresent) => {
                return Err(Report::new(AssertionIssuerError::Configuration {
                    message: format!("Environment variable {var} ({label} key) is missing"),
                }));
            }
            Err(e @ std::env::VarError::NotUnicode(_)) => {
                return Err(Report::new(e).change_context(AssertionIssuerError::KeyMaterial {
                    message: format!("Environment variable {var} is not valid unicode"),
                }));
            }
        };

        // Tolerate line-wrapped base64 output.
        let compact: String = encoded.split_whitespace().collect();
        let decoded = general_purpose::STANDARD.decode(compact).change_context(
            AssertionIssuerError::KeyMaterial {
                message: format!("Environment variable {var} is not valid base64"),
            },
        )?;
        let pem = String::from_utf8(decoded).change_context(AssertionIssuerError::KeyMaterial {
            message: format!("Environment variable {var} does not decode to UTF-8 PEM text"),
        })?;

        Ok(normalize_pem(&pem))
    }
}

impl KeySource for EnvBackedKeySource {
    fn mode(&self) -> KeyMode {
        KeyMode::External
    }

    fn ensure_key_pair(&self) -> Result<(), Report<AssertionIssuerError>> {
        let missing: Vec<&str> = [&self.private_key_env, &self.public_key_env]
            .into_iter()
            .map(String::as_str)
            .filter(|var| !Self::is_present(var))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        Err(Report::new(AssertionIssuerError::Configuration {
            message: format!(
                "External key mode requires environment variables: {}",
                missing.join(", ")
            ),
        }))
    }

    fn private_key_pem(&self) -> Result<String, Report<AssertionIssuerError>> {
        Self::read_pem(&self.private_key_env, "private")
    }

    fn public_key_pem(&self) -> Result<String, Report<AssertionIssuerError>> {
        Self::read_pem(&self.public_key_env, "public")
    }
}
