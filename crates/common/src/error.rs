//! Error types for the assertion issuer.
//!
//! Every fallible operation in this crate returns an
//! [`error_stack::Report`] whose current context is an [`AssertionIssuerError`].
//! The variant tells the hosting boundary how to treat the failure:
//! configuration errors are fatal at startup, key material and signing errors
//! are surfaced to the caller of the failing operation.

use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum AssertionIssuerError {
    /// Required configuration or credential source is missing.
    #[display("Configuration error: {message}")]
    Configuration { message: String },

    /// Settings could not be loaded or parsed.
    #[display("Settings error: {message}")]
    Settings { message: String },

    /// Key material is unreadable, malformed, or inconsistent.
    #[display("Key material error: {message}")]
    KeyMaterial { message: String },

    /// Unexpected failure while producing a signed token.
    #[display("Signing error: {message}")]
    Signing { message: String },
}

impl AssertionIssuerError {
    /// Returns `true` when the error means the process must not serve requests.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Settings { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AssertionIssuerError::Configuration {
            message: "client_id is missing".into(),
        };
        assert_eq!(err.to_string(), "Configuration error: client_id is missing");

        let err = AssertionIssuerError::KeyMaterial {
            message: "bad pem".into(),
        };
        assert_eq!(err.to_string(), "Key material error: bad pem");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(AssertionIssuerError::Configuration {
            message: String::new()
        }
        .is_fatal());
        assert!(AssertionIssuerError::Settings {
            message: String::new()
        }
        .is_fatal());
        assert!(!AssertionIssuerError::KeyMaterial {
            message: String::new()
        }
        .is_fatal());
        assert!(!AssertionIssuerError::Signing {
            message: String::new()
        }
        .is_fatal());
    }
}
