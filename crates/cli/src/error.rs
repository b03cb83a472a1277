//! CLI error types.

use std::fmt;

use assertion_issuer_common::error::AssertionIssuerError;
use error_stack::Report;

#[derive(Debug)]
pub enum CliError {
    /// Settings or credential configuration error
    Config(String),
    /// Key material or signing error
    Key(String),
    /// Logger setup error
    Logging(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Key(msg) => write!(f, "Key error: {}", msg),
            CliError::Logging(msg) => write!(f, "Logging error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<Report<AssertionIssuerError>> for CliError {
    fn from(report: Report<AssertionIssuerError>) -> Self {
        // Debug output of a report includes the full context chain.
        let message = format!("{:?}", report);
        if report.current_context().is_fatal() {
            CliError::Config(message)
        } else {
            CliError::Key(message)
        }
    }
}
