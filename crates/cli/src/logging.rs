//! Logger setup for the CLI.
//!
//! Log lines go to stderr so that stdout carries only the JSON documents.

use log::LevelFilter;

use crate::error::CliError;

/// Initialize logging. Call once at the start of `main`.
pub fn init_logger(verbose: bool) -> Result<(), CliError> {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}  {} {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .map_err(|e| CliError::Logging(format!("Failed to initialize logger: {}", e)))
}
