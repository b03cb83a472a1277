//! Client assertion issuer CLI.
//!
//! This tool provides commands for:
//! - Checking that the signing key pair is present and consistent
//! - Printing the JSON Web Key Set for the active key
//! - Issuing a signed client assertion
//! - Exporting a local key pair as environment values for external mode

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod error;
mod logging;

use error::CliError;

#[derive(Parser)]
#[command(name = "assertion-issuer")]
#[command(about = "Issue OAuth2 client assertions and publish their verification keys")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML settings file (defaults to the embedded settings)
    #[arg(long, short, global = true, env = "ASSERTION_ISSUER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify configuration and key material, generating local keys if needed
    Check,
    /// Print the JSON Web Key Set for the active signing key
    Jwks,
    /// Print a freshly signed client assertion as {"client_assertion": ...}
    Assertion,
    /// Print the key pair as base64 environment values for external mode
    ExportEnv,
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    logging::init_logger(cli.verbose)?;

    let settings = commands::load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Check => commands::check(&settings),
        Commands::Jwks => commands::jwks(&settings),
        Commands::Assertion => commands::assertion(&settings),
        Commands::ExportEnv => commands::export_env(&settings),
    }
}
