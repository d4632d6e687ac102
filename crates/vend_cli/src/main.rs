//! vend CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Provisioning failure or any other error
//! - 2: Invalid arguments or configuration

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vend_core::VendError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("vend={},warn", level)));
    // Ignore a subscriber that is already installed
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init();

    let result = match cli.command {
        Commands::Provision(args) => commands::provision::execute(args).await,
        Commands::Deploy(args) => commands::deploy::execute(args).await,
        Commands::Profile(command) => commands::profile::execute(command),
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(categorize_error(&e))
        }
    }
}

/// Configuration problems are the operator's to fix; everything else is a
/// failed run.
fn categorize_error(e: &anyhow::Error) -> u8 {
    let config_error = e
        .chain()
        .filter_map(|cause| cause.downcast_ref::<VendError>())
        .any(VendError::is_config);
    if config_error {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
