//! azure-app-owner
//!
//! Ensures an Entra ID group is registered as an owner of an application
//! registration, using the client-credentials grant and Microsoft Graph.

#![deny(clippy::all)]

mod auth;
mod cli;
mod config;
mod error;
mod graph;
mod workflow;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use auth::oauth::{Credentials, TokenClient};
use cli::Cli;
use config::Config;
use error::AppError;
use graph::GraphClient;

/// Exit status for configuration problems.
const EXIT_CONFIG: u8 = 2;
/// Exit status for authentication, Graph or network failures.
const EXIT_FATAL: u8 = 3;

fn main() -> ExitCode {
    // Load .env file (if present) before reading any AZURE_* variables
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    let cli = Cli::parse();

    let config = match Config::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            let err = AppError::Config(e.to_string());
            eprintln!("{} {}", err.user_message(), err);
            eprintln!("\nPlease set the following environment variables (or matching flags):");
            eprintln!("  AZURE_TENANT_ID=<your-tenant-id>");
            eprintln!("  AZURE_CLIENT_ID=<your-app-client-id>");
            eprintln!("  AZURE_CLIENT_SECRET=<your-app-client-secret>");
            eprintln!("  AZURE_GROUP_NAME=<group-display-name>");
            eprintln!("  AZURE_APP_NAME=<application-display-name>");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    init_logging(&config.logging.level);

    info!("Starting azure-app-owner v{}", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create Tokio runtime: {}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let (tokens, graph) = match (TokenClient::new(&config), GraphClient::new(&config)) {
        (Ok(tokens), Ok(graph)) => (tokens, graph),
        (Err(e), _) | (_, Err(e)) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let credentials = Credentials::from_config(&config);

    let result = runtime.block_on(workflow::run(
        &tokens,
        &graph,
        &credentials,
        &config.target,
        cli.dry_run,
    ));

    match result {
        Ok(outcome) => {
            println!("{}", outcome.message(&config.target));
            ExitCode::from(outcome.exit_code())
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            if e.is_transient() {
                eprintln!("{} This may be temporary; try again later.", e.user_message());
            } else {
                eprintln!("{}", e.user_message());
            }
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Initialize tracing/logging on stderr so stdout only carries the outcome.
fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}
