//! `mailgate` - send audited mail through Microsoft Graph.
//!
//! Signs in with the device code flow, checks every send against the send
//! gate and keeps a JSON audit record per accepted message.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod commands;
mod prompt;

use std::process::ExitCode;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

const DEFAULT_FILTER: &str = "mailgate=info,mailgate_core=info,mailgate_oauth=info";
const VERBOSE_FILTER: &str = "mailgate=debug,mailgate_core=debug,mailgate_oauth=debug";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    debug!(command = ?cli.command, "Starting mailgate");

    match commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
