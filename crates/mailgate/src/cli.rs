//! Command line definition.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use mailgate_core::audit::DEFAULT_LIST_LIMIT;

/// Default number of inbox messages shown.
pub const DEFAULT_INBOX_TOP: u32 = 10;

/// Send audited mail through Microsoft Graph.
#[derive(Parser, Debug)]
#[command(name = "mailgate", version, about)]
pub struct Cli {
    /// Directory holding config, token cache, templates and the audit log.
    #[arg(long, global = true, env = "MAILGATE_HOME")]
    pub home: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Send an email.
    Send(SendArgs),
    /// List available templates.
    Templates,
    /// Show the sent mail log.
    Log {
        /// Number of records to show.
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
    },
    /// Show the newest inbox messages.
    Inbox {
        /// Number of messages to show.
        #[arg(long, default_value_t = DEFAULT_INBOX_TOP)]
        top: u32,
    },
    /// Configure the app registration.
    Setup,
    /// Clear saved authentication.
    Logout,
}

/// Arguments of `send`.
#[derive(Args, Debug, PartialEq, Eq)]
pub struct SendArgs {
    /// Recipient address.
    #[arg(long)]
    pub to: String,

    /// Template name (file stem under `templates/`).
    #[arg(long)]
    pub template: Option<String>,

    /// Subject; overrides the template's.
    #[arg(long, required_unless_present = "template")]
    pub subject: Option<String>,

    /// Body; overrides the template's.
    #[arg(long, required_unless_present = "template")]
    pub body: Option<String>,
}

impl Cli {
    /// `--home`, then `MAILGATE_HOME`, then the platform data directory.
    pub fn home_dir(&self) -> anyhow::Result<PathBuf> {
        self.home
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("mailgate")))
            .context("cannot determine a home directory; pass --home or set MAILGATE_HOME")
    }
}
