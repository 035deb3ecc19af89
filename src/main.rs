//! rpmsync CLI entry point
//!
//! This is the executable for rpmsync, the vendor RPM synchronization tool.
//! It handles command-line argument parsing, error display, and workflow
//! execution. Invoked with no arguments it performs one full synchronization
//! run; see `rpmsync --help` for the available flags.

use anyhow::Result;
use clap::Parser;
use rpmsync_cli::cli;
use rpmsync_cli::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            // Convert to a user-friendly error with a suggestion where we
            // have one. Exit codes: 0 for completed runs, 1 for aborts.
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
