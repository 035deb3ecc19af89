//! Command-line interface for rpmsync.
//!
//! rpmsync has a deliberately small surface: invoked with no arguments it
//! performs one full synchronization run, and every flag only adjusts how
//! that one run behaves. There are no subcommands.
//!
//! ```bash
//! rpmsync                    # normal run
//! rpmsync --dry-run          # log decisions, mutate nothing
//! rpmsync --verbose          # debug-level diagnostics on stderr
//! rpmsync --config ./alt.toml --sync-dir /data/mirrors/megasync
//! ```
//!
//! Unrecognized arguments are rejected by the parser with a non-zero exit;
//! `--help`/`-h` prints usage and exits 0.
//!
//! # Output Channels
//!
//! Timestamped step lines go to stdout through [`crate::report::Reporter`];
//! `tracing` diagnostics go to stderr, with the level mapped from
//! `--verbose`/`--quiet` (overridable via `RUST_LOG`).

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::SyncConfig;
use crate::workflow::{self, WorkflowOptions};

/// Main CLI structure for rpmsync.
///
/// Invoked with no arguments for normal operation; all flags are optional
/// modifiers of the single synchronization workflow.
#[derive(Parser)]
#[command(
    name = "rpmsync",
    about = "Keep a vendor-distributed RPM in sync with its upstream download area",
    version,
    long_about = "rpmsync checks the upstream download area for a newer release artifact, \
                  downloads it when changed, rebuilds the local package repository, verifies \
                  the vendor signing key, and installs or upgrades the package via zypper \
                  (falling back to a forced rpm install when zypper cannot)."
)]
pub struct Cli {
    /// Enable debug output on stderr.
    ///
    /// Equivalent to `RUST_LOG=debug`. Mutually exclusive with `--quiet`.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress diagnostics; only step lines, warnings, and errors remain.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to a configuration file overriding the defaults.
    ///
    /// Falls back to `RPMSYNC_CONFIG`, then `~/.config/rpmsync/config.toml`.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the sync directory holding artifact, snapshot, and index.
    #[arg(long)]
    sync_dir: Option<PathBuf>,

    /// Log every decision but perform no downloads, installs, or
    /// repository mutations.
    #[arg(long)]
    dry_run: bool,

    /// Skip the advisory check for a newer rpmsync.
    #[arg(long)]
    skip_self_check: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

impl Cli {
    /// Execute one synchronization run with the parsed options.
    pub async fn execute(self) -> Result<()> {
        init_tracing(self.log_level());
        if self.no_color {
            colored::control::set_override(false);
        }

        let mut config = SyncConfig::load(self.config.clone()).await?;
        if let Some(dir) = self.sync_dir {
            config = config.with_sync_dir(dir);
        }

        workflow::run(
            config,
            WorkflowOptions { dry_run: self.dry_run, skip_self_check: self.skip_self_check },
        )
        .await
    }

    /// Map the verbosity flags to a default log level.
    ///
    /// `None` means errors only (quiet mode). An explicit `RUST_LOG` always
    /// wins over this mapping.
    fn log_level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            None
        } else {
            Some("info")
        }
    }
}

/// Install the global tracing subscriber, writing to stderr.
fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("error")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_is_a_normal_run() {
        let cli = Cli::parse_from(["rpmsync"]);
        assert!(!cli.dry_run);
        assert!(!cli.skip_self_check);
        assert_eq!(cli.log_level(), Some("info"));
    }

    #[test]
    fn verbose_maps_to_debug() {
        let cli = Cli::parse_from(["rpmsync", "--verbose"]);
        assert_eq!(cli.log_level(), Some("debug"));
    }

    #[test]
    fn quiet_disables_diagnostics() {
        let cli = Cli::parse_from(["rpmsync", "-q"]);
        assert_eq!(cli.log_level(), None);
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["rpmsync", "-v", "-q"]).is_err());
    }

    #[test]
    fn unrecognized_arguments_are_rejected() {
        assert!(Cli::try_parse_from(["rpmsync", "--frobnicate"]).is_err());
        assert!(Cli::try_parse_from(["rpmsync", "stray-positional"]).is_err());
    }

    #[test]
    fn paths_parse() {
        let cli = Cli::parse_from(["rpmsync", "--config", "/tmp/c.toml", "--sync-dir", "/tmp/s"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert_eq!(cli.sync_dir, Some(PathBuf::from("/tmp/s")));
    }
}
