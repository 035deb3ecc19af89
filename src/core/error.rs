//! Error handling for rpmsync
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** ([`SyncError`]) so the workflow driver can
//!    classify a failure by severity instead of scattering continue-vs-abort
//!    judgment inline.
//! 2. **User-friendly messages** with an actionable suggestion where one
//!    exists, rendered by [`ErrorContext`] at the top level.
//!
//! Most failures in rpmsync are recoverable: a failed media-entry addition
//! or a failed high-level install is logged and the run continues. Use
//! [`SyncError::severity`] to tell the two classes apart.

use colored::Colorize;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::step::Severity;

/// The main error type for rpmsync operations.
///
/// Each variant represents a specific failure mode with enough context to
/// render a useful message. The workflow driver consults
/// [`severity`](Self::severity) to decide whether a failure aborts the run.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The host is not running the expected distribution.
    ///
    /// rpmsync drives zypper and rpm with openSUSE-specific assumptions and
    /// refuses to guess on anything else.
    #[error("unsupported distribution '{found}' (this tool targets openSUSE)")]
    UnsupportedDistribution {
        /// The `ID` field read from os-release.
        found: String,
    },

    /// The host architecture is not the single supported 64-bit identifier.
    #[error("unsupported architecture '{found}' (only x86_64 is supported)")]
    UnsupportedArchitecture {
        /// The architecture the binary was built for.
        found: String,
    },

    /// rpmsync was invoked as root.
    ///
    /// The sync directory lives under the invoking user's downloads
    /// directory; privileged steps escalate individually through sudo.
    #[error("refusing to run as root; run as a regular user (privileged steps use sudo)")]
    RootInvocation,

    /// A file's SHA-256 digest does not match its recorded checksum.
    ///
    /// Raised by the key manager; a corrupted or tampered signing key must
    /// never be imported, so this aborts the run.
    #[error("checksum mismatch for {}: expected {expected}, got {actual}", path.display())]
    ChecksumMismatch {
        /// The file that failed verification.
        path: PathBuf,
        /// The digest recorded in the checksum file.
        expected: String,
        /// The digest computed from the file on disk.
        actual: String,
    },

    /// An external command exited with a non-zero status.
    #[error("{program} {operation} failed with exit code {code}")]
    CommandFailed {
        /// The program that was run (e.g. "zypper").
        program: String,
        /// The subcommand or first argument (e.g. "install").
        operation: String,
        /// The exit code, or -1 if the process died on a signal.
        code: i32,
        /// Captured standard error output.
        stderr: String,
    },

    /// An external command did not finish within its timeout.
    #[error("{program} {operation} timed out after {seconds} seconds")]
    CommandTimeout {
        /// The program that was run.
        program: String,
        /// The subcommand or first argument.
        operation: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// A required external tool is not on PATH.
    #[error("required tool not found on PATH: {program}")]
    ToolNotFound {
        /// The missing program name.
        program: String,
    },

    /// An HTTP request could not be completed.
    #[error("request to {url} failed: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// The transport-level failure description.
        reason: String,
    },

    /// An HTTP request completed with a non-success status.
    #[error("request to {url} returned HTTP status {status}")]
    HttpStatus {
        /// The URL that was requested.
        url: String,
        /// The status code received.
        status: u16,
    },

    /// The remote directory listing has no line mentioning the artifact.
    #[error("no entry for '{artifact}' in the directory listing at {url}")]
    ListingEntryMissing {
        /// The listing URL that was fetched.
        url: String,
        /// The artifact file name that was searched for.
        artifact: String,
    },

    /// The configuration file exists but could not be used.
    #[error("invalid configuration in {}: {reason}", path.display())]
    ConfigError {
        /// Path to the offending configuration file.
        path: PathBuf,
        /// Parse or validation failure description.
        reason: String,
    },

    /// The per-user downloads directory could not be resolved.
    #[error("could not resolve a downloads directory for this user")]
    NoDownloadsDir,

    /// An I/O operation failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Classify this error for the workflow driver.
    ///
    /// `Fatal` aborts the run with exit code 1; `Recoverable` is logged as a
    /// warning and execution continues with the next useful step.
    pub const fn severity(&self) -> Severity {
        match self {
            Self::UnsupportedDistribution { .. }
            | Self::UnsupportedArchitecture { .. }
            | Self::RootInvocation
            | Self::ChecksumMismatch { .. } => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }
}

/// An error paired with an optional suggestion for the operator.
///
/// Produced by [`user_friendly_error`] at the top of the binary; everything
/// below propagates plain `anyhow::Error` values.
pub struct ErrorContext {
    /// The underlying error chain.
    pub error: anyhow::Error,
    /// A one-line hint on how to resolve the problem, when we have one.
    pub suggestion: Option<&'static str>,
}

impl ErrorContext {
    /// Print the error (and suggestion, if any) to standard error.
    pub fn display(&self) {
        eprintln!("{} {}", "error:".red().bold(), self.error);
        for cause in self.error.chain().skip(1) {
            eprintln!("  {} {cause}", "caused by:".dimmed());
        }
        if let Some(suggestion) = self.suggestion {
            eprintln!("  {} {suggestion}", "hint:".cyan());
        }
    }
}

/// Wrap an error with a context-specific suggestion for CLI display.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let suggestion = match error.downcast_ref::<SyncError>() {
        Some(SyncError::UnsupportedDistribution { .. }) => {
            Some("rpmsync only supports openSUSE hosts; run it on the target machine")
        }
        Some(SyncError::RootInvocation) => {
            Some("drop back to your regular user; rpmsync invokes sudo itself where needed")
        }
        Some(SyncError::ChecksumMismatch { .. }) => Some(
            "the local signing key no longer matches its recorded checksum; \
             inspect it and delete both files to re-fetch from upstream",
        ),
        Some(SyncError::ToolNotFound { .. }) => {
            Some("install the missing tool with zypper and re-run")
        }
        Some(SyncError::ConfigError { .. }) => {
            Some("fix or remove the configuration file and re-run")
        }
        _ => None,
    };
    ErrorContext { error, suggestion }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_errors_are_classified_fatal() {
        let fatal = [
            SyncError::UnsupportedDistribution { found: "debian".into() },
            SyncError::UnsupportedArchitecture { found: "i586".into() },
            SyncError::RootInvocation,
            SyncError::ChecksumMismatch {
                path: PathBuf::from("/tmp/repo.key"),
                expected: "aa".into(),
                actual: "bb".into(),
            },
        ];
        for e in fatal {
            assert_eq!(e.severity(), Severity::Fatal, "{e}");
        }
    }

    #[test]
    fn command_and_network_errors_are_recoverable() {
        let recoverable = [
            SyncError::CommandFailed {
                program: "zypper".into(),
                operation: "install".into(),
                code: 104,
                stderr: String::new(),
            },
            SyncError::CommandTimeout {
                program: "createrepo_c".into(),
                operation: "createrepo_c".into(),
                seconds: 300,
            },
            SyncError::HttpStatus { url: "https://example.invalid/x".into(), status: 404 },
        ];
        for e in recoverable {
            assert_eq!(e.severity(), Severity::Recoverable, "{e}");
        }
    }

    #[test]
    fn root_invocation_has_a_suggestion() {
        let ctx = user_friendly_error(SyncError::RootInvocation.into());
        assert!(ctx.suggestion.is_some());
    }
}
