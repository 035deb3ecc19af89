//! rpmsync - vendor RPM synchronization for openSUSE
//!
//! rpmsync keeps a single vendor-distributed RPM package in sync with its
//! upstream download area. One invocation runs one linear workflow:
//!
//! 1. Validate the host (distribution, architecture, release version) and
//!    select release-specific install flags.
//! 2. Advisory self-check: is a newer rpmsync available?
//! 3. Inspect local state: package installed? artifact downloaded? listing
//!    snapshot saved?
//! 4. Detect upstream change by comparing a one-line directory listing
//!    against the saved snapshot (cheap), or the artifact bytes themselves
//!    when no snapshot baseline exists yet.
//! 5. On change: download the artifact, regenerate the local repository
//!    index, ensure the zypper media entry, verify/install the signing key,
//!    and install via zypper with an rpm fallback.
//! 6. Report every step with a timestamp and the total elapsed time.
//!
//! # Architecture Overview
//!
//! The crate is a thin orchestration layer over external command-line tools
//! (`zypper`, `rpm`, `createrepo_c`, `sudo`) plus in-process HTTP retrieval
//! and checksum computation. There is deliberately no daemon, no persistence
//! beyond a handful of files in the sync directory, and no parallelism: one
//! step completes fully before the next begins.
//!
//! # Core Modules
//!
//! - [`cli`] - Command-line surface and logging setup
//! - [`config`] - [`config::SyncConfig`]: URLs, package name, paths, flags
//! - [`core`] - Error types ([`core::SyncError`]) and step outcomes
//! - [`workflow`] - The one linear driver tying everything together
//!
//! ## Workflow Steps
//!
//! - [`platform`] - Environment validation and install-flag selection
//! - [`selfcheck`] - Advisory "newer rpmsync available?" check
//! - [`state`] - Local-state inspection (rpm database + filesystem)
//! - [`detect`] - Change detection and the install-decision tree
//! - [`repo`] - Repository index, media entry, and manifest generation
//! - [`keys`] - Signing-key download, verification, and import
//! - [`install`] - High-level install with low-level fallback
//! - [`report`] - Step timestamps and elapsed-time formatting
//!
//! ## Supporting Modules
//!
//! - [`process`] - Typed subprocess builder (no string-interpolated commands)
//! - [`net`] - HTTP client and directory-listing extraction
//! - [`checksum`] - SHA-256 computation and byte-equality comparison
//! - [`lock`] - Advisory sync-directory lock against concurrent runs
//!
//! # Error Philosophy
//!
//! rpmsync favors availability over strict correctness: most subprocess
//! failures are logged with their exit code and the run continues to the
//! next useful step. Only a small set of conditions abort the run with exit
//! code 1: unsupported distribution or architecture, invocation as root, and
//! a signing-key checksum mismatch. See [`core::SyncError::severity`].

// Core functionality modules
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod workflow;

// Workflow steps, in execution order
pub mod platform;
pub mod selfcheck;
pub mod state;
pub mod detect;
pub mod repo;
pub mod keys;
pub mod install;
pub mod report;

// Supporting modules
pub mod checksum;
pub mod lock;
pub mod net;
pub mod process;
