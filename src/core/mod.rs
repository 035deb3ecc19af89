//! Core types for rpmsync
//!
//! This module holds the error type shared by every workflow step and the
//! typed per-step outcome that the workflow driver uses to decide between
//! continuing and aborting.
//!
//! # Error Severity
//!
//! Every [`SyncError`] carries a [`Severity`]: `Fatal` errors abort the run
//! with exit code 1, `Recoverable` errors are logged as warnings and the
//! workflow moves on to the next useful step. The fatal set is deliberately
//! small: unsupported distribution or architecture, invocation as root, and
//! a signing-key checksum mismatch.

pub mod error;
pub mod step;

pub use error::{ErrorContext, SyncError, user_friendly_error};
pub use step::{Severity, StepOutcome};
