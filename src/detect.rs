//! Change detection and the install-decision tree.
//!
//! The decision tree runs over three booleans observed by the local-state
//! inspector: artifact previously downloaded, listing snapshot previously
//! saved, package currently installed.
//!
//! ```text
//! artifact? snapshot?            decision
//! --------- ---------            --------
//!   no        -        FreshInstall     download + sync + install
//!   yes       no       ArtifactCompare  move aside, re-download, compare bytes
//!   yes       yes      ListingCompare   fetch one listing line, compare text
//! ```
//!
//! Listing comparison is the cheap path: one short text line instead of a
//! multi-megabyte download merely to test for novelty. The full artifact
//! comparison exists only as a fallback for the run before a listing
//! baseline has been established.
//!
//! All comparison is textual/byte equality. Version numbers are never
//! parsed or ordered.

use tokio::fs;
use tracing::debug;

use crate::config::SyncConfig;
use crate::state::LocalState;

/// Which comparison strategy this run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    /// No previous artifact: treat as a first-time installation.
    FreshInstall,
    /// Artifact present but no listing baseline: compare artifacts directly.
    ArtifactCompare,
    /// Artifact and baseline both present: compare listing lines.
    ListingCompare,
}

/// Verdict of a comparison between old and new.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeVerdict {
    /// Byte-for-byte identical.
    Unchanged,
    /// At least one byte differs.
    Changed,
}

/// What the run does after comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPlan {
    /// Nothing changed and the package is installed: do nothing.
    NoOp,
    /// Nothing changed upstream but the package is absent: install from the
    /// artifact already on disk, without re-downloading.
    ///
    /// Known gap inherited from the original workflow: the on-disk artifact
    /// is not re-validated before this install. A copy corrupted since its
    /// download would be handed to the installer as-is.
    InstallExisting,
    /// Upstream changed: full re-download, repository sync, and install.
    Resync,
}

/// Pick the comparison strategy for the observed local state.
pub const fn classify(state: &LocalState) -> Detection {
    if !state.artifact_present {
        Detection::FreshInstall
    } else if !state.snapshot_present {
        Detection::ArtifactCompare
    } else {
        Detection::ListingCompare
    }
}

/// Compare a saved listing snapshot against a freshly fetched line.
///
/// Equality is byte-for-byte on the line content (the snapshot file's
/// trailing newline, an artifact of storage, is excluded).
pub fn compare_listings(saved: &str, fresh: &str) -> ChangeVerdict {
    if saved.trim_end_matches('\n') == fresh.trim_end_matches('\n') {
        ChangeVerdict::Unchanged
    } else {
        ChangeVerdict::Changed
    }
}

/// Resolve a comparison verdict into a plan.
pub const fn resolve(verdict: ChangeVerdict, installed: bool) -> SyncPlan {
    match (verdict, installed) {
        (ChangeVerdict::Unchanged, true) => SyncPlan::NoOp,
        (ChangeVerdict::Unchanged, false) => SyncPlan::InstallExisting,
        (ChangeVerdict::Changed, _) => SyncPlan::Resync,
    }
}

/// Persist a freshly fetched listing line as the new snapshot.
///
/// The previous snapshot, if any, is rotated to the `-` suffixed backup
/// first. Called only after a successful synchronization so the snapshot
/// always reflects the listing as of the last completed sync; a failed run
/// re-detects the same change on the next invocation.
pub async fn save_snapshot(config: &SyncConfig, line: &str) -> std::io::Result<()> {
    let path = config.listing_path();
    if path.exists() {
        fs::rename(&path, config.listing_backup_path()).await?;
        debug!("rotated previous listing snapshot to {}", config.listing_backup_path().display());
    }
    fs::write(&path, format!("{line}\n")).await
}
