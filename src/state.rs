//! Local-state inspection.
//!
//! Answers three questions without mutating anything: is the package in the
//! rpm database, does a previously downloaded artifact exist, and does a
//! previously saved listing snapshot exist. The change detector's decision
//! tree runs entirely off this record.

use crate::config::SyncConfig;
use crate::core::SyncError;
use crate::process::SysCommand;

/// A snapshot of local state at the start of a run.
#[derive(Debug, Clone)]
pub struct LocalState {
    /// The installed version, if the package is in the rpm database.
    pub installed_version: Option<String>,
    /// Whether a previously downloaded artifact file exists.
    pub artifact_present: bool,
    /// Whether a previously saved listing snapshot exists.
    pub snapshot_present: bool,
}

impl LocalState {
    /// Whether the package is currently installed.
    pub const fn installed(&self) -> bool {
        self.installed_version.is_some()
    }

    /// Inspect the rpm database and the sync directory.
    pub async fn inspect(config: &SyncConfig) -> Result<Self, SyncError> {
        Ok(Self {
            installed_version: installed_version(&config.package).await?,
            artifact_present: config.artifact_path().exists(),
            snapshot_present: config.listing_path().exists(),
        })
    }
}

/// Query the rpm database for the package's installed version.
///
/// `rpm -q` exits 0 when the package is installed; any other exit code
/// means "not installed" and is not an error.
pub async fn installed_version(package: &str) -> Result<Option<String>, SyncError> {
    if SysCommand::rpm_query(package).status().await? != 0 {
        return Ok(None);
    }
    let version = SysCommand::rpm_query_version(package).execute_stdout().await?;
    Ok(Some(version))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installed_tracks_version_presence() {
        let installed = LocalState {
            installed_version: Some("5.2.1".into()),
            artifact_present: true,
            snapshot_present: true,
        };
        assert!(installed.installed());

        let absent = LocalState {
            installed_version: None,
            artifact_present: false,
            snapshot_present: false,
        };
        assert!(!absent.installed());
    }
}
