//! Configuration management for rpmsync
//!
//! The original implementation kept its knobs in ambient shell variables.
//! Here everything a step needs lives in one explicit [`SyncConfig`] that is
//! threaded through the workflow: the tracked package, the upstream URLs,
//! and the sync-directory layout.
//!
//! # Configuration File
//!
//! An optional TOML file overrides the built-in defaults field by field:
//!
//! **Location priority:**
//! 1. `--config <path>` on the command line
//! 2. `RPMSYNC_CONFIG` environment variable
//! 3. `~/.config/rpmsync/config.toml`
//!
//! ```toml
//! package = "megasync"
//! artifact = "megasync-openSUSE_Leap_15.6.x86_64.rpm"
//! listing_url = "https://mega.nz/linux/repo/openSUSE_Leap_15.6/x86_64/"
//! sync_dir = "/data/mirrors/megasync"
//! ```
//!
//! A missing file is not an error; rpmsync then runs entirely on defaults.
//!
//! # Sync-Directory Layout
//!
//! All durable state lives under one directory (by default
//! `<downloads>/<package>-sync/`):
//!
//! ```text
//! megasync-sync/
//! ├── megasync-openSUSE_Leap_15.6.x86_64.rpm   the tracked artifact
//! ├── megasync-...rpm-3.8.1                    aside-renamed predecessor
//! ├── listing.txt                              remote-listing snapshot
//! ├── listing.txt-                             previous-generation backup
//! ├── repo.key                                 vendor signing key
//! ├── repo.key.sha256                          its recorded checksum
//! ├── MANIFEST.txt                             human-readable inventory
//! └── repodata/                                generated repository index
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use crate::constants::{
    DEFAULT_CHECK_INTERVAL_SECS, INDEX_SUBDIR, LISTING_FILE_NAME, MANIFEST_FILE_NAME,
    VERSION_CACHE_FILE,
};
use crate::core::SyncError;

/// Field-by-field overrides read from the optional TOML configuration file.
///
/// Every field is optional; anything absent falls back to the built-in
/// default in [`SyncConfig::defaults`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Package name as known to the rpm database.
    pub package: Option<String>,
    /// Remote artifact file name (also the local file name).
    pub artifact: Option<String>,
    /// URL of the upstream directory listing.
    pub listing_url: Option<String>,
    /// Full URL of the artifact; defaults to `listing_url` + `artifact`.
    pub artifact_url: Option<String>,
    /// URL of the vendor signing key.
    pub key_url: Option<String>,
    /// Local file name for the signing key.
    pub key_file: Option<String>,
    /// zypper media alias for the local repository.
    pub repo_alias: Option<String>,
    /// Directory holding system-wide trusted signing keys.
    pub trust_store_dir: Option<PathBuf>,
    /// Directory holding all rpmsync state.
    pub sync_dir: Option<PathBuf>,
    /// URL publishing the latest rpmsync version identifier.
    pub version_url: Option<String>,
    /// Seconds a cached self-check result stays valid.
    pub check_interval: Option<u64>,
}

/// Fully-resolved runtime configuration, threaded through every step.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Package name as known to the rpm database.
    pub package: String,
    /// Remote artifact file name (also the local file name).
    pub artifact: String,
    /// URL of the upstream directory listing.
    pub listing_url: String,
    /// Full URL of the artifact.
    pub artifact_url: String,
    /// URL of the vendor signing key.
    pub key_url: String,
    /// Local file name for the signing key.
    pub key_file: String,
    /// zypper media alias for the local repository.
    pub repo_alias: String,
    /// Directory holding system-wide trusted signing keys.
    pub trust_store_dir: PathBuf,
    /// Directory holding all rpmsync state.
    pub sync_dir: PathBuf,
    /// URL publishing the latest rpmsync version identifier.
    pub version_url: String,
    /// Seconds a cached self-check result stays valid.
    pub check_interval: u64,
}

impl SyncConfig {
    /// Built-in defaults: the MEGAsync desktop client on openSUSE Leap 15.6.
    ///
    /// Fails only when no downloads directory can be resolved for the
    /// invoking user (and none was configured).
    pub fn defaults() -> Result<Self, SyncError> {
        let package = "megasync".to_string();
        let listing_url = "https://mega.nz/linux/repo/openSUSE_Leap_15.6/x86_64/".to_string();
        let artifact = "megasync-openSUSE_Leap_15.6.x86_64.rpm".to_string();
        Ok(Self {
            artifact_url: format!("{listing_url}{artifact}"),
            key_url: format!("{listing_url}repodata/repomd.xml.key"),
            sync_dir: default_sync_dir(&package)?,
            package,
            artifact,
            listing_url,
            key_file: "repo.key".to_string(),
            repo_alias: "rpmsync-megasync".to_string(),
            trust_store_dir: PathBuf::from("/etc/pki/rpm-gpg"),
            version_url: "https://raw.githubusercontent.com/opensuse-tools/rpmsync/main/VERSION"
                .to_string(),
            check_interval: DEFAULT_CHECK_INTERVAL_SECS,
        })
    }

    /// Load the configuration, applying file overrides on top of defaults.
    ///
    /// `path_override` comes from `--config`; otherwise `RPMSYNC_CONFIG` and
    /// the default location are consulted in that order. A missing file
    /// yields plain defaults; an unreadable or invalid file is an error.
    pub async fn load(path_override: Option<PathBuf>) -> Result<Self, SyncError> {
        let path = match path_override {
            Some(p) => Some(p),
            None => config_path(),
        };

        let Some(path) = path else {
            return Self::defaults();
        };
        if !path.exists() {
            debug!("no configuration file at {}, using defaults", path.display());
            return Self::defaults();
        }

        let content = fs::read_to_string(&path).await.map_err(|e| SyncError::ConfigError {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let file: FileConfig = toml::from_str(&content).map_err(|e| SyncError::ConfigError {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        debug!("loaded configuration overrides from {}", path.display());
        Self::defaults().map(|d| d.merged(file))
    }

    /// Apply file overrides on top of this configuration.
    ///
    /// `artifact_url` tracks `listing_url` + `artifact` unless the file pins
    /// it explicitly.
    pub fn merged(self, file: FileConfig) -> Self {
        let package = file.package.unwrap_or(self.package);
        let listing_url = file.listing_url.unwrap_or(self.listing_url);
        let artifact = file.artifact.unwrap_or(self.artifact);
        let artifact_url =
            file.artifact_url.unwrap_or_else(|| format!("{listing_url}{artifact}"));
        Self {
            repo_alias: file.repo_alias.unwrap_or_else(|| format!("rpmsync-{package}")),
            package,
            artifact,
            listing_url,
            artifact_url,
            key_url: file.key_url.unwrap_or(self.key_url),
            key_file: file.key_file.unwrap_or(self.key_file),
            trust_store_dir: file.trust_store_dir.unwrap_or(self.trust_store_dir),
            sync_dir: file.sync_dir.unwrap_or(self.sync_dir),
            version_url: file.version_url.unwrap_or(self.version_url),
            check_interval: file.check_interval.unwrap_or(self.check_interval),
        }
    }

    /// Replace the sync directory (the `--sync-dir` flag).
    #[must_use]
    pub fn with_sync_dir(mut self, dir: PathBuf) -> Self {
        self.sync_dir = dir;
        self
    }

    /// Path of the local artifact copy.
    pub fn artifact_path(&self) -> PathBuf {
        self.sync_dir.join(&self.artifact)
    }

    /// Path of the remote-listing snapshot.
    pub fn listing_path(&self) -> PathBuf {
        self.sync_dir.join(LISTING_FILE_NAME)
    }

    /// Path of the previous-generation listing backup (`listing.txt-`).
    pub fn listing_backup_path(&self) -> PathBuf {
        self.sync_dir.join(format!("{LISTING_FILE_NAME}-"))
    }

    /// Path of the local signing-key copy.
    pub fn key_path(&self) -> PathBuf {
        self.sync_dir.join(&self.key_file)
    }

    /// Path of the signing key's recorded checksum file.
    pub fn key_checksum_path(&self) -> PathBuf {
        self.sync_dir.join(format!("{}.sha256", self.key_file))
    }

    /// Path of the signing key inside the system trust store.
    pub fn trust_store_key_path(&self) -> PathBuf {
        self.trust_store_dir.join(format!("RPM-GPG-KEY-{}", self.package))
    }

    /// Path of the generated human-readable manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.sync_dir.join(MANIFEST_FILE_NAME)
    }

    /// Path of the generated repository index directory.
    pub fn index_dir(&self) -> PathBuf {
        self.sync_dir.join(INDEX_SUBDIR)
    }

    /// Path of the self-check version cache.
    pub fn version_cache_path(&self) -> PathBuf {
        self.sync_dir.join(VERSION_CACHE_FILE)
    }
}

/// Resolve the configuration-file path from the environment.
fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("RPMSYNC_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("rpmsync").join("config.toml"))
}

/// Default sync directory: `<downloads>/<package>-sync`.
///
/// Falls back to `~/Downloads` when the platform reports no downloads
/// directory (headless hosts commonly lack the XDG entry).
fn default_sync_dir(package: &str) -> Result<PathBuf, SyncError> {
    let downloads = dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .ok_or(SyncError::NoDownloadsDir)?;
    Ok(downloads.join(format!("{package}-sync")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn base() -> SyncConfig {
        SyncConfig {
            package: "megasync".into(),
            artifact: "megasync-openSUSE_Leap_15.6.x86_64.rpm".into(),
            listing_url: "https://mega.nz/linux/repo/openSUSE_Leap_15.6/x86_64/".into(),
            artifact_url:
                "https://mega.nz/linux/repo/openSUSE_Leap_15.6/x86_64/megasync-openSUSE_Leap_15.6.x86_64.rpm"
                    .into(),
            key_url: "https://mega.nz/linux/repo/openSUSE_Leap_15.6/x86_64/repodata/repomd.xml.key"
                .into(),
            key_file: "repo.key".into(),
            repo_alias: "rpmsync-megasync".into(),
            trust_store_dir: PathBuf::from("/etc/pki/rpm-gpg"),
            sync_dir: PathBuf::from("/home/geeko/Downloads/megasync-sync"),
            version_url: "https://example.org/VERSION".into(),
            check_interval: DEFAULT_CHECK_INTERVAL_SECS,
        }
    }

    #[test]
    fn layout_paths_hang_off_the_sync_dir() {
        let config = base();
        assert_eq!(
            config.listing_path(),
            Path::new("/home/geeko/Downloads/megasync-sync/listing.txt")
        );
        assert_eq!(
            config.listing_backup_path(),
            Path::new("/home/geeko/Downloads/megasync-sync/listing.txt-")
        );
        assert_eq!(
            config.key_checksum_path(),
            Path::new("/home/geeko/Downloads/megasync-sync/repo.key.sha256")
        );
        assert_eq!(
            config.index_dir(),
            Path::new("/home/geeko/Downloads/megasync-sync/repodata")
        );
    }

    #[test]
    fn trust_store_key_is_named_after_the_package() {
        assert_eq!(
            base().trust_store_key_path(),
            Path::new("/etc/pki/rpm-gpg/RPM-GPG-KEY-megasync")
        );
    }

    #[test]
    fn merged_rederives_dependent_fields() {
        let file: FileConfig = toml::from_str(
            r#"
            package = "vendorapp"
            artifact = "vendorapp.rpm"
            listing_url = "https://pkg.vendor.example/suse/"
            "#,
        )
        .unwrap();
        let merged = base().merged(file);
        assert_eq!(merged.artifact_url, "https://pkg.vendor.example/suse/vendorapp.rpm");
        assert_eq!(merged.repo_alias, "rpmsync-vendorapp");
        // Untouched fields keep their defaults.
        assert_eq!(merged.key_file, "repo.key");
    }

    #[test]
    fn explicit_artifact_url_wins_over_derivation() {
        let file: FileConfig = toml::from_str(
            r#"artifact_url = "https://cdn.vendor.example/direct.rpm""#,
        )
        .unwrap();
        let merged = base().merged(file);
        assert_eq!(merged.artifact_url, "https://cdn.vendor.example/direct.rpm");
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let parsed: Result<FileConfig, _> = toml::from_str(r#"pacakge = "typo""#);
        assert!(parsed.is_err());
    }
}
