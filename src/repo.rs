//! Local repository maintenance: index regeneration, the zypper media
//! entry, and the human-readable manifest.
//!
//! The sync directory doubles as a local package repository so the
//! high-level installer can resolve the artifact from it. Index
//! regeneration happens whenever the artifact changes; the media entry is
//! created once and then left alone; the manifest is descriptive output for
//! operators, never read back by this tool.

use anyhow::Result;
use chrono::Local;
use tokio::fs;
use tracing::debug;

use crate::config::SyncConfig;
use crate::constants::{INDEX_SUBDIR, LISTING_FILE_NAME};
use crate::core::{StepOutcome, SyncError};
use crate::process::SysCommand;

/// Maintains the local repository for one configuration.
pub struct RepoSynchronizer<'a> {
    config: &'a SyncConfig,
}

impl<'a> RepoSynchronizer<'a> {
    /// Build a synchronizer over the configured sync directory.
    pub const fn new(config: &'a SyncConfig) -> Self {
        Self { config }
    }

    /// Regenerate the repository index over the sync directory.
    pub async fn regenerate_index(&self) -> Result<(), SyncError> {
        SysCommand::createrepo(&self.config.sync_dir).execute_success().await?;
        debug!("repository index regenerated under {}", self.config.index_dir().display());
        Ok(())
    }

    /// Make sure zypper knows the sync directory as a named repository.
    ///
    /// Failure here is a warning, not fatal: the low-level fallback install
    /// works without a media entry.
    pub async fn ensure_media_entry(&self) -> StepOutcome {
        let listing = match SysCommand::zypper_list_repos().execute().await {
            Ok(output) => output.stdout,
            Err(e) => return StepOutcome::Warned(format!("could not list zypper media: {e}")),
        };

        if media_list_contains(&listing, &self.config.repo_alias) {
            return StepOutcome::Skipped(format!(
                "media entry '{}' already present",
                self.config.repo_alias
            ));
        }

        match SysCommand::zypper_add_repo(&self.config.sync_dir, &self.config.repo_alias)
            .execute_success()
            .await
        {
            Ok(()) => StepOutcome::Completed,
            Err(e) => {
                StepOutcome::Warned(format!("could not add zypper media entry: {e}"))
            }
        }
    }

    /// Write (or overwrite) the human-readable manifest.
    pub async fn write_manifest(&self) -> Result<()> {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let contents = manifest_contents(self.config, &now);
        fs::write(self.config.manifest_path(), contents).await?;
        Ok(())
    }
}

/// Whether a `zypper lr` table mentions the alias as a column value.
///
/// The output is a `|`-separated table; matching whole trimmed fields
/// avoids false positives from aliases that are substrings of another.
pub fn media_list_contains(listing: &str, alias: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split('|').any(|field| field.trim() == alias))
}

/// Render the manifest describing the sync directory's contents.
pub fn manifest_contents(config: &SyncConfig, generated_at: &str) -> String {
    format!(
        "Local package repository for {package}\n\
         Maintained by rpmsync; regenerated whenever the artifact changes.\n\
         Generated: {generated_at}\n\
         \n\
         artifact:          {artifact}\n\
         listing snapshot:  {listing} (previous generation: {listing}-)\n\
         signing key:       {key}\n\
         key checksum:      {key}.sha256\n\
         repository index:  {index}/\n",
        package = config.package,
        artifact = config.artifact,
        listing = LISTING_FILE_NAME,
        key = config.key_file,
        index = INDEX_SUBDIR,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const ZYPPER_LR: &str = "\
# | Alias             | Name                    | Enabled | GPG Check | Refresh | URI
--+-------------------+-------------------------+---------+-----------+---------+----
1 | repo-oss          | Main Repository (OSS)   | Yes     | (r ) Yes  | Yes     | http://download.opensuse.org/distribution/leap/15.6/repo/oss/
2 | rpmsync-megasync  | rpmsync-megasync        | Yes     | ( p) Yes  | Yes     | dir:/home/geeko/Downloads/megasync-sync
";

    #[test]
    fn alias_is_matched_as_a_whole_field() {
        assert!(media_list_contains(ZYPPER_LR, "rpmsync-megasync"));
        assert!(media_list_contains(ZYPPER_LR, "repo-oss"));
        // Substrings of an alias must not match.
        assert!(!media_list_contains(ZYPPER_LR, "megasync"));
        assert!(!media_list_contains(ZYPPER_LR, "rpmsync-other"));
    }

    fn config_in(dir: &TempDir) -> SyncConfig {
        SyncConfig {
            package: "megasync".into(),
            artifact: "megasync-openSUSE_Leap_15.6.x86_64.rpm".into(),
            listing_url: "https://example.org/".into(),
            artifact_url: "https://example.org/megasync.rpm".into(),
            key_url: "https://example.org/repo.key".into(),
            key_file: "repo.key".into(),
            repo_alias: "rpmsync-megasync".into(),
            trust_store_dir: PathBuf::from("/etc/pki/rpm-gpg"),
            sync_dir: dir.path().to_path_buf(),
            version_url: "https://example.org/VERSION".into(),
            check_interval: 3600,
        }
    }

    #[test]
    fn manifest_enumerates_the_layout() {
        let dir = TempDir::new().unwrap();
        let contents = manifest_contents(&config_in(&dir), "2026-08-07 10:00:00");
        assert!(contents.contains("megasync-openSUSE_Leap_15.6.x86_64.rpm"));
        assert!(contents.contains("listing.txt (previous generation: listing.txt-)"));
        assert!(contents.contains("repo.key"));
        assert!(contents.contains("repo.key.sha256"));
        assert!(contents.contains("repodata/"));
        assert!(contents.contains("2026-08-07 10:00:00"));
    }

    #[tokio::test]
    async fn manifest_is_written_into_the_sync_dir() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        RepoSynchronizer::new(&config).write_manifest().await.unwrap();
        let written = fs::read_to_string(config.manifest_path()).await.unwrap();
        assert!(written.starts_with("Local package repository for megasync"));
    }
}
