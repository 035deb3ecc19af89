//! Signing-key management.
//!
//! The vendor's signing key must be present, intact, and imported before
//! any install attempt. The local copy is pinned by a recorded SHA-256
//! checksum on a trust-on-first-use basis; once recorded, a mismatch aborts
//! the whole run - a corrupted or tampered key is never used to proceed.
//!
//! Trust-store installation copies the key into the system keys directory
//! and imports it into the rpm database, both through sudo.

use anyhow::Result;
use tokio::fs;
use tracing::debug;

use crate::checksum;
use crate::config::SyncConfig;
use crate::core::StepOutcome;
use crate::net::HttpClient;
use crate::process::SysCommand;

/// Ensures the signing key is present, verified, and imported.
pub struct KeyManager<'a> {
    config: &'a SyncConfig,
    client: &'a HttpClient,
}

impl<'a> KeyManager<'a> {
    /// Build a key manager over the configured key locations.
    pub const fn new(config: &'a SyncConfig, client: &'a HttpClient) -> Self {
        Self { config, client }
    }

    /// Run the full key workflow: local copy, checksum, trust store.
    ///
    /// Returns an error for checksum mismatches (fatal) and for failures to
    /// obtain a key at all; trust-store trouble degrades to a warning
    /// outcome since the operator may have imported the key by other means.
    pub async fn ensure(&self) -> Result<StepOutcome> {
        self.ensure_local_key().await?;
        self.ensure_trust_store().await
    }

    /// Make sure a verified key file exists locally.
    ///
    /// An existing non-empty key is verified against its recorded checksum
    /// when one exists, or has a checksum recorded now (trust-on-first-use).
    /// A missing or empty key is fetched fresh.
    async fn ensure_local_key(&self) -> Result<()> {
        let key_path = self.config.key_path();
        let checksum_path = self.config.key_checksum_path();

        let key_size = fs::metadata(&key_path).await.map(|m| m.len()).unwrap_or(0);
        if key_size > 0 {
            if checksum_path.exists() {
                checksum::verify(&key_path, &checksum_path).await?;
                debug!("signing key verified against recorded checksum");
            } else {
                checksum::write_checksum_file(&key_path, &checksum_path).await?;
                debug!("no recorded checksum; trusting current key and recording one");
            }
            return Ok(());
        }

        debug!("no usable local key, fetching {}", self.config.key_url);
        self.client.download_file(&self.config.key_url, &key_path).await?;
        checksum::write_checksum_file(&key_path, &checksum_path).await?;
        Ok(())
    }

    /// Make sure the trust store holds exactly this key, importing on
    /// install or replacement.
    async fn ensure_trust_store(&self) -> Result<StepOutcome> {
        let key_path = self.config.key_path();
        let store_path = self.config.trust_store_key_path();

        if store_path.exists() {
            if checksum::files_identical(&key_path, &store_path).await? {
                return Ok(StepOutcome::Skipped(
                    "trust store already holds the current key".to_string(),
                ));
            }
            debug!("trust-store key differs from local key, replacing");
        }

        if let Err(e) = SysCommand::install_file(&key_path, &store_path).execute_success().await {
            return Ok(StepOutcome::Warned(format!(
                "could not place key in trust store: {e}"
            )));
        }
        if let Err(e) = SysCommand::rpm_import(&key_path).execute_success().await {
            return Ok(StepOutcome::Warned(format!("key import failed: {e}")));
        }
        Ok(StepOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Severity, SyncError};
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> SyncConfig {
        SyncConfig {
            package: "megasync".into(),
            artifact: "megasync.rpm".into(),
            listing_url: "https://example.org/".into(),
            artifact_url: "https://example.org/megasync.rpm".into(),
            key_url: "http://127.0.0.1:1/repo.key".into(),
            key_file: "repo.key".into(),
            repo_alias: "rpmsync-megasync".into(),
            trust_store_dir: dir.path().join("trust"),
            sync_dir: dir.path().to_path_buf(),
            version_url: "https://example.org/VERSION".into(),
            check_interval: 3600,
        }
    }

    #[tokio::test]
    async fn first_use_records_a_checksum() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::write(config.key_path(), b"key material").await.unwrap();

        let client = HttpClient::new().unwrap();
        KeyManager::new(&config, &client).ensure_local_key().await.unwrap();

        assert!(config.key_checksum_path().exists());
        checksum::verify(&config.key_path(), &config.key_checksum_path()).await.unwrap();
    }

    #[tokio::test]
    async fn tampered_key_aborts_fatally() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::write(config.key_path(), b"key material").await.unwrap();
        checksum::write_checksum_file(&config.key_path(), &config.key_checksum_path())
            .await
            .unwrap();
        fs::write(config.key_path(), b"evil key material").await.unwrap();

        let client = HttpClient::new().unwrap();
        let err = KeyManager::new(&config, &client).ensure().await.unwrap_err();
        let sync_err = err.downcast_ref::<SyncError>().unwrap();
        assert_eq!(sync_err.severity(), Severity::Fatal);
    }

    #[tokio::test]
    async fn missing_key_and_dead_endpoint_is_an_error_not_a_silent_pass() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);

        let client = HttpClient::new().unwrap();
        let err = KeyManager::new(&config, &client).ensure().await.unwrap_err();
        // Recoverable: the workflow warns and continues without the key.
        let sync_err = err.downcast_ref::<SyncError>().unwrap();
        assert_eq!(sync_err.severity(), Severity::Recoverable);
    }

    #[tokio::test]
    async fn identical_trust_store_key_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let config = config_in(&dir);
        fs::create_dir_all(&config.trust_store_dir).await.unwrap();
        fs::write(config.key_path(), b"key material").await.unwrap();
        fs::write(config.trust_store_key_path(), b"key material").await.unwrap();

        let client = HttpClient::new().unwrap();
        let outcome = KeyManager::new(&config, &client).ensure().await.unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped(_)));
    }
}
