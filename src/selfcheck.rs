//! Advisory self-update check.
//!
//! rpmsync fetches the latest published version identifier of itself and
//! compares it textually against the running binary's version. The check
//! never replaces the running binary; it only warns and tells the operator
//! where to obtain the update.
//!
//! A fetch failure is a distinct [`UpdateStatus::CheckFailed`] outcome - it
//! is reported as "could not check", never silently treated as "up to
//! date". Results are cached with a timestamp so repeated runs inside the
//! configured interval skip the network round-trip.

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use crate::config::SyncConfig;
use crate::net::HttpClient;

/// Outcome of one self-update check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    /// The published version matches the running one.
    UpToDate,
    /// A different version is published upstream.
    UpdateAvailable {
        /// The version identifier published upstream.
        latest: String,
    },
    /// The published version could not be determined.
    CheckFailed {
        /// Why the check could not complete.
        reason: String,
    },
}

/// Cached result of a previous check.
#[derive(Debug, Serialize, Deserialize)]
struct CheckCache {
    /// The version identifier fetched from upstream.
    latest: String,
    /// When the fetch happened.
    checked_at: DateTime<Utc>,
}

impl CheckCache {
    fn is_valid(&self, interval_secs: u64) -> bool {
        let age = Utc::now() - self.checked_at;
        age.num_seconds() >= 0 && (age.num_seconds() as u64) < interval_secs
    }
}

/// The self-update checker.
pub struct SelfCheck {
    version_url: String,
    current: String,
    cache_path: PathBuf,
    interval_secs: u64,
}

impl SelfCheck {
    /// Build a checker for the running binary against the configured
    /// version endpoint.
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            version_url: config.version_url.clone(),
            current: env!("CARGO_PKG_VERSION").to_string(),
            cache_path: config.version_cache_path(),
            interval_secs: config.check_interval,
        }
    }

    /// The version of the running binary.
    pub fn current_version(&self) -> &str {
        &self.current
    }

    /// Run the check, consulting the cache first.
    ///
    /// Never returns an error: every failure mode collapses into
    /// [`UpdateStatus::CheckFailed`] so the workflow can log it and move on.
    pub async fn check(&self, client: &HttpClient) -> UpdateStatus {
        if let Some(cache) = self.load_cache().await {
            if cache.is_valid(self.interval_secs) {
                debug!("self-check cache is fresh (checked {})", cache.checked_at);
                return self.status_for(&cache.latest);
            }
        }

        let latest = match client.fetch_text(&self.version_url).await {
            Ok(body) => body.trim().to_string(),
            Err(e) => return UpdateStatus::CheckFailed { reason: e.to_string() },
        };
        if latest.is_empty() {
            return UpdateStatus::CheckFailed {
                reason: format!("{} returned an empty version", self.version_url),
            };
        }

        self.save_cache(&CheckCache { latest: latest.clone(), checked_at: Utc::now() }).await;
        self.status_for(&latest)
    }

    /// Comparison is textual, mirroring the change detector: any difference
    /// counts, no semantic version ordering.
    fn status_for(&self, latest: &str) -> UpdateStatus {
        if latest == self.current {
            UpdateStatus::UpToDate
        } else {
            UpdateStatus::UpdateAvailable { latest: latest.to_string() }
        }
    }

    async fn load_cache(&self) -> Option<CheckCache> {
        let content = fs::read_to_string(&self.cache_path).await.ok()?;
        serde_json::from_str(&content).ok()
    }

    async fn save_cache(&self, cache: &CheckCache) {
        // Cache writes are best-effort; a failed write just means one more
        // fetch next run.
        if let Ok(content) = serde_json::to_string_pretty(cache) {
            if let Err(e) = fs::write(&self.cache_path, content).await {
                debug!("could not write version cache: {e}");
            }
        }
    }

    /// Print the advisory update banner.
    pub fn display_banner(current: &str, latest: &str) {
        eprintln!();
        eprintln!("{}", "=".repeat(60).bright_cyan());
        eprintln!("  A newer rpmsync is available");
        eprintln!();
        eprintln!("  running version:   {}", current.yellow());
        eprintln!("  published version: {}", latest.green().bold());
        eprintln!();
        eprintln!("  Get it from https://github.com/opensuse-tools/rpmsync/releases");
        eprintln!("  (rpmsync never replaces itself automatically)");
        eprintln!("{}", "=".repeat(60).bright_cyan());
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn checker(dir: &TempDir, version_url: &str) -> SelfCheck {
        SelfCheck {
            version_url: version_url.to_string(),
            current: env!("CARGO_PKG_VERSION").to_string(),
            cache_path: dir.path().join(".version_cache"),
            interval_secs: 3600,
        }
    }

    #[test]
    fn cache_expires_by_interval() {
        let fresh = CheckCache { latest: "9.9.9".into(), checked_at: Utc::now() };
        assert!(fresh.is_valid(3600));
        assert!(!fresh.is_valid(0));

        let stale = CheckCache {
            latest: "9.9.9".into(),
            checked_at: Utc::now() - chrono::Duration::hours(2),
        };
        assert!(!stale.is_valid(3600));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_check_failed_not_up_to_date() {
        let dir = TempDir::new().unwrap();
        // Port 1 on loopback: connection refused, no network dependency.
        let check = checker(&dir, "http://127.0.0.1:1/VERSION");
        let status = check.check(&HttpClient::new().unwrap()).await;
        assert!(matches!(status, UpdateStatus::CheckFailed { .. }));
    }

    #[tokio::test]
    async fn fresh_cache_short_circuits_the_network() {
        let dir = TempDir::new().unwrap();
        let check = checker(&dir, "http://127.0.0.1:1/VERSION");

        // Seed a fresh cache that matches the running version: the checker
        // must answer from it instead of hitting the dead endpoint.
        let cache = CheckCache {
            latest: env!("CARGO_PKG_VERSION").to_string(),
            checked_at: Utc::now(),
        };
        fs::write(&check.cache_path, serde_json::to_string(&cache).unwrap()).await.unwrap();

        let status = check.check(&HttpClient::new().unwrap()).await;
        assert_eq!(status, UpdateStatus::UpToDate);
    }

    #[test]
    fn differing_version_is_an_update() {
        let dir = TempDir::new().unwrap();
        let check = checker(&dir, "http://127.0.0.1:1/VERSION");
        assert!(matches!(
            check.status_for("99.0.0"),
            UpdateStatus::UpdateAvailable { .. }
        ));
        assert_eq!(check.status_for(env!("CARGO_PKG_VERSION")), UpdateStatus::UpToDate);
    }
}
