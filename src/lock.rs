//! Advisory locking of the sync directory.
//!
//! Two concurrent rpmsync runs would race on the artifact, the listing
//! snapshot, and the repository index. An OS-level file lock on
//! `.rpmsync.lock` inside the sync directory serializes them; the second
//! run waits with exponential backoff and gives up after a bounded timeout.
//! The lock is released when the guard drops.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tracing::debug;

use crate::constants::{
    LOCK_FILE_NAME, LOCK_TIMEOUT, MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS,
};

/// Exclusive lock over one sync directory.
///
/// Released on drop; the lock file itself is removed on release so stale
/// files do not accumulate.
#[derive(Debug)]
pub struct SyncLock {
    /// Keeping the handle open holds the OS lock.
    _file: Arc<File>,
    /// Path of the lock file, for cleanup on drop.
    lock_path: PathBuf,
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        debug!("sync-directory lock released");
        if let Err(e) = std::fs::remove_file(&self.lock_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                debug!("could not remove lock file {}: {e}", self.lock_path.display());
            }
        }
    }
}

impl SyncLock {
    /// Acquire the lock with the default timeout.
    pub async fn acquire(sync_dir: &Path) -> Result<Self> {
        Self::acquire_with_timeout(sync_dir, LOCK_TIMEOUT).await
    }

    /// Acquire the lock, waiting up to `timeout` with exponential backoff.
    ///
    /// File operations run under `spawn_blocking` so lock contention never
    /// stalls the async runtime.
    pub async fn acquire_with_timeout(sync_dir: &Path, timeout: Duration) -> Result<Self> {
        let lock_path = sync_dir.join(LOCK_FILE_NAME);
        debug!("waiting for sync-directory lock at {}", lock_path.display());

        let open_path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || {
            OpenOptions::new().create(true).write(true).truncate(false).open(&open_path)
        })
        .await
        .context("spawn_blocking panicked")?
        .with_context(|| format!("failed to open lock file {}", lock_path.display()))?;
        let file = Arc::new(file);

        let start = std::time::Instant::now();
        let backoff = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(Duration::from_millis(MAX_BACKOFF_DELAY_MS));

        for delay in backoff {
            let attempt = Arc::clone(&file);
            let locked = tokio::task::spawn_blocking(move || attempt.try_lock_exclusive())
                .await
                .context("spawn_blocking panicked")?;

            match locked {
                Ok(true) => {
                    debug!(wait_ms = start.elapsed().as_millis(), "sync-directory lock acquired");
                    return Ok(Self { _file: file, lock_path });
                }
                Ok(false) | Err(_) => {
                    let remaining = timeout.saturating_sub(start.elapsed());
                    if remaining.is_zero() {
                        anyhow::bail!(
                            "another rpmsync run holds the lock on {} (waited {:?})",
                            lock_path.display(),
                            timeout
                        );
                    }
                    tokio::time::sleep(delay.min(remaining)).await;
                }
            }
        }

        anyhow::bail!(
            "another rpmsync run holds the lock on {} (waited {:?})",
            lock_path.display(),
            timeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn acquire_and_release_cleans_up() {
        let dir = TempDir::new().unwrap();
        let lock = SyncLock::acquire(dir.path()).await.unwrap();

        let lock_path = dir.path().join(LOCK_FILE_NAME);
        assert!(lock_path.exists());

        drop(lock);
        assert!(!lock_path.exists());
    }

    #[tokio::test]
    async fn second_acquisition_times_out_while_held() {
        let dir = TempDir::new().unwrap();
        let _held = SyncLock::acquire(dir.path()).await.unwrap();

        let start = std::time::Instant::now();
        let result =
            SyncLock::acquire_with_timeout(dir.path(), Duration::from_millis(100)).await;
        assert!(result.is_err());
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(result.unwrap_err().to_string().contains("holds the lock"));
    }

    #[tokio::test]
    async fn released_lock_can_be_reacquired() {
        let dir = TempDir::new().unwrap();
        drop(SyncLock::acquire(dir.path()).await.unwrap());
        let again = SyncLock::acquire_with_timeout(dir.path(), Duration::from_millis(100)).await;
        assert!(again.is_ok());
    }
}
