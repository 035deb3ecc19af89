//! SHA-256 computation, checksum files, and byte-equality comparison.
//!
//! Checksums are computed in-process rather than by shelling out to
//! `sha256sum`; the on-disk checksum file stays `sha256sum`-compatible
//! (`<hex>  <filename>`) so operators can verify it by hand.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::core::SyncError;

/// Compute the hex-encoded SHA-256 digest of a file.
pub async fn sha256_hex(path: &Path) -> Result<String> {
    let contents = fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(hex::encode(hasher.finalize()))
}

/// Write a `sha256sum`-compatible checksum file for `target`.
///
/// Returns the digest that was recorded.
pub async fn write_checksum_file(target: &Path, checksum_file: &Path) -> Result<String> {
    let digest = sha256_hex(target).await?;
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    fs::write(checksum_file, format!("{digest}  {name}\n"))
        .await
        .with_context(|| format!("failed to write {}", checksum_file.display()))?;
    debug!("recorded sha256 {digest} for {}", target.display());
    Ok(digest)
}

/// Read the digest recorded in a checksum file (first whitespace token).
pub async fn read_recorded_digest(checksum_file: &Path) -> Result<String> {
    let content = fs::read_to_string(checksum_file)
        .await
        .with_context(|| format!("failed to read {}", checksum_file.display()))?;
    content
        .split_whitespace()
        .next()
        .map(str::to_string)
        .with_context(|| format!("{} contains no digest", checksum_file.display()))
}

/// Verify `target` against its checksum file.
///
/// A mismatch is returned as [`SyncError::ChecksumMismatch`], which the
/// workflow treats as fatal: a file that fails verification must never be
/// used to proceed.
pub async fn verify(target: &Path, checksum_file: &Path) -> Result<()> {
    let expected = read_recorded_digest(checksum_file).await?;
    let actual = sha256_hex(target).await?;
    // Digests may have been recorded uppercase by hand.
    if actual.to_lowercase() != expected.to_lowercase() {
        return Err(SyncError::ChecksumMismatch {
            path: target.to_path_buf(),
            expected,
            actual,
        }
        .into());
    }
    debug!("checksum verified for {}", target.display());
    Ok(())
}

/// Compare two files byte-for-byte.
pub async fn files_identical(a: &Path, b: &Path) -> Result<bool> {
    let (left, right) = (fs::read(a).await, fs::read(b).await);
    let left = left.with_context(|| format!("failed to read {}", a.display()))?;
    let right = right.with_context(|| format!("failed to read {}", b.display()))?;
    Ok(left == right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;
    use tempfile::TempDir;

    #[tokio::test]
    async fn known_digest_of_known_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data");
        fs::write(&path, b"Hello, World!").await.unwrap();
        assert_eq!(
            sha256_hex(&path).await.unwrap(),
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
    }

    #[tokio::test]
    async fn write_then_verify_roundtrip() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("repo.key");
        let sum = dir.path().join("repo.key.sha256");
        fs::write(&key, b"-----BEGIN PGP PUBLIC KEY BLOCK-----").await.unwrap();

        write_checksum_file(&key, &sum).await.unwrap();
        verify(&key, &sum).await.unwrap();

        // The file is sha256sum-compatible: "<hex>  <name>".
        let content = fs::read_to_string(&sum).await.unwrap();
        let mut parts = content.split_whitespace();
        assert_eq!(parts.next().unwrap().len(), 64);
        assert_eq!(parts.next().unwrap(), "repo.key");
    }

    #[tokio::test]
    async fn mismatch_is_fatal() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("repo.key");
        let sum = dir.path().join("repo.key.sha256");
        fs::write(&key, b"original").await.unwrap();
        write_checksum_file(&key, &sum).await.unwrap();
        fs::write(&key, b"tampered").await.unwrap();

        let err = verify(&key, &sum).await.unwrap_err();
        let sync_err = err.downcast_ref::<SyncError>().unwrap();
        assert!(matches!(sync_err, SyncError::ChecksumMismatch { .. }));
        assert_eq!(sync_err.severity(), Severity::Fatal);
    }

    #[tokio::test]
    async fn byte_comparison() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::write(&a, b"same bytes").await.unwrap();
        fs::write(&b, b"same bytes").await.unwrap();
        assert!(files_identical(&a, &b).await.unwrap());

        fs::write(&b, b"same byteZ").await.unwrap();
        assert!(!files_identical(&a, &b).await.unwrap());
    }
}
