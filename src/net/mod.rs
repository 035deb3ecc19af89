//! HTTP retrieval and directory-listing extraction.
//!
//! All network access goes through one [`HttpClient`] so timeouts and the
//! user agent are applied uniformly. The listing extractor implements the
//! cheap change-detection proxy: one line of the upstream directory index
//! mentioning the artifact, compared textually between runs instead of
//! re-downloading a multi-megabyte RPM just to test for novelty.

use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::constants::{DOWNLOAD_TIMEOUT, HTTP_TIMEOUT};
use crate::core::SyncError;

/// Shared HTTP client with rpmsync's timeout and user-agent policy.
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    /// Build the client. Fails only if the TLS backend cannot initialize.
    pub fn new() -> Result<Self, SyncError> {
        let inner = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("rpmsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::HttpError {
                url: String::new(),
                reason: e.to_string(),
            })?;
        Ok(Self { inner })
    }

    /// Fetch a URL and return its body as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String, SyncError> {
        debug!(target: "net", "fetching {url}");
        let response = self.inner.get(url).send().await.map_err(|e| SyncError::HttpError {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus { url: url.to_string(), status: status.as_u16() });
        }
        response.text().await.map_err(|e| SyncError::HttpError {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    /// Download a URL to `dest`, returning the number of bytes written.
    ///
    /// The artifact-sized timeout applies here rather than the short text
    /// timeout. Bytes land in a temporary file next to `dest` and are moved
    /// into place only once complete, so an interrupted download never
    /// leaves a truncated artifact behind.
    pub async fn download_file(&self, url: &str, dest: &Path) -> Result<u64, SyncError> {
        debug!(target: "net", "downloading {url} -> {}", dest.display());
        let response = self
            .inner
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| SyncError::HttpError { url: url.to_string(), reason: e.to_string() })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::HttpStatus { url: url.to_string(), status: status.as_u16() });
        }
        let bytes = response.bytes().await.map_err(|e| SyncError::HttpError {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        let tmp = tempfile::NamedTempFile::new_in(parent)?;
        fs::write(tmp.path(), &bytes).await?;
        tmp.persist(dest).map_err(|e| SyncError::Io(e.error))?;
        debug!(target: "net", "wrote {} bytes to {}", bytes.len(), dest.display());
        Ok(bytes.len() as u64)
    }
}

/// Extract the artifact's line from a directory-listing page.
///
/// Returns the first line mentioning the artifact file name, trimmed. Works
/// on both plain-text indexes and simple HTML listings, since only textual
/// equality between runs matters, never the line's internal structure.
pub fn extract_listing_line(listing: &str, artifact: &str) -> Option<String> {
    let pattern = format!(r"(?m)^.*{}.*$", regex::escape(artifact));
    let re = Regex::new(&pattern).ok()?;
    re.find(listing).map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
<a href=\"../\">../</a>
<a href=\"megasync-openSUSE_Leap_15.6.x86_64.rpm\">megasync-openSUSE_Leap_15.6.x86_64.rpm</a>  07-Aug-2026 09:14  23M
<a href=\"repodata/\">repodata/</a>  07-Aug-2026 09:14  -
";

    #[test]
    fn finds_the_artifact_line() {
        let line = extract_listing_line(LISTING, "megasync-openSUSE_Leap_15.6.x86_64.rpm").unwrap();
        assert!(line.contains("07-Aug-2026 09:14  23M"));
        assert!(!line.contains("repodata"));
    }

    #[test]
    fn absent_artifact_yields_none() {
        assert_eq!(extract_listing_line(LISTING, "otherapp.rpm"), None);
    }

    #[test]
    fn artifact_names_are_matched_literally() {
        // Dots in the name must not act as regex wildcards.
        assert_eq!(extract_listing_line("megasyncXrpm\n", "megasync.rpm"), None);
    }
}
