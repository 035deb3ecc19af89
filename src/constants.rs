//! Global constants used throughout the rpmsync codebase.
//!
//! Timeout durations, retry parameters, and the fixed file names that make
//! up the sync-directory layout. Defining them centrally keeps the layout
//! discoverable and the magic numbers in one place.

use std::time::Duration;

/// Default timeout for external commands (zypper, rpm, createrepo_c).
///
/// zypper refreshes repository metadata before installing, which can take
/// minutes on slow mirrors, so this is deliberately generous.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout for HTTP requests (listing, key, and version fetches).
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for the artifact download itself.
///
/// The artifact is a multi-megabyte RPM; give it more room than the small
/// text fetches get.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Default timeout for sync-directory lock acquisition.
pub const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum backoff delay for lock-acquisition retries (500ms).
pub const MAX_BACKOFF_DELAY_MS: u64 = 500;

/// Starting delay for lock-acquisition retries (10ms), doubling per attempt.
pub const STARTING_BACKOFF_DELAY_MS: u64 = 10;

/// Name of the advisory lock file inside the sync directory.
pub const LOCK_FILE_NAME: &str = ".rpmsync.lock";

/// Name of the remote-listing snapshot file inside the sync directory.
///
/// The previous generation is kept alongside it with a `-` suffix
/// (`listing.txt-`) for one-generation comparison.
pub const LISTING_FILE_NAME: &str = "listing.txt";

/// Name of the generated human-readable manifest inside the sync directory.
pub const MANIFEST_FILE_NAME: &str = "MANIFEST.txt";

/// Subdirectory created by the repository index generator.
pub const INDEX_SUBDIR: &str = "repodata";

/// Name of the self-check version cache inside the sync directory.
pub const VERSION_CACHE_FILE: &str = ".version_cache";

/// Default validity window for a cached self-check result (one day).
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 86_400;

/// Suffix appended to the artifact when it is moved aside for a direct
/// byte-comparison (the no-snapshot-baseline path).
pub const ASIDE_SUFFIX: &str = "-old";
