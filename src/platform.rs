//! Environment validation and install-flag selection.
//!
//! rpmsync targets exactly one platform: 64-bit openSUSE. This module reads
//! the host's os-release data, fails fast on anything else, and selects the
//! zypper install flags appropriate for the detected release.
//!
//! # Checks, in order
//!
//! 1. Distribution `ID` must be in the openSUSE family - fatal otherwise.
//! 2. Architecture must be `x86_64` - fatal otherwise.
//! 3. `VERSION_ID` must be a known release - unknown releases get a
//!    non-fatal warning and the default flag set (forward-compatibility
//!    escape hatch for releases newer than this binary).
//!
//! Additionally, running as root is refused: the sync directory belongs to
//! the invoking user and privileged steps escalate individually via sudo.

use std::collections::HashMap;
use std::path::Path;

use crate::core::SyncError;

/// Default location of the os-release data on the host.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// The single supported architecture identifier.
pub const SUPPORTED_ARCH: &str = "x86_64";

/// Releases this tool knows, with their install-flag variant.
///
/// Leap 15.4 through 15.6 take `--force` so zypper reinstalls an equal
/// version after a repository rebuild; 15.3 ships a zypper old enough that
/// the recommends chain drags in unresolvable packages, so it gets
/// `--no-recommends` instead.
pub const SUPPORTED_RELEASES: &[(&str, InstallFlavor)] = &[
    ("15.3", InstallFlavor::NoRecommends),
    ("15.4", InstallFlavor::Force),
    ("15.5", InstallFlavor::Force),
    ("15.6", InstallFlavor::Force),
];

/// Release-specific variant of the high-level install invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallFlavor {
    /// `zypper install --force` - reinstall even if the version is equal.
    Force,
    /// `zypper install --no-recommends` - skip the recommends chain.
    NoRecommends,
}

impl InstallFlavor {
    /// The extra arguments this variant adds to `zypper install`.
    pub const fn zypper_args(self) -> &'static [&'static str] {
        match self {
            Self::Force => &["--force"],
            Self::NoRecommends => &["--no-recommends"],
        }
    }
}

/// The validated host environment, produced once at startup.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Distribution `ID` from os-release (e.g. `opensuse-leap`).
    pub distro_id: String,
    /// `VERSION_ID` from os-release (e.g. `15.6`).
    pub release: String,
    /// Install-flag variant selected for this release.
    pub flavor: InstallFlavor,
    /// Set when the release is unknown and the default variant was assumed.
    pub release_warning: Option<String>,
}

/// Validate the running host and select install flags.
///
/// Reads os-release from `RPMSYNC_OS_RELEASE` (test override) or
/// [`OS_RELEASE_PATH`], and refuses to proceed as root.
pub fn validate() -> Result<Environment, SyncError> {
    let path = std::env::var("RPMSYNC_OS_RELEASE")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| Path::new(OS_RELEASE_PATH).to_path_buf());
    let content = std::fs::read_to_string(&path)?;
    validate_host(&content, std::env::consts::ARCH, nix::unistd::geteuid().is_root())
}

/// Pure validation core, separated from process state for testability.
pub fn validate_host(
    os_release: &str,
    arch: &str,
    is_root: bool,
) -> Result<Environment, SyncError> {
    if is_root {
        return Err(SyncError::RootInvocation);
    }

    let fields = parse_os_release(os_release);
    let distro_id = fields.get("ID").cloned().unwrap_or_default();
    if !distro_supported(&distro_id) {
        return Err(SyncError::UnsupportedDistribution { found: distro_id });
    }

    if arch != SUPPORTED_ARCH {
        return Err(SyncError::UnsupportedArchitecture { found: arch.to_string() });
    }

    let release = fields.get("VERSION_ID").cloned().unwrap_or_default();
    let (flavor, release_warning) = match flavor_for_release(&release) {
        Some(flavor) => (flavor, None),
        None => (
            InstallFlavor::Force,
            Some(format!(
                "release '{release}' is not in the supported set; proceeding with default install flags"
            )),
        ),
    };

    Ok(Environment { distro_id, release, flavor, release_warning })
}

/// True for any member of the openSUSE family (`opensuse`, `opensuse-leap`,
/// `opensuse-tumbleweed`, ...).
pub fn distro_supported(id: &str) -> bool {
    id == "opensuse" || id.starts_with("opensuse-")
}

/// Look up the install-flag variant for a release identifier.
pub fn flavor_for_release(version_id: &str) -> Option<InstallFlavor> {
    SUPPORTED_RELEASES
        .iter()
        .find(|(release, _)| *release == version_id)
        .map(|(_, flavor)| *flavor)
}

/// Parse os-release `KEY=value` lines into a map, stripping quotes.
///
/// Comment lines and lines without `=` are ignored, matching what the
/// os-release format allows.
pub fn parse_os_release(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            Some((key.to_string(), value.trim_matches('"').to_string()))
        })
        .collect()
}
