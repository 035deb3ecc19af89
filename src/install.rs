//! Package installation with a low-level fallback.
//!
//! The high-level path installs through zypper with the flags selected by
//! the environment validator. Whether it worked is judged solely by the rpm
//! database afterwards, not by zypper's exit code. If the package is still
//! absent, exactly one fallback runs: a forced rpm install of the
//! downloaded file with dependency resolution bypassed. Upstream declares a
//! dependency zypper sometimes cannot satisfy even when the dependency is
//! present on the host, so the fallback is a deliberate part of the
//! contract, not an afterthought.
//!
//! Neither failure aborts the run; the operator is left with both attempts
//! logged and durable state for the next run to reconcile.

use tracing::warn;

use crate::config::SyncConfig;
use crate::core::{StepOutcome, SyncError};
use crate::platform::InstallFlavor;
use crate::process::SysCommand;
use crate::state::installed_version;

/// Result of the install step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The rpm database reports the package installed.
    Installed {
        /// Whether the low-level fallback did the work.
        via_fallback: bool,
        /// Version now recorded in the rpm database.
        version: String,
    },
    /// Both attempts ran and the package is still absent.
    Failed,
}

/// Drives the install/upgrade attempt for one configuration.
pub struct Installer<'a> {
    config: &'a SyncConfig,
    flavor: InstallFlavor,
}

impl<'a> Installer<'a> {
    /// Build an installer using the flags selected at validation time.
    pub const fn new(config: &'a SyncConfig, flavor: InstallFlavor) -> Self {
        Self { config, flavor }
    }

    /// Attempt the high-level install, then at most one forced fallback.
    ///
    /// Errors propagate only from the rpm database queries; install
    /// failures themselves are absorbed into the outcome.
    pub async fn install_or_upgrade(&self) -> Result<InstallOutcome, SyncError> {
        if let Err(e) =
            SysCommand::zypper_install(self.flavor, &self.config.package).execute_success().await
        {
            warn!("high-level install did not succeed: {e}");
        }
        if let Some(version) = installed_version(&self.config.package).await? {
            return Ok(InstallOutcome::Installed { via_fallback: false, version });
        }

        warn!(
            "{} absent from the rpm database after zypper install, forcing a direct rpm install",
            self.config.package
        );
        if let Err(e) =
            SysCommand::rpm_force_install(&self.config.artifact_path()).execute_success().await
        {
            warn!("forced rpm install did not succeed: {e}");
        }
        match installed_version(&self.config.package).await? {
            Some(version) => Ok(InstallOutcome::Installed { via_fallback: true, version }),
            None => Ok(InstallOutcome::Failed),
        }
    }

    /// Remove the currently installed package ahead of a changed artifact.
    ///
    /// Removal failure is tolerated; the forced install path overwrites the
    /// old files anyway.
    pub async fn uninstall_current(&self) -> StepOutcome {
        match SysCommand::zypper_remove(&self.config.package).execute_success().await {
            Ok(()) => StepOutcome::Completed,
            Err(e) => StepOutcome::Warned(format!("could not remove old package: {e}")),
        }
    }
}

impl InstallOutcome {
    /// One-line summary for the step report.
    pub fn describe(&self, package: &str) -> String {
        match self {
            Self::Installed { via_fallback: false, version } => {
                format!("{package} {version} installed via zypper")
            }
            Self::Installed { via_fallback: true, version } => {
                format!("{package} {version} installed via forced rpm fallback")
            }
            Self::Failed => format!(
                "{package} could not be installed; see the log and retry after investigating"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_names_the_path_taken() {
        let direct =
            InstallOutcome::Installed { via_fallback: false, version: "5.2.1".into() };
        assert_eq!(direct.describe("megasync"), "megasync 5.2.1 installed via zypper");

        let fallback =
            InstallOutcome::Installed { via_fallback: true, version: "5.2.1".into() };
        assert!(fallback.describe("megasync").contains("forced rpm fallback"));

        assert!(InstallOutcome::Failed.describe("megasync").contains("could not be installed"));
    }
}
