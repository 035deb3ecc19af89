//! The linear synchronization workflow.
//!
//! One invocation runs the steps in a fixed order: validate → self-check →
//! inspect → detect → (synchronize, key check, install as the decision tree
//! dictates) → report. The driver here owns the continue-vs-abort judgment:
//! step failures go through [`Workflow::absorb`], which re-raises fatal
//! errors and converts everything else into a logged warning so the run can
//! move on to the next useful step.
//!
//! There is no rollback. A run that fails partway leaves durable state
//! (a downloaded artifact, a stale snapshot) for the next run to reconcile,
//! which the decision tree in [`crate::detect`] is built to handle.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::SyncConfig;
use crate::constants::ASIDE_SUFFIX;
use crate::core::{Severity, StepOutcome, SyncError};
use crate::detect::{self, Detection, SyncPlan};
use crate::install::{InstallOutcome, Installer};
use crate::keys::KeyManager;
use crate::lock::SyncLock;
use crate::net::{self, HttpClient};
use crate::platform::{self, InstallFlavor};
use crate::process;
use crate::repo::RepoSynchronizer;
use crate::report::Reporter;
use crate::selfcheck::{SelfCheck, UpdateStatus};
use crate::state::LocalState;

/// Runtime switches passed down from the CLI.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowOptions {
    /// Log the decisions but perform no mutations.
    pub dry_run: bool,
    /// Skip the advisory self-update check.
    pub skip_self_check: bool,
}

/// Run one full synchronization pass.
pub async fn run(config: SyncConfig, opts: WorkflowOptions) -> Result<()> {
    let reporter = Reporter::new();

    reporter.step("Validating environment");
    let env = platform::validate()?;
    if let Some(warning) = &env.release_warning {
        reporter.warn(warning);
    }
    reporter.info(&format!(
        "{} {} on {}, zypper install flags: {}",
        env.distro_id,
        env.release,
        platform::SUPPORTED_ARCH,
        env.flavor.zypper_args().join(" ")
    ));

    if !opts.dry_run {
        // Without these two nothing below can work; missing optional
        // helpers only degrade individual steps.
        for tool in ["rpm", "zypper"] {
            process::require_tool(tool)?;
        }
        for tool in ["createrepo_c", "sudo"] {
            if let Err(e) = process::require_tool(tool) {
                reporter.warn(&format!("{e}; dependent steps will fail"));
            }
        }
    }

    fs::create_dir_all(&config.sync_dir)
        .await
        .with_context(|| format!("failed to create {}", config.sync_dir.display()))?;
    let _lock = SyncLock::acquire(&config.sync_dir).await?;

    let client = HttpClient::new()?;

    if !opts.skip_self_check {
        reporter.step("Checking for a newer rpmsync");
        let check = SelfCheck::new(&config);
        match check.check(&client).await {
            UpdateStatus::UpToDate => reporter.info("rpmsync is up to date"),
            UpdateStatus::UpdateAvailable { latest } => {
                SelfCheck::display_banner(check.current_version(), &latest);
            }
            UpdateStatus::CheckFailed { reason } => {
                reporter.warn(&format!("could not check for a newer rpmsync: {reason}"));
            }
        }
    }

    reporter.step("Inspecting local state");
    let state = match LocalState::inspect(&config).await {
        Ok(state) => state,
        Err(e) if opts.dry_run => {
            reporter.warn(&format!("{e}; assuming the package is not installed"));
            LocalState {
                installed_version: None,
                artifact_present: config.artifact_path().exists(),
                snapshot_present: config.listing_path().exists(),
            }
        }
        Err(e) => return Err(e.into()),
    };
    reporter.info(&match &state.installed_version {
        Some(version) => format!("{} {version} is installed", config.package),
        None => format!("{} is not installed", config.package),
    });
    reporter.info(&format!(
        "previous artifact: {}, listing snapshot: {}",
        present(state.artifact_present),
        present(state.snapshot_present)
    ));

    let workflow = Workflow {
        flavor: env.flavor,
        config,
        client,
        reporter,
        dry_run: opts.dry_run,
    };
    match detect::classify(&state) {
        Detection::FreshInstall => workflow.run_fresh_install().await?,
        Detection::ArtifactCompare => workflow.run_artifact_compare(&state).await?,
        Detection::ListingCompare => workflow.run_listing_compare(&state).await?,
    }

    workflow.reporter.finish();
    Ok(())
}

const fn present(value: bool) -> &'static str {
    if value { "present" } else { "absent" }
}

/// State shared by the conditional steps of one run.
struct Workflow {
    config: SyncConfig,
    flavor: InstallFlavor,
    client: HttpClient,
    reporter: Reporter,
    dry_run: bool,
}

impl Workflow {
    /// Apply the per-step severity policy to a result.
    ///
    /// Fatal errors re-raise and abort the run; anything else becomes a
    /// logged warning and `None`, letting the caller continue or skip.
    fn absorb<T, E>(&self, what: &str, result: Result<T, E>) -> Result<Option<T>>
    where
        E: Into<anyhow::Error>,
    {
        match result.map_err(Into::into) {
            Ok(value) => Ok(Some(value)),
            Err(error) => {
                let fatal = error
                    .downcast_ref::<SyncError>()
                    .is_some_and(|e| e.severity() == Severity::Fatal);
                if fatal {
                    return Err(error);
                }
                self.reporter.warn(&format!("{what}: {error:#}"));
                Ok(None)
            }
        }
    }

    /// FRESH_INSTALL: nothing local yet, build everything from scratch.
    async fn run_fresh_install(&self) -> Result<()> {
        self.reporter.step("No local artifact; performing first-time synchronization");
        if self.dry_run {
            self.reporter.info(
                "dry-run: would download the artifact, build the local repository, \
                 verify the signing key, and install",
            );
            return Ok(());
        }
        self.synchronize(None).await
    }

    /// ARTIFACT_COMPARE: no listing baseline exists, so novelty can only be
    /// decided by re-downloading and comparing bytes.
    async fn run_artifact_compare(&self, state: &LocalState) -> Result<()> {
        self.reporter.step("No listing baseline; comparing artifact bytes with upstream");
        if self.dry_run {
            self.reporter.info(
                "dry-run: would move the artifact aside, re-download, and compare byte-for-byte",
            );
            return Ok(());
        }

        let current = self.config.artifact_path();
        let aside = with_suffix(&current, ASIDE_SUFFIX);
        let moved = self.absorb(
            "could not move the previous artifact aside",
            fs::rename(&current, &aside).await,
        )?;
        if moved.is_none() {
            return Ok(());
        }

        self.reporter.step(&format!("Downloading {}", self.config.artifact));
        let downloaded = self.absorb(
            "artifact download failed",
            self.client.download_file(&self.config.artifact_url, &current).await,
        )?;
        if downloaded.is_none() {
            self.reporter.info("will retry on the next run");
            return Ok(());
        }

        match self.absorb(
            "could not compare artifacts",
            crate::checksum::files_identical(&aside, &current).await,
        )? {
            Some(true) => {
                self.reporter.info("artifact is unchanged upstream; nothing to install");
                self.establish_snapshot_baseline().await
            }
            Some(false) => {
                self.reporter.step("Artifact changed upstream");
                if state.installed() {
                    self.remove_old_package().await;
                }
                self.post_download_sync(None).await
            }
            None => Ok(()),
        }
    }

    /// LISTING_COMPARE: the cheap path, one line of text decides.
    async fn run_listing_compare(&self, state: &LocalState) -> Result<()> {
        self.reporter.step("Fetching remote listing");
        let Some(fresh) =
            self.absorb("could not fetch the remote listing", self.fetch_listing().await)?
        else {
            self.reporter.info("cannot decide without a listing; leaving local state untouched");
            return Ok(());
        };
        let Some(saved) = self.absorb(
            "could not read the saved listing snapshot",
            fs::read_to_string(self.config.listing_path()).await,
        )?
        else {
            return Ok(());
        };

        match detect::resolve(detect::compare_listings(&saved, &fresh), state.installed()) {
            SyncPlan::NoOp => {
                self.reporter.info(&format!(
                    "no change detected; {} {} is already installed",
                    self.config.package,
                    state.installed_version.as_deref().unwrap_or("(unknown)")
                ));
                Ok(())
            }
            SyncPlan::InstallExisting => {
                self.reporter.step(
                    "No upstream change, but the package is absent; installing from the existing artifact",
                );
                // The on-disk artifact is used as-is here, without
                // re-validation (see DESIGN.md).
                if self.dry_run {
                    self.reporter.info("dry-run: would verify the key and install");
                    return Ok(());
                }
                self.verify_key_and_install().await
            }
            SyncPlan::Resync => {
                self.reporter.step("Upstream change detected");
                if self.dry_run {
                    self.reporter.info(
                        "dry-run: would rename the artifact aside, remove the old package, \
                         re-download, and install",
                    );
                    return Ok(());
                }

                let tag = state.installed_version.clone().unwrap_or_else(|| "previous".to_string());
                let aside = with_suffix(&self.config.artifact_path(), &format!("-{tag}"));
                self.absorb(
                    "could not rename the superseded artifact aside",
                    fs::rename(self.config.artifact_path(), &aside).await,
                )?;
                if state.installed() {
                    self.remove_old_package().await;
                }
                self.synchronize(Some(fresh)).await
            }
        }
    }

    /// Download the artifact, then run the shared post-download steps.
    async fn synchronize(&self, fresh_listing: Option<String>) -> Result<()> {
        self.reporter.step(&format!("Downloading {}", self.config.artifact));
        let downloaded = self.absorb(
            "artifact download failed",
            self.client.download_file(&self.config.artifact_url, &self.config.artifact_path()).await,
        )?;
        let Some(bytes) = downloaded else {
            self.reporter.info("leaving local state untouched; will retry on the next run");
            return Ok(());
        };
        self.reporter.info(&format!(
            "{bytes} bytes written to {}",
            self.config.artifact_path().display()
        ));
        self.post_download_sync(fresh_listing).await
    }

    /// Everything after a successful download: index, media entry, key,
    /// install, snapshot, manifest - in that order.
    async fn post_download_sync(&self, fresh_listing: Option<String>) -> Result<()> {
        let repo = RepoSynchronizer::new(&self.config);

        self.reporter.step("Regenerating repository index");
        self.absorb("repository index regeneration failed", repo.regenerate_index().await)?;

        match repo.ensure_media_entry().await {
            StepOutcome::Completed => self.reporter.info(&format!(
                "registered zypper media entry '{}'",
                self.config.repo_alias
            )),
            StepOutcome::Skipped(reason) => self.reporter.info(&reason),
            StepOutcome::Warned(reason) => self.reporter.warn(&reason),
        }

        self.verify_key_and_install().await?;

        self.reporter.step("Updating listing snapshot");
        let line = match fresh_listing {
            Some(line) => Some(line),
            None => self.absorb(
                "could not fetch the listing for the new snapshot",
                self.fetch_listing().await,
            )?,
        };
        if let Some(line) = line {
            self.absorb(
                "could not save the listing snapshot",
                detect::save_snapshot(&self.config, &line).await,
            )?;
        }

        self.absorb("could not write the manifest", repo.write_manifest().await)?;
        Ok(())
    }

    /// Key verification followed by the install attempt; shared between the
    /// full sync path and the install-from-existing-artifact branch.
    async fn verify_key_and_install(&self) -> Result<()> {
        self.reporter.step("Verifying signing key");
        if let Some(outcome) = self.absorb(
            "signing key could not be prepared",
            KeyManager::new(&self.config, &self.client).ensure().await,
        )? {
            match outcome {
                StepOutcome::Completed => self.reporter.info("signing key installed and imported"),
                StepOutcome::Skipped(reason) => self.reporter.info(&reason),
                StepOutcome::Warned(reason) => self.reporter.warn(&reason),
            }
        }

        self.reporter.step(&format!("Installing {}", self.config.package));
        if let Some(outcome) = self.absorb(
            "install attempt failed",
            Installer::new(&self.config, self.flavor).install_or_upgrade().await,
        )? {
            let summary = outcome.describe(&self.config.package);
            if outcome == InstallOutcome::Failed {
                self.reporter.warn(&summary);
            } else {
                self.reporter.info(&summary);
            }
        }
        Ok(())
    }

    /// Remove the installed package ahead of installing a changed artifact.
    async fn remove_old_package(&self) {
        self.reporter.step(&format!("Removing old {} before re-install", self.config.package));
        match Installer::new(&self.config, self.flavor).uninstall_current().await {
            StepOutcome::Warned(reason) => self.reporter.warn(&reason),
            _ => self.reporter.info("old package removed"),
        }
    }

    /// After confirming the on-disk artifact is current, record a listing
    /// baseline so the next run can use the cheap comparison path.
    async fn establish_snapshot_baseline(&self) -> Result<()> {
        let Some(line) = self.absorb(
            "could not fetch the listing to establish a baseline",
            self.fetch_listing().await,
        )?
        else {
            return Ok(());
        };
        self.absorb(
            "could not save the listing snapshot",
            detect::save_snapshot(&self.config, &line).await,
        )?;
        self.reporter.info("listing baseline established for future runs");
        Ok(())
    }

    /// Fetch the upstream directory listing and extract the artifact's line.
    async fn fetch_listing(&self) -> Result<String, SyncError> {
        let body = self.client.fetch_text(&self.config.listing_url).await?;
        net::extract_listing_line(&body, &self.config.artifact).ok_or_else(|| {
            SyncError::ListingEntryMissing {
                url: self.config.listing_url.clone(),
                artifact: self.config.artifact.clone(),
            }
        })
    }
}

/// Append a suffix to a path's final component.
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_lands_on_the_file_name() {
        assert_eq!(
            with_suffix(Path::new("/sync/megasync.rpm"), "-old"),
            PathBuf::from("/sync/megasync.rpm-old")
        );
        assert_eq!(
            with_suffix(Path::new("/sync/megasync.rpm"), "-5.2.1"),
            PathBuf::from("/sync/megasync.rpm-5.2.1")
        );
    }
}
