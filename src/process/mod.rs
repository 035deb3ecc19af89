//! Type-safe builder for the external commands rpmsync orchestrates.
//!
//! The original implementation assembled command strings by variable
//! interpolation, with the quoting and injection hazards that brings. This
//! module replaces that with a fluent builder over explicit argument lists,
//! consistent timeout handling, and uniform logging of every invocation.
//!
//! # Examples
//!
//! ```rust,no_run
//! use rpmsync_cli::process::SysCommand;
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Query the rpm database; exit code 0 means "installed".
//! let code = SysCommand::rpm_query("megasync").status().await?;
//!
//! // Privileged steps escalate individually through sudo.
//! SysCommand::zypper_remove("megasync").execute_success().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Privilege Model
//!
//! Commands marked [`elevated`](SysCommand::elevated) are prefixed with
//! `sudo`, which may prompt the operator each time. rpmsync itself runs as a
//! regular user (enforced in [`crate::platform`]); there is no credential
//! caching beyond what sudo provides.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

use crate::constants::COMMAND_TIMEOUT;
use crate::core::SyncError;
use crate::platform::InstallFlavor;

/// Builder for one external command invocation.
///
/// Defaults: output captured, [`COMMAND_TIMEOUT`] applied, not elevated.
pub struct SysCommand {
    /// Program name, resolved via PATH.
    program: String,
    /// Explicit argument list; never joined into a shell string.
    args: Vec<String>,
    /// Whether to prefix the invocation with sudo.
    elevate: bool,
    /// Whether to capture output (true) or inherit stdio (false).
    capture_output: bool,
    /// Maximum duration to wait for completion (None = no timeout).
    timeout_duration: Option<Duration>,
}

/// Captured output of a completed command.
#[derive(Debug)]
pub struct CommandOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

impl SysCommand {
    /// Start building an invocation of `program`.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            elevate: false,
            capture_output: true,
            timeout_duration: Some(COMMAND_TIMEOUT),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a filesystem path as an argument.
    pub fn arg_path(self, path: impl AsRef<Path>) -> Self {
        self.arg(path.as_ref().display().to_string())
    }

    /// Run this command through sudo.
    pub const fn elevated(mut self) -> Self {
        self.elevate = true;
        self
    }

    /// Let the command write directly to the terminal instead of capturing.
    ///
    /// Used for invocations where the operator may need to interact (sudo
    /// password prompts on hosts without a usable askpass).
    pub const fn inherit_stdio(mut self) -> Self {
        self.capture_output = false;
        self
    }

    /// Set a custom timeout (None disables the timeout entirely).
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout_duration = duration;
        self
    }

    /// The operation label used in errors and logs: the first argument that
    /// is not an option flag, falling back to the program name.
    fn operation(&self) -> String {
        self.args
            .iter()
            .find(|a| !a.starts_with('-'))
            .cloned()
            .unwrap_or_else(|| self.program.clone())
    }

    /// The program/args pair actually spawned, after sudo prefixing.
    fn spawn_line(&self) -> (String, Vec<String>) {
        if self.elevate {
            let mut args = Vec::with_capacity(self.args.len() + 1);
            args.push(self.program.clone());
            args.extend(self.args.iter().cloned());
            ("sudo".to_string(), args)
        } else {
            (self.program.clone(), self.args.clone())
        }
    }

    /// Execute and return the raw exit status code, treating non-zero as a
    /// legitimate answer rather than a failure.
    ///
    /// This is the query form: `rpm -q` answers "not installed" with exit 1
    /// and that must not become an error.
    pub async fn status(self) -> Result<i32, SyncError> {
        let output = self.run().await?;
        Ok(output.0)
    }

    /// Execute, returning captured output; non-zero exit is an error.
    pub async fn execute(self) -> Result<CommandOutput, SyncError> {
        let program = self.program.clone();
        let operation = self.operation();
        let (code, stdout, stderr) = self.run().await?;
        if code != 0 {
            tracing::debug!(target: "proc", "{program} {operation} exited {code}: {}", stderr.trim());
            return Err(SyncError::CommandFailed { program, operation, code, stderr });
        }
        Ok(CommandOutput { stdout, stderr })
    }

    /// Execute and return only trimmed stdout; non-zero exit is an error.
    pub async fn execute_stdout(self) -> Result<String, SyncError> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Execute for effect only; non-zero exit is an error.
    pub async fn execute_success(self) -> Result<(), SyncError> {
        self.execute().await?;
        Ok(())
    }

    /// Spawn, wait (with timeout), and collect (code, stdout, stderr).
    async fn run(self) -> Result<(i32, String, String), SyncError> {
        let (program, args) = self.spawn_line();
        let operation = self.operation();

        tracing::debug!(target: "proc", "executing: {} {}", program, args.join(" "));

        let mut cmd = Command::new(&program);
        cmd.args(&args);
        if self.capture_output {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        }

        let output_future = cmd.output();
        let output = match self.timeout_duration {
            Some(duration) => match timeout(duration, output_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        target: "proc",
                        "command timed out after {}s: {} {}",
                        duration.as_secs(),
                        program,
                        args.join(" ")
                    );
                    return Err(SyncError::CommandTimeout {
                        program: self.program,
                        operation,
                        seconds: duration.as_secs(),
                    });
                }
            },
            None => output_future.await,
        };

        let output = output.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyncError::ToolNotFound { program: program.clone() }
            } else {
                SyncError::Io(e)
            }
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let code = output.status.code().unwrap_or(-1);
        tracing::trace!(target: "proc", "{program} {operation} exited {code}");
        Ok((code, stdout, stderr))
    }
}

// Convenience constructors for the fixed set of commands rpmsync drives.

impl SysCommand {
    /// `rpm -q <package>` - exit 0 means the package is installed.
    pub fn rpm_query(package: &str) -> Self {
        Self::new("rpm").args(["-q", package])
    }

    /// `rpm -q --qf %{VERSION} <package>` - the installed version string.
    pub fn rpm_query_version(package: &str) -> Self {
        Self::new("rpm").args(["-q", "--qf", "%{VERSION}", package])
    }

    /// `sudo rpm --import <key>` - import a signing key into the rpm
    /// trust database.
    pub fn rpm_import(key: &Path) -> Self {
        Self::new("rpm").arg("--import").arg_path(key).elevated()
    }

    /// `sudo rpm -U --force --nodeps <file>` - the low-level fallback
    /// install, explicitly bypassing dependency resolution.
    pub fn rpm_force_install(file: &Path) -> Self {
        Self::new("rpm").args(["-U", "--force", "--nodeps"]).arg_path(file).elevated()
    }

    /// `sudo zypper --non-interactive install <flavor flags> <package>`.
    pub fn zypper_install(flavor: InstallFlavor, package: &str) -> Self {
        Self::new("zypper")
            .args(["--non-interactive", "install"])
            .args(flavor.zypper_args().iter().copied())
            .arg(package)
            .elevated()
    }

    /// `sudo zypper --non-interactive remove <package>`.
    pub fn zypper_remove(package: &str) -> Self {
        Self::new("zypper").args(["--non-interactive", "remove"]).arg(package).elevated()
    }

    /// `zypper lr -u` - list configured media with their URIs.
    pub fn zypper_list_repos() -> Self {
        Self::new("zypper").args(["lr", "-u"])
    }

    /// `sudo zypper ar -f <dir> <alias>` - register the local repository.
    pub fn zypper_add_repo(dir: &Path, alias: &str) -> Self {
        Self::new("zypper").args(["ar", "-f"]).arg_path(dir).arg(alias).elevated()
    }

    /// `createrepo_c <dir>` - (re)generate the repository index in place.
    pub fn createrepo(dir: &Path) -> Self {
        Self::new("createrepo_c").arg_path(dir)
    }

    /// `sudo install -m 644 <src> <dst>` - copy a file into a system
    /// location with fixed permissions.
    pub fn install_file(src: &Path, dst: &Path) -> Self {
        Self::new("install").args(["-m", "644"]).arg_path(src).arg_path(dst).elevated()
    }
}

/// Verify a tool is resolvable on PATH without running it.
pub fn require_tool(program: &str) -> Result<(), SyncError> {
    which::which(program)
        .map(|_| ())
        .map_err(|_| SyncError::ToolNotFound { program: program.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_prefixes_sudo() {
        let cmd = SysCommand::zypper_remove("megasync");
        let (program, args) = cmd.spawn_line();
        assert_eq!(program, "sudo");
        assert_eq!(args, ["zypper", "--non-interactive", "remove", "megasync"]);
    }

    #[test]
    fn unelevated_commands_run_directly() {
        let (program, args) = SysCommand::rpm_query("megasync").spawn_line();
        assert_eq!(program, "rpm");
        assert_eq!(args, ["-q", "megasync"]);
    }

    #[test]
    fn operation_skips_option_flags() {
        assert_eq!(SysCommand::zypper_list_repos().operation(), "lr");
        assert_eq!(SysCommand::rpm_force_install(Path::new("/tmp/a.rpm")).operation(), "/tmp/a.rpm");
        assert_eq!(SysCommand::new("createrepo_c").operation(), "createrepo_c");
    }

    #[test]
    fn install_flavor_flags_reach_zypper() {
        let (_, args) = SysCommand::zypper_install(InstallFlavor::Force, "megasync").spawn_line();
        assert!(args.contains(&"--force".to_string()));
        let (_, args) =
            SysCommand::zypper_install(InstallFlavor::NoRecommends, "megasync").spawn_line();
        assert!(args.contains(&"--no-recommends".to_string()));
    }

    #[tokio::test]
    async fn status_reports_nonzero_without_error() {
        // `false` is POSIX-guaranteed to exit 1.
        let code = SysCommand::new("false").status().await.unwrap();
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn execute_rejects_nonzero() {
        let err = SysCommand::new("false").execute().await.unwrap_err();
        assert!(matches!(err, SyncError::CommandFailed { code: 1, .. }));
    }

    #[tokio::test]
    async fn missing_tool_is_reported_as_such() {
        let err = SysCommand::new("rpmsync-no-such-tool").status().await.unwrap_err();
        assert!(matches!(err, SyncError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn execute_stdout_trims() {
        let out = SysCommand::new("echo").arg("hello").execute_stdout().await.unwrap();
        assert_eq!(out, "hello");
    }
}
