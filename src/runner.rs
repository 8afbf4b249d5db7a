use crate::error::{Result, RunnerctlError};
use crate::exec::{self, CommandOutcome};
use crate::register::RegisterRequest;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

/// Bounded wait for registration and the other agent subcommands.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of one registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Success,
    Failed(i32),
    TimedOut,
}

/// Wrapper around the agent's own CLI (`gitlab-runner`).
///
/// The program path and timeout are injectable so tests can point at stub
/// executables with short deadlines.
pub struct RunnerCli {
    program: PathBuf,
    timeout: Duration,
}

impl Default for RunnerCli {
    fn default() -> Self {
        Self::new("gitlab-runner", DEFAULT_TIMEOUT)
    }
}

impl RunnerCli {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }

    /// Check that the agent CLI is on PATH.
    pub fn is_installed(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    /// Installed agent version, parsed from the `Version:` line of
    /// `gitlab-runner --version`.
    pub fn version(&self) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--version");
        let output = exec::run_checked(&mut cmd, self.timeout, "version probe")?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .find_map(|line| line.strip_prefix("Version:"))
            .map(|v| v.trim().to_string())
            .ok_or_else(|| {
                RunnerctlError::CommandFailed("no Version: line in version output".to_string())
            })
    }

    /// Probe whether this host's runner is already registered with the
    /// coordinator. A timeout counts as not registered.
    pub fn verify(&self, hostname: &str) -> Result<bool> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["verify", "-n", hostname]);
        match exec::run_with_timeout(&mut cmd, self.timeout)? {
            CommandOutcome::Completed(output) => Ok(output.status.success()),
            CommandOutcome::TimedOut => {
                tracing::warn!("registration probe timed out; assuming not registered");
                Ok(false)
            }
        }
    }

    /// Execute the registration command. On success the command itself
    /// writes the issued token into the global config artifact.
    pub fn register(&self, request: &RegisterRequest) -> Result<RegistrationOutcome> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("register").args(request.to_args());
        match exec::run_with_timeout(&mut cmd, self.timeout)? {
            CommandOutcome::Completed(output) => {
                exec::log_output("register", &output);
                if output.status.success() {
                    Ok(RegistrationOutcome::Success)
                } else {
                    Ok(RegistrationOutcome::Failed(
                        output.status.code().unwrap_or(-1),
                    ))
                }
            }
            CommandOutcome::TimedOut => Ok(RegistrationOutcome::TimedOut),
        }
    }

    /// Unregister every runner registered for this host.
    pub fn unregister_all(&self, hostname: &str) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["unregister", "-n", hostname, "--all-runners"]);
        exec::run_checked(&mut cmd, self.timeout, "unregister")?;
        Ok(())
    }

    /// List runners known to the local agent. The agent prints the listing
    /// on stderr, so both streams are returned.
    pub fn list(&self) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("list");
        let output = exec::run_checked(&mut cmd, self.timeout, "list")?;
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }

    pub fn start(&self) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("start");
        exec::run_checked(&mut cmd, self.timeout, "start")?;
        Ok(())
    }

    pub fn restart(&self) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("restart");
        exec::run_checked(&mut cmd, self.timeout, "restart")?;
        Ok(())
    }
}
