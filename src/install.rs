use crate::backend::BackendKind;
use crate::config::Config;
use crate::error::Result;
use crate::exec;
use crate::paths::{Paths, EXECUTOR_SCRIPTS};
use crate::runner::RunnerCli;
use crate::state::StateFile;
use std::os::unix::fs::PermissionsExt;
use std::process::Command;
use std::time::Duration;

pub const APT_UPDATE_TIMEOUT: Duration = Duration::from_secs(120);
pub const APT_UPGRADE_TIMEOUT: Duration = Duration::from_secs(600);
pub const APT_AUTOREMOVE_TIMEOUT: Duration = Duration::from_secs(120);
const APT_INSTALL_TIMEOUT: Duration = Duration::from_secs(600);
const SERVICE_TIMEOUT: Duration = Duration::from_secs(30);

/// System user the custom executor runs as.
const RUNNER_USER: &str = "gitlab-runner";
const LXD_GROUP: &str = "lxd";

fn apt(args: &[&str], timeout: Duration) -> Result<()> {
    let mut cmd = Command::new("apt-get");
    cmd.arg("-y")
        .args(args)
        .env("GITLAB_RUNNER_DISABLE_SKEL", "true")
        .env("DEBIAN_FRONTEND", "noninteractive");
    let context = format!("apt-get {}", args.join(" "));
    let output = exec::run_checked(&mut cmd, timeout, &context)?;
    exec::log_output(&context, &output);
    Ok(())
}

/// Install the agent package, provision the configured backend and start
/// the agent service. An unsupported backend is fatal to the provisioning
/// attempt.
pub fn install(config: &Config, paths: &Paths, runner: &RunnerCli, state: &StateFile) -> Result<()> {
    let backend = BackendKind::select(&config.backend)?;

    apt(&["install", "gitlab-runner"], APT_INSTALL_TIMEOUT)?;

    match backend {
        BackendKind::Docker => install_docker()?,
        BackendKind::Lxd => install_lxd_executor(paths)?,
    }
    state.set_active_backend(backend)?;
    runner.start()?;

    match runner.version() {
        Ok(version) => tracing::info!(%version, backend = %backend, "agent installed"),
        Err(e) => tracing::warn!(error = %e, "could not determine agent version"),
    }
    Ok(())
}

fn install_docker() -> Result<()> {
    apt(&["install", "docker.io"], APT_INSTALL_TIMEOUT)?;
    let mut cmd = Command::new("systemctl");
    cmd.args(["start", "docker.service"]);
    exec::run_checked(&mut cmd, SERVICE_TIMEOUT, "systemctl start docker")?;
    Ok(())
}

fn install_lxd_executor(paths: &Paths) -> Result<()> {
    ensure_runner_user()?;
    install_executor_scripts(paths)?;
    let mut cmd = Command::new("lxd");
    cmd.args(["init", "--auto"]);
    exec::run_checked(&mut cmd, Duration::from_secs(120), "lxd init")?;
    Ok(())
}

fn ensure_runner_user() -> Result<()> {
    if uzers::get_user_by_name(RUNNER_USER).is_some() {
        return Ok(());
    }
    let mut cmd = Command::new("useradd");
    cmd.args(["-g", LXD_GROUP, RUNNER_USER]);
    exec::run_checked(&mut cmd, SERVICE_TIMEOUT, "useradd")?;
    Ok(())
}

/// Copy the lifecycle scripts into the executor directory with exec bits.
fn install_executor_scripts(paths: &Paths) -> Result<()> {
    std::fs::create_dir_all(&paths.executor_dir)?;
    for name in EXECUTOR_SCRIPTS {
        let src = paths.template_dir.join("lxd-executor").join(name);
        let dest = paths.executor_dir.join(name);
        std::fs::copy(&src, &dest)?;
        std::fs::set_permissions(&dest, std::fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}

/// Upgrade the agent package set. Each step is bounded; a timeout kills the
/// child and fails the upgrade.
pub fn upgrade_packages() -> Result<()> {
    apt(&["update"], APT_UPDATE_TIMEOUT)?;
    apt(&["upgrade"], APT_UPGRADE_TIMEOUT)?;
    apt(&["autoremove"], APT_AUTOREMOVE_TIMEOUT)?;
    Ok(())
}
