use std::path::{Path, PathBuf};

/// Fixed build/cache directories handed to the custom executor. These are
/// paths inside the job environment, not on the host, so they are never
/// re-rooted.
pub const BUILDS_DIR: &str = "/builds";
pub const CACHE_DIR: &str = "/cache";

/// The three lifecycle scripts the custom executor contract requires.
pub const EXECUTOR_SCRIPTS: [&str; 3] = ["prepare.sh", "run.sh", "cleanup.sh"];

/// Well-known filesystem locations used by the agent and its tooling.
///
/// Everything lives under a root prefix so tests and staged installs can
/// operate on a temporary tree via `--root`.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Global agent configuration artifact. The registration command writes
    /// the issued token into this file, so treat it as secret-bearing.
    pub config_file: PathBuf,
    /// Rendered registration template for the docker executor.
    pub template_file: PathBuf,
    /// Source templates shipped with runnerctl.
    pub template_dir: PathBuf,
    /// Lifecycle scripts for the custom (lxd) executor.
    pub executor_dir: PathBuf,
    /// Persisted registration state.
    pub state_file: PathBuf,
}

impl Paths {
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_file: root.join("etc/gitlab-runner/config.toml"),
            template_file: root.join("tmp/runner-template-config.toml"),
            template_dir: root.join("usr/share/runnerctl/templates"),
            executor_dir: root.join("opt/lxd-executor"),
            state_file: root.join("var/lib/runnerctl/state.toml"),
        }
    }

    /// Absolute paths of the custom executor lifecycle scripts, in
    /// prepare/run/cleanup order.
    pub fn executor_scripts(&self) -> [PathBuf; 3] {
        EXECUTOR_SCRIPTS.map(|name| self.executor_dir.join(name))
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::under("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = Paths::default();
        assert_eq!(
            paths.config_file,
            PathBuf::from("/etc/gitlab-runner/config.toml")
        );
        assert_eq!(
            paths.template_file,
            PathBuf::from("/tmp/runner-template-config.toml")
        );
        assert_eq!(paths.executor_dir, PathBuf::from("/opt/lxd-executor"));
    }

    #[test]
    fn test_rerooted_paths() {
        let paths = Paths::under("/staging");
        assert_eq!(
            paths.state_file,
            PathBuf::from("/staging/var/lib/runnerctl/state.toml")
        );
    }

    #[test]
    fn test_executor_scripts_order() {
        let paths = Paths::under("/");
        let [prepare, run, cleanup] = paths.executor_scripts();
        assert_eq!(prepare, PathBuf::from("/opt/lxd-executor/prepare.sh"));
        assert_eq!(run, PathBuf::from("/opt/lxd-executor/run.sh"));
        assert_eq!(cleanup, PathBuf::from("/opt/lxd-executor/cleanup.sh"));
    }
}
