use crate::backend::BackendKind;
use crate::config::Config;
use crate::paths::{Paths, BUILDS_DIR, CACHE_DIR};
use std::path::PathBuf;

/// Fully resolved inputs for one registration call.
///
/// Built once from validated configuration, then turned into an explicit
/// argument vector. Arguments are never interpolated into a shell string.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub name: String,
    pub coordinator_url: String,
    pub token: String,
    pub concurrency: u32,
    pub run_untagged: bool,
    pub locked: bool,
    pub tags: Vec<String>,
    pub backend: BackendKind,
    pub image: String,
    pub config_file: PathBuf,
    pub template_file: PathBuf,
    pub executor_scripts: [PathBuf; 3],
}

impl RegisterRequest {
    pub fn new(config: &Config, backend: BackendKind, paths: &Paths, name: &str) -> Self {
        // run-untagged wins over a configured tag list; warn and drop the
        // tags rather than failing the whole registration.
        let tags = if config.run_untagged && !config.tags.is_empty() {
            tracing::warn!(
                tags = ?config.tags,
                "run_untagged is set; dropping configured tag list"
            );
            vec![]
        } else {
            config.tags.clone()
        };

        Self {
            name: name.to_string(),
            coordinator_url: config.coordinator_url.clone(),
            token: config.registration_token.clone(),
            concurrency: config.concurrency,
            run_untagged: config.run_untagged,
            locked: config.locked,
            tags,
            backend,
            image: config.image.clone(),
            config_file: paths.config_file.clone(),
            template_file: paths.template_file.clone(),
            executor_scripts: paths.executor_scripts(),
        }
    }

    /// Argument vector for `gitlab-runner register`, without the subcommand
    /// itself.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--non-interactive".to_string(),
            "--config".to_string(),
            self.config_file.display().to_string(),
            "--name".to_string(),
            self.name.clone(),
            "--url".to_string(),
            self.coordinator_url.clone(),
            "--registration-token".to_string(),
            self.token.clone(),
            "--request-concurrency".to_string(),
            self.concurrency.to_string(),
            format!("--run-untagged={}", self.run_untagged),
            format!("--locked={}", self.locked),
            "--executor".to_string(),
            self.backend.executor().to_string(),
        ];

        if !self.run_untagged && !self.tags.is_empty() {
            args.push("--tag-list".to_string());
            args.push(self.tags.join(","));
        }

        match self.backend {
            BackendKind::Docker => {
                args.push("--template-config".to_string());
                args.push(self.template_file.display().to_string());
                args.push("--docker-image".to_string());
                args.push(self.image.clone());
            }
            BackendKind::Lxd => {
                let [prepare, run, cleanup] = &self.executor_scripts;
                args.push("--builds-dir".to_string());
                args.push(BUILDS_DIR.to_string());
                args.push("--cache-dir".to_string());
                args.push(CACHE_DIR.to_string());
                args.push("--custom-prepare-exec".to_string());
                args.push(prepare.display().to_string());
                args.push("--custom-run-exec".to_string());
                args.push(run.display().to_string());
                args.push("--custom-cleanup-exec".to_string());
                args.push(cleanup.display().to_string());
            }
        }

        args
    }
}
