use crate::backend::BackendKind;
use crate::config::Config;
use crate::error::{Result, RunnerctlError};
use crate::install;
use crate::paths::Paths;
use crate::register::RegisterRequest;
use crate::runner::{RegistrationOutcome, RunnerCli};
use crate::state::StateFile;
use crate::status::{self, Status};
use crate::template::{self, Renderer};

/// Orchestrates validation, backend selection, rendering, registration and
/// state updates. Triggers run strictly sequentially; there is no retry
/// policy anywhere in here, every retry is operator-driven.
pub struct Reconciler<'a> {
    config: &'a Config,
    paths: &'a Paths,
    runner: &'a RunnerCli,
    state: &'a StateFile,
    renderer: Renderer,
    hostname: String,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a Config,
        paths: &'a Paths,
        runner: &'a RunnerCli,
        state: &'a StateFile,
        hostname: String,
    ) -> Self {
        let renderer = Renderer::new(&paths.template_dir);
        Self {
            config,
            paths,
            runner,
            state,
            renderer,
            hostname,
        }
    }

    /// The configuration-changed trigger. Repeated triggers with an
    /// already-registered runner are no-ops besides status recomputation.
    pub fn reconcile(&self) -> Result<Status> {
        if let Err(e) = self.config.validate() {
            tracing::error!(error = %e, "configuration invalid; not registering");
            return Ok(Status::Blocked(e.to_string()));
        }

        if self.runner.verify(&self.hostname)? {
            tracing::info!("runner already registered; no action taken");
            return self.status();
        }

        let backend = match BackendKind::select(&self.config.backend) {
            Ok(backend) => backend,
            Err(e) => {
                tracing::error!(error = %e, "unsupported backend; not registering");
                return Ok(Status::Blocked(e.to_string()));
            }
        };

        match self.run_registration(backend) {
            Ok(()) => {}
            Err(
                e @ (RunnerctlError::TemplateNotFound(_)
                | RunnerctlError::TemplateSyntax { .. }
                | RunnerctlError::UndefinedVariable { .. }
                | RunnerctlError::InvalidTmpfsSpec(_)),
            ) => {
                tracing::error!(error = %e, "rendering failed; registration aborted");
                return Ok(Status::Blocked(e.to_string()));
            }
            Err(
                e @ (RunnerctlError::RegistrationFailed(_)
                | RunnerctlError::RegistrationTimedOut(_)),
            ) => {
                // The external command may have partially mutated the config
                // artifact; the next cycle re-renders it before trusting it.
                tracing::error!(error = %e, "registration failed");
            }
            Err(e) => return Err(e),
        }

        self.status()
    }

    /// Render both artifacts, then invoke the registration command and
    /// record the outcome. Artifacts are rendered fully before any write and
    /// written fully before anything reads them.
    fn run_registration(&self, backend: BackendKind) -> Result<()> {
        self.render_artifacts(backend)?;

        let request = RegisterRequest::new(self.config, backend, self.paths, &self.hostname);
        tracing::info!(backend = %backend, name = %self.hostname, "registering runner");

        match self.runner.register(&request)? {
            RegistrationOutcome::Success => {
                self.state.set_active_backend(backend)?;
                self.state.mark_registered(true)?;
                tracing::info!(backend = %backend, "registration succeeded");
                Ok(())
            }
            RegistrationOutcome::Failed(code) => {
                self.state.mark_registered(false)?;
                Err(RunnerctlError::RegistrationFailed(code))
            }
            RegistrationOutcome::TimedOut => {
                self.state.mark_registered(false)?;
                Err(RunnerctlError::RegistrationTimedOut(
                    self.runner.timeout().as_secs(),
                ))
            }
        }
    }

    fn render_artifacts(&self, backend: BackendKind) -> Result<()> {
        let global = self.renderer.render_global_config(self.config)?;
        let docker = match backend {
            BackendKind::Docker => Some(self.renderer.render_docker_template(self.config)?),
            BackendKind::Lxd => None,
        };

        // The config artifact carries the issued token after registration.
        template::write_artifact(&self.paths.config_file, &global, 0o600)?;
        if let Some(contents) = docker {
            template::write_artifact(&self.paths.template_file, &contents, 0o644)?;
        }
        Ok(())
    }

    /// Explicit register action. Unlike `reconcile`, an already-registered
    /// runner fails the action so the operator sees it.
    pub fn register_action(&self) -> Result<Status> {
        self.config.validate()?;
        if self.runner.verify(&self.hostname)? {
            let fingerprint =
                status::token_fingerprint(&self.paths.config_file).unwrap_or_default();
            return Err(RunnerctlError::AlreadyRegistered(fingerprint));
        }
        let backend = BackendKind::select(&self.config.backend)?;
        self.run_registration(backend)?;
        self.status()
    }

    /// Unregister all runners for this host and restart the agent.
    pub fn unregister_action(&self) -> Result<Status> {
        tracing::info!(name = %self.hostname, "unregistering all runners for host");
        self.runner.unregister_all(&self.hostname)?;
        self.state.mark_registered(false)?;
        if let Err(e) = self.runner.restart() {
            tracing::warn!(error = %e, "failed to restart agent after unregister");
        }
        Ok(Status::Waiting)
    }

    /// Unregister, upgrade the agent package set, and register again.
    pub fn upgrade_action(&self) -> Result<Status> {
        tracing::info!("upgrading the runner agent");
        self.unregister_action()?;
        install::upgrade_packages()?;
        self.register_action()
    }

    pub fn status(&self) -> Result<Status> {
        let state = self.state.load()?;
        Ok(status::current(self.paths, &state))
    }
}
