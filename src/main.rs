#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

use runnerctl::cli::{Cli, Commands};
use runnerctl::config::Config;
use runnerctl::error::RunnerctlError;
use runnerctl::metrics::ScrapeTarget;
use runnerctl::paths::Paths;
use runnerctl::reconcile::Reconciler;
use runnerctl::runner::RunnerCli;
use runnerctl::state::StateFile;
use runnerctl::status::Status;
use runnerctl::{host, install};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let paths = match &cli.root {
        Some(root) => Paths::under(root),
        None => Paths::default(),
    };
    let config = Config::load(&cli.config)?;
    let state = StateFile::new(&paths.state_file);
    let runner = RunnerCli::default();
    let reconciler = Reconciler::new(&config, &paths, &runner, &state, host::fqdn());

    match &cli.command {
        Commands::Check => {
            config.validate()?;
            println!("Configuration OK");
        }
        Commands::Status => {
            println!("{}", reconciler.status()?);
        }
        Commands::ScrapeTarget => {
            println!("{}", ScrapeTarget::for_host(host::fqdn()).to_json()?);
        }
        Commands::Reconcile => {
            require_runner(&runner)?;
            let status = reconciler.reconcile()?;
            println!("{}", status);
            if matches!(status, Status::Blocked(_)) {
                std::process::exit(1);
            }
        }
        Commands::Register => {
            require_runner(&runner)?;
            println!("{}", reconciler.register_action()?);
        }
        Commands::Unregister => {
            require_runner(&runner)?;
            println!("{}", reconciler.unregister_action()?);
        }
        Commands::List => {
            require_runner(&runner)?;
            print!("{}", runner.list()?);
        }
        Commands::Install => {
            install::install(&config, &paths, &runner, &state)?;
            println!("Install complete");
        }
        Commands::Upgrade => {
            require_runner(&runner)?;
            println!("{}", reconciler.upgrade_action()?);
        }
    }

    Ok(())
}

fn require_runner(runner: &RunnerCli) -> Result<(), RunnerctlError> {
    if runner.is_installed() {
        Ok(())
    } else {
        Err(RunnerctlError::RunnerNotInstalled(
            runner.program().display().to_string(),
        ))
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
