use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "runnerctl")]
#[command(about = "Manage GitLab Runner registration and lifecycle on a host")]
#[command(version)]
pub struct Cli {
    /// Path to the runnerctl configuration file
    #[arg(
        long,
        global = true,
        env = "RUNNERCTL_CONFIG",
        default_value = "/etc/runnerctl/config.toml"
    )]
    pub config: PathBuf,

    /// Operate on files under this prefix instead of / (staging and tests)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Show verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the configuration and print the verdict
    Check,

    /// Run the configuration-changed reconciliation pass
    #[command(long_about = "Run the configuration-changed reconciliation pass.\n\n\
        Validates the configuration, probes the coordinator for an existing\n\
        registration, and registers the runner if needed. Re-running against\n\
        an already-registered runner is a no-op.")]
    Reconcile,

    /// Print the derived runner status
    Status,

    /// Register this host's runner with the coordinator
    Register,

    /// Unregister all runners for this host
    Unregister,

    /// List runners known to the local agent
    List,

    /// Install the agent package and provision the backend
    Install,

    /// Unregister, upgrade the agent package, and re-register
    Upgrade,

    /// Print the monitoring scrape-target handshake payload as JSON
    ScrapeTarget,
}
