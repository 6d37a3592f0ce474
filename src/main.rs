//! fsxup - FSx for Lustre client provisioner.
//!
//! Prepares an Ubuntu host as an FSx for Lustre client:
//! - imports the repository signing key into the system trust store
//! - registers the client APT repository and refreshes the index
//! - installs the kernel-matched and generic client module packages
//! - creates the mount point
//! - optionally mounts the filesystem (opt-in via --mount)

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use fsxup::commands;
use fsxup::config::Config;
use fsxup::error::StageError;

#[derive(Parser)]
#[command(name = "fsxup")]
#[command(about = "FSx for Lustre client provisioner for Ubuntu hosts")]
#[command(
    after_help = "QUICK START:\n  fsxup preflight          Check host readiness\n  fsxup provision          Install the client (key, repo, packages, mkdir)\n  fsxup provision --mount  Also mount the filesystem ($FSX)\n\nEXIT CODES:\n  10 signing-key  11 repository  12 packages  13 mount-point  14 mount  2 config"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the host (signing key, repository, packages, mount point)
    Provision {
        /// Also mount the filesystem (requires the FSX environment variable)
        #[arg(long)]
        mount: bool,
    },

    /// Mount the filesystem on an already provisioned host
    Mount,

    /// Run preflight checks (verify host tools and privileges)
    Preflight {
        /// Fail if any checks fail (exit code 1)
        #[arg(long)]
        strict: bool,
    },

    /// Show information
    Show {
        #[command(subcommand)]
        what: ShowTarget,
    },
}

#[derive(Subcommand)]
enum ShowTarget {
    /// Show effective configuration
    Config {
        /// Emit as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the steps a provision run would perform
    Plan,
}

/// Errors surfaced to the user, each with its exit code.
enum CliError {
    /// A provisioning stage failed; exit code identifies the stage.
    Stage(StageError),
    /// Anything else (preflight --strict, show); exit code 1.
    Other(anyhow::Error),
}

impl From<StageError> for CliError {
    fn from(e: StageError) -> Self {
        CliError::Stage(e)
    }
}

impl From<anyhow::Error> for CliError {
    fn from(e: anyhow::Error) -> Self {
        CliError::Other(e)
    }
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Stage(e) => e.exit_code(),
            CliError::Other(_) => 1,
        }
    }

    fn print(&self) {
        match self {
            CliError::Stage(e) => eprintln!("fsxup: provision failed at {e}"),
            CliError::Other(e) => eprintln!("fsxup: {e:#}"),
        }
    }
}

fn run(cli: Cli, config: &Config) -> Result<(), CliError> {
    match cli.command {
        Commands::Provision { mount } => commands::cmd_provision(config, mount)?,
        Commands::Mount => commands::cmd_mount(config)?,
        Commands::Preflight { strict } => commands::cmd_preflight(config, strict)?,
        Commands::Show { what } => {
            let target = match what {
                ShowTarget::Config { json } => commands::show::ShowTarget::Config { json },
                ShowTarget::Plan => commands::show::ShowTarget::Plan,
            };
            commands::cmd_show(config, target)?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    // Load .env if present
    dotenvy::dotenv().ok();
    let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = Config::load(&base_dir);

    if let Err(e) = run(cli, &config) {
        e.print();
        std::process::exit(e.exit_code());
    }
}
