use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod engine;
mod paths;
mod sandbox;
mod templates;

#[derive(Parser)]
#[command(name = "airlock")]
#[command(
    author,
    version,
    about = "Persistent per-project development sandboxes on podman or docker"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to airlock.yaml (default: nearest airlock.yaml or airlock.yml)
    #[arg(short, long, global = true, env = "AIRLOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging, including every engine command
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create airlock.yaml, a Containerfile and the .airlock state directory
    Init {
        /// Project name (default: current directory name)
        name: Option<String>,

        /// Force overwrite existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Build (if needed), create and start the sandbox
    Up,

    /// Open a login shell in the sandbox
    Enter {
        /// Forward a host environment variable (repeatable)
        #[arg(short = 'e', long = "env", value_name = "VAR")]
        env: Vec<String>,
    },

    /// Run a command in the sandbox
    Exec {
        /// Forward a host environment variable (repeatable)
        #[arg(short = 'e', long = "env", value_name = "VAR")]
        env: Vec<String>,

        /// Command and arguments
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Stop and remove the sandbox (state directories are kept)
    Down {
        /// Container or project name (default: this project)
        name: Option<String>,
    },

    /// List running sandboxes
    List,

    /// Show engine, paths and container state for this project
    Info,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("airlock=debug")
    } else {
        EnvFilter::new("airlock=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::from(exit_status(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Init { name, force } => {
            commands::init::run(name, force)?;
        }
        Commands::Up => {
            commands::up::run(config).await?;
        }
        Commands::Enter { env } => {
            commands::enter::run(config, &env).await?;
        }
        Commands::Exec { env, command } => {
            commands::exec::run(config, &env, &command).await?;
        }
        Commands::Down { name } => {
            commands::down::run(config, name.as_deref()).await?;
        }
        Commands::List => {
            commands::list::run(config).await?;
        }
        Commands::Info => {
            commands::info::run(config).await?;
        }
    }

    Ok(())
}

/// Exit status for a failed invocation: the sandboxed command's own status
/// when that is what failed, 1 otherwise.
fn exit_status(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<commands::ChildExit>()
        .and_then(|exit| u8::try_from(exit.code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}
