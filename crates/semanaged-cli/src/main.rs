//! semanaged CLI - deploy archives into a managed JVM test worker

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use semanaged_core::config::Config;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;

/// semanaged - managed JVM test worker
#[derive(Debug, Parser)]
#[command(name = "semanaged")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding semanaged.toml
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deploy entries into a worker, wait, then undeploy
    Run(commands::run::RunArgs),

    /// Delete the output directory
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = match cli.config_dir {
        Some(ref dir) => dir.clone(),
        None => std::env::current_dir()
            .ok()
            .and_then(|p| Utf8PathBuf::try_from(p).ok())
            .unwrap_or_else(|| Utf8PathBuf::from(".")),
    };
    let config = Config::load(&config_dir).into_diagnostic()?;

    // RUST_LOG wins over --verbose, which wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::default().add_directive(config.log_level.level_filter().into())
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::debug!(dir = %config_dir, "Loaded configuration");

    match cli.command {
        Commands::Run(args) => commands::run::run(config, args),
        Commands::Clean => commands::clean::run(&config),
    }
}
