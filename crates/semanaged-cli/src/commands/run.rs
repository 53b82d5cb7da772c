//! Run command implementation

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use miette::{IntoDiagnostic, Result};
use semanaged_core::archive::{Archive, JarArchive, MemoryArchive, load_class_path_directory};
use semanaged_core::Error;
use semanaged_core::config::Config;
use semanaged_core::deploy::{ManagedContainer, render};
use semanaged_core::packager::generate_deployment;
use std::collections::HashSet;
use std::io::{self, BufRead};
use std::thread;
use std::time::Duration;

/// Name of the classpath root the entries are packaged into
const DEPLOYMENT_NAME: &str = "deployment";

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Class directories or packaged .jar files to deploy
    #[arg(required = true)]
    pub entries: Vec<Utf8PathBuf>,

    /// Suspend the worker until a debugger attaches
    #[arg(long)]
    pub debug: bool,

    /// Management port of the worker
    #[arg(long)]
    pub port: Option<u16>,

    /// Keep materialized files after undeploy
    #[arg(long)]
    pub keep_archives: bool,

    /// Print the worker command and exit without starting it
    #[arg(long)]
    pub dry_run: bool,

    /// Undeploy after this many seconds instead of waiting for Enter
    #[arg(long, value_name = "N")]
    pub hold_secs: Option<u64>,
}

/// Run the run command
pub fn run(mut config: Config, args: RunArgs) -> Result<()> {
    config.debug |= args.debug;
    config.keep_deployment_archives |= args.keep_archives;
    if let Some(port) = args.port {
        config.port = port;
    }

    let auxiliaries = load_entries(&args.entries).into_diagnostic()?;
    let deployment = generate_deployment(MemoryArchive::class_path(DEPLOYMENT_NAME), auxiliaries)
        .into_diagnostic()?;

    let mut container = ManagedContainer::setup(config);
    container.start().into_diagnostic()?;

    if args.dry_run {
        let command = container.dry_run(&deployment);
        let undeployed = container.undeploy(&deployment);
        println!("{}", render(&command.into_diagnostic()?));
        return undeployed.into_diagnostic();
    }

    let metadata = match container.deploy(&deployment) {
        Ok(metadata) => metadata,
        Err(e) => {
            // Leave nothing behind from a half-finished deploy
            if let Err(cleanup) = container.undeploy(&deployment) {
                tracing::warn!(error = %cleanup, "Cleanup after failed deploy also failed");
            }
            return Err(e).into_diagnostic();
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&metadata).into_diagnostic()?
    );

    match args.hold_secs {
        Some(secs) => {
            tracing::info!(secs, "Holding deployment");
            thread::sleep(Duration::from_secs(secs));
        }
        None => {
            eprintln!("Press Enter to undeploy");
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).into_diagnostic()?;
        }
    }

    container.undeploy(&deployment).into_diagnostic()?;
    container.stop().into_diagnostic()?;
    Ok(())
}

/// Load every entry, rejecting two entries that would materialize under the
/// same name
fn load_entries(paths: &[Utf8PathBuf]) -> semanaged_core::Result<Vec<Box<dyn Archive>>> {
    let mut names = HashSet::new();
    let mut entries = Vec::with_capacity(paths.len());

    for path in paths {
        let entry = load_entry(path)?;
        if !names.insert(entry.name().to_string()) {
            return Err(Error::config(
                format!("Duplicate deployment entry name: {} ({})", entry.name(), path),
                "Rename one of the directories or jars so each entry has a distinct name",
            ));
        }
        entries.push(entry);
    }

    Ok(entries)
}

/// Load a directory as a class directory and anything else as a packaged file
fn load_entry(path: &Utf8Path) -> semanaged_core::Result<Box<dyn Archive>> {
    if path.is_dir() {
        let name = path.file_name().unwrap_or(DEPLOYMENT_NAME);
        Ok(Box::new(load_class_path_directory(name, path)?))
    } else {
        Ok(Box::new(JarArchive::open(path.to_path_buf())?))
    }
}
