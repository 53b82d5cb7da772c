//! Clean command implementation

use miette::{IntoDiagnostic, Result};
use semanaged_core::config::Config;

/// Remove the output directory and everything materialized into it
pub fn run(config: &Config) -> Result<()> {
    let output_dir = &config.output_dir;

    if !output_dir.exists() {
        tracing::info!(path = %output_dir, "Nothing to clean");
        return Ok(());
    }

    std::fs::remove_dir_all(output_dir).into_diagnostic()?;
    tracing::info!(path = %output_dir, "Removed output directory");
    Ok(())
}
