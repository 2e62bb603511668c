//! List running sandboxes across all projects.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use super::{controller, optional_engine};

/// Entry point: print one container name per line.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let names = controller(optional_engine(config_path))?
        .list()
        .await
        .context("Failed to list sandboxes")?;

    if names.is_empty() {
        eprintln!("{}", "No running sandboxes.".dimmed());
    } else {
        print!("{}", format_names(&names));
    }
    Ok(())
}

/// Names, one per line, without decoration so the output can be scripted.
pub fn format_names(names: &[String]) -> String {
    names.iter().map(|name| format!("{name}\n")).collect()
}
