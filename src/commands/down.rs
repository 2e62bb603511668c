//! Stop and remove a sandbox container. Host state directories are kept.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use super::{controller, load_config, optional_engine};
use crate::sandbox::down_target;

/// Entry point: remove the project's container, or the named one.
///
/// With a name, no project configuration is required.
pub async fn run(config_path: Option<&Path>, name: Option<&str>) -> Result<()> {
    let named = name.is_some_and(|n| !n.trim().is_empty());
    let (config, preferred) = if named {
        (None, optional_engine(config_path))
    } else {
        let config = load_config(config_path)?;
        let preferred = config.engine;
        (Some(config), preferred)
    };

    let target = down_target(config.as_ref(), name).context("No container to remove")?;
    controller(preferred)?.down(&target).await;

    println!("{}", format_result(&target));
    Ok(())
}

/// Confirmation line for a removed container.
pub fn format_result(target: &str) -> String {
    format!("{} {} removed", "✓".green().bold(), target.cyan())
}
