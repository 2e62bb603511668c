//! Build (if needed), create and start the project's sandbox.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use super::session;
use crate::sandbox::ContainerState;

/// Entry point: bring the sandbox up.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let session = session(config_path)?;
    let container = session.config.container_name();
    let before = session
        .controller
        .up(&session.config)
        .await
        .with_context(|| format!("Failed to bring up {container}"))?;

    println!("{}", format_result(&container, before));
    Ok(())
}

/// Describe what `up` did, given the state it found.
pub fn format_result(container: &str, before: ContainerState) -> String {
    let action = match before {
        ContainerState::Absent => "created",
        ContainerState::Stopped => "started",
        ContainerState::Running => "already running",
    };
    format!("{} {} {}", "✓".green().bold(), container.cyan(), action)
}
