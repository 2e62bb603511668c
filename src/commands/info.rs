//! Show how the project's sandbox is configured and whether it runs.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fmt::Write;
use std::path::Path;

use super::session;
use crate::sandbox::{ContainerState, SandboxInfo};

/// Entry point: print the sandbox summary.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let session = session(config_path)?;
    let info = session
        .controller
        .info(&session.config)
        .await
        .context("Failed to query sandbox state")?;

    print!("{}", format_info(&info));
    Ok(())
}

/// Format the summary as aligned `label: value` lines.
pub fn format_info(info: &SandboxInfo) -> String {
    let state = match info.state {
        ContainerState::Running => info.state.to_string().green(),
        ContainerState::Stopped => info.state.to_string().yellow(),
        ContainerState::Absent => info.state.to_string().dimmed(),
    };
    let image = if info.build {
        format!("{} (built locally)", info.image)
    } else {
        info.image.clone()
    };
    let work_dir = info
        .work_dir
        .clone()
        .unwrap_or_else(|| "(image default)".to_string());

    let rows = [
        ("Engine", info.engine.to_string()),
        ("Project", info.name.clone()),
        ("Project dir", info.project_dir.display().to_string()),
        ("Container", format!("{} ({state})", info.container)),
        ("Image", image),
        ("Workdir", work_dir),
        ("Home", info.home_dir.display().to_string()),
        ("Cache", info.cache_dir.display().to_string()),
    ];

    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{:<12} {}", format!("{label}:").bold(), value);
    }
    out
}
