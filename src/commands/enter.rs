//! Open a login shell in the project's sandbox.

use anyhow::{Context, Result};
use std::path::Path;

use super::{child_exit, session};

/// Entry point: ensure the sandbox is up, then attach a shell.
pub async fn run(config_path: Option<&Path>, forward: &[String]) -> Result<()> {
    let session = session(config_path)?;
    session
        .controller
        .up(&session.config)
        .await
        .with_context(|| format!("Failed to bring up {}", session.config.container_name()))?;

    session
        .controller
        .enter(&session.config, forward)
        .await
        .map_err(|e| child_exit(&["bash".to_string(), "-l".to_string()], e))
}
