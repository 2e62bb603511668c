//! Run a command in the project's sandbox.

use anyhow::{Context, Result};
use std::io::IsTerminal;
use std::path::Path;

use super::{child_exit, session};

/// Entry point: ensure the sandbox is up, then run `command` in it.
///
/// A terminal is allocated only when stdin is one, so output can be piped.
pub async fn run(config_path: Option<&Path>, forward: &[String], command: &[String]) -> Result<()> {
    let session = session(config_path)?;
    session
        .controller
        .up(&session.config)
        .await
        .with_context(|| format!("Failed to bring up {}", session.config.container_name()))?;

    let tty = std::io::stdin().is_terminal();
    session
        .controller
        .exec(&session.config, forward, command, tty)
        .await
        .map_err(|e| child_exit(command, e))
}
