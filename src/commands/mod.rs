//! CLI command implementations.
//!
//! Each submodule implements one airlock command. Formatting and decision
//! logic are pure; loading config and talking to the engine happen in
//! each module's `run`.

pub mod down;
pub mod enter;
pub mod exec;
pub mod info;
pub mod init;
pub mod list;
pub mod up;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{find_config_file, ProjectConfig};
use crate::engine::{detect_on_path, Engine, ProcessRunner};
use crate::sandbox::{Controller, SandboxError};

/// The user's own command inside the sandbox exited non-zero.
#[derive(Debug, thiserror::Error)]
#[error("`{command}` exited with status {code}")]
pub(crate) struct ChildExit {
    pub command: String,
    pub code: i32,
}

/// A loaded project and a controller for its engine.
pub(crate) struct Session {
    pub config: ProjectConfig,
    pub controller: Controller<ProcessRunner>,
}

/// Locate the configuration file: the explicit path, or the nearest
/// `airlock.yaml` from the current directory upwards.
pub(crate) fn locate_config(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    find_config_file(&cwd).with_context(|| {
        format!(
            "No airlock.yaml found in {} or any parent directory. Run: airlock init",
            cwd.display()
        )
    })
}

/// Load the project configuration.
pub(crate) fn load_config(explicit: Option<&Path>) -> Result<ProjectConfig> {
    let path = locate_config(explicit)?;
    debug!("Loading {}", path.display());
    ProjectConfig::load(&path).context("Failed to load config")
}

/// Detect the engine and wrap it in a controller.
pub(crate) fn controller(preferred: Option<Engine>) -> Result<Controller<ProcessRunner>> {
    let engine = detect_on_path(preferred).context("Failed to detect container engine")?;
    Ok(Controller::new(ProcessRunner::new(engine)))
}

/// Load the project and prepare its engine.
pub(crate) fn session(config_path: Option<&Path>) -> Result<Session> {
    let config = load_config(config_path)?;
    let controller = controller(config.engine)?;
    Ok(Session { config, controller })
}

/// Engine preference for commands that work without a project.
///
/// A project that is present and loads contributes its preference;
/// otherwise the engine is autodetected.
pub(crate) fn optional_engine(config_path: Option<&Path>) -> Option<Engine> {
    match load_config(config_path) {
        Ok(config) => config.engine,
        Err(e) => {
            debug!("No project engine preference: {:#}", e);
            None
        }
    }
}

/// Report a failed in-sandbox command with its exit status, so `main`
/// can pass the status on.
pub(crate) fn child_exit(command: &[String], err: SandboxError) -> anyhow::Error {
    match err.exit_code() {
        Some(code) if err.is_child_exited() => ChildExit {
            command: shell_words::join(command),
            code,
        }
        .into(),
        _ => anyhow::Error::new(err),
    }
}
