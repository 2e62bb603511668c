//! Domain-specific error types for sandbox operations.
//!
//! Typed errors enable callers to match on specific failure modes
//! rather than parsing error message strings.

use std::path::{Path, PathBuf};

/// Errors that can occur while driving the container engine.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Neither the preferred nor any known engine binary is available.
    #[error("No container engine available: {message}")]
    EngineNotFound { message: String },

    /// The engine binary could not be started at all.
    #[error("Failed to run `{command}`")]
    CommandSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited non-zero.
    #[error("`{command}` failed{}{}", exit_suffix(.code), stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The command run inside the sandbox exited non-zero. Engine
    /// failures before that command starts are `CommandFailed` instead.
    #[error("`{command}` exited{}", exit_suffix(.code))]
    ChildExited { command: String, code: Option<i32> },

    /// Image inspection output did not have the expected shape.
    #[error("Unexpected image inspect output for {image}: {message}")]
    MetadataParse { image: String, message: String },

    /// The sandbox container must be running for this operation.
    #[error("Container {name} is not running (run `airlock up` first)")]
    NotRunning { name: String },

    /// A host state directory could not be created.
    #[error("Failed to create state directory {}", .path.display())]
    StateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[allow(clippy::ref_option)]
fn exit_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" with exit code {c}")).unwrap_or_default()
}

fn stderr_suffix(stderr: &str) -> String {
    let line = stderr.lines().map(str::trim).find(|l| !l.is_empty());
    line.map(|l| format!(": {l}")).unwrap_or_default()
}

impl SandboxError {
    /// Creates an `EngineNotFound` error.
    pub fn engine_not_found(message: impl Into<String>) -> Self {
        Self::EngineNotFound {
            message: message.into(),
        }
    }

    /// Creates a `CommandSpawn` error.
    pub fn command_spawn(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandSpawn {
            command: command.into(),
            source,
        }
    }

    /// Creates a `CommandFailed` error.
    pub fn command_failed(
        command: impl Into<String>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Reclassify the failure of the in-sandbox command itself.
    pub fn into_child_exited(self) -> Self {
        match self {
            Self::CommandFailed { command, code, .. } => Self::ChildExited { command, code },
            other => other,
        }
    }

    /// Creates a `MetadataParse` error.
    pub fn metadata_parse(image: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MetadataParse {
            image: image.into(),
            message: message.into(),
        }
    }

    /// Creates a `NotRunning` error.
    pub fn not_running(name: impl Into<String>) -> Self {
        Self::NotRunning { name: name.into() }
    }

    /// Creates a `StateDir` error.
    pub fn state_dir(path: &Path, source: std::io::Error) -> Self {
        Self::StateDir {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns true if no engine binary could be found.
    pub fn is_engine_not_found(&self) -> bool {
        matches!(self, Self::EngineNotFound { .. })
    }

    /// Returns true if an engine command ran and exited non-zero.
    pub fn is_command_failed(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }

    /// Returns true if the command run inside the sandbox failed.
    pub fn is_child_exited(&self) -> bool {
        matches!(self, Self::ChildExited { .. })
    }

    /// Returns true if image metadata could not be parsed.
    pub fn is_metadata_parse(&self) -> bool {
        matches!(self, Self::MetadataParse { .. })
    }

    /// Exit code of the failed command, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::CommandFailed { code, .. } | Self::ChildExited { code, .. } => *code,
            _ => None,
        }
    }
}
