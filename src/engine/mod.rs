//! Container engine abstraction.
//!
//! Podman and Docker share the CLI surface airlock relies on, so the only
//! difference between them is the binary name and podman's
//! `--userns=keep-id`. Everything else goes through [`CommandRunner`].

#[cfg(test)]
pub(crate) mod fake;
mod process;

pub(crate) use process::ProcessRunner;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::sandbox::SandboxError;

/// Supported container engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Engine {
    /// Podman (rootless-capable, gets `--userns=keep-id`).
    Podman,
    /// Docker.
    Docker,
}

impl Engine {
    /// Name of the engine binary on `PATH`.
    pub fn binary(self) -> &'static str {
        match self {
            Self::Podman => "podman",
            Self::Docker => "docker",
        }
    }

    /// Whether `run` should map the invoking user into the container.
    pub fn keeps_user_namespace(self) -> bool {
        matches!(self, Self::Podman)
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

impl std::str::FromStr for Engine {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "podman" => Ok(Self::Podman),
            "docker" => Ok(Self::Docker),
            _ => anyhow::bail!("Unknown container engine: '{s}'. Supported: podman, docker"),
        }
    }
}

/// Pick the engine to use.
///
/// A preferred engine must be present; without a preference podman wins
/// over docker. `on_path` reports whether a binary can be found.
pub(crate) fn detect<F>(preferred: Option<Engine>, on_path: F) -> Result<Engine, SandboxError>
where
    F: Fn(&str) -> bool,
{
    if let Some(engine) = preferred {
        if on_path(engine.binary()) {
            debug!("Using preferred engine {}", engine);
            return Ok(engine);
        }
        return Err(SandboxError::engine_not_found(format!(
            "preferred engine not found on PATH: {engine}"
        )));
    }

    [Engine::Podman, Engine::Docker]
        .into_iter()
        .find(|engine| on_path(engine.binary()))
        .inspect(|engine| debug!("Detected engine {}", engine))
        .ok_or_else(|| SandboxError::engine_not_found("neither podman nor docker found on PATH"))
}

/// Detect the engine against the real `PATH`.
pub(crate) fn detect_on_path(preferred: Option<Engine>) -> Result<Engine, SandboxError> {
    detect(preferred, |name| which::which(name).is_ok())
}

/// Captured result of a non-interactive engine invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CommandOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

#[cfg(test)]
impl CommandOutput {
    /// A successful invocation with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed invocation with the given stderr.
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs engine subcommands.
///
/// Implementations invoke one command at a time; callers await each call
/// before issuing the next.
#[async_trait]
pub(crate) trait CommandRunner: Send + Sync {
    /// The engine this runner drives.
    fn engine(&self) -> Engine;

    /// Run a command and capture its output. A non-zero exit is reported
    /// through [`CommandOutput::success`], not as an error.
    async fn capture(&self, args: &[String]) -> Result<CommandOutput, SandboxError>;

    /// Run a command attached to the invoking terminal. A non-zero exit is
    /// an error.
    async fn interactive(&self, args: &[String]) -> Result<(), SandboxError>;
}

/// Render an engine invocation for logs and error messages.
pub(crate) fn display_command(engine: Engine, args: &[String]) -> String {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push(engine.binary());
    words.extend(args.iter().map(String::as_str));
    shell_words::join(words)
}
