//! Sandbox lifecycle: up, enter, exec, down, list.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::{ProjectConfig, CONTAINER_PREFIX, DEFAULT_WORKDIR};
use crate::engine::{display_command, CommandRunner, Engine};
use crate::paths::create_private_dir;

use super::env::{compose_env, forward_env};
use super::image::{inspect_image, resolve_user, ImageMetadata, SandboxUser};
use super::mounts::{plan_mounts, MountArg};
use super::SandboxError;

/// Hostname every sandbox reports.
const HOSTNAME: &str = "airlock";

/// Observed container state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContainerState {
    /// No container with the project's name exists.
    Absent,
    /// The container exists but is not running.
    Stopped,
    /// The container is running.
    Running,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Absent => "absent",
            Self::Stopped => "stopped",
            Self::Running => "running",
        })
    }
}

/// Everything `run` needs beyond the project configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RunPlan {
    pub user: SandboxUser,
    pub work_dir: String,
    pub env: BTreeMap<String, String>,
    pub mounts: Vec<MountArg>,
}

impl RunPlan {
    /// Combine configuration and image metadata into a run plan.
    pub fn new(config: &ProjectConfig, image: &ImageMetadata) -> Self {
        let user = resolve_user(image, &config.user);
        let work_dir = config
            .work_dir
            .clone()
            .or_else(|| image.work_dir.clone())
            .unwrap_or_else(|| DEFAULT_WORKDIR.to_string());
        let env = compose_env(&image.env, &config.env, &user.home, &work_dir);
        let mounts = plan_mounts(config, &user, &work_dir);
        Self {
            user,
            work_dir,
            env,
            mounts,
        }
    }
}

/// Arguments of the `run` command that creates and starts the container.
pub(crate) fn run_args(engine: Engine, config: &ProjectConfig, plan: &RunPlan) -> Vec<String> {
    let mut args = strings(&["run", "-d", "--name"]);
    args.push(config.container_name());
    args.push("-w".to_string());
    args.push(plan.work_dir.clone());
    args.push("--user".to_string());
    args.push(plan.user.user_arg());
    if engine.keeps_user_namespace() {
        args.push("--userns=keep-id".to_string());
    }
    for (key, value) in &plan.env {
        args.push("-e".to_string());
        args.push(format!("{key}={value}"));
    }
    for mount in &plan.mounts {
        args.push("-v".to_string());
        args.push(mount.volume_spec());
    }
    args.push("--hostname".to_string());
    args.push(HOSTNAME.to_string());
    args.push(config.image_ref().to_string());
    args.extend(config.command.iter().cloned());
    args
}

/// Arguments of an `exec` into `container`.
fn exec_args(
    container: &str,
    user: &SandboxUser,
    env: &[String],
    tty: bool,
    command: &[String],
) -> Vec<String> {
    let mut args = vec![
        "exec".to_string(),
        if tty { "-it" } else { "-i" }.to_string(),
        "--user".to_string(),
        user.user_arg(),
    ];
    for entry in env {
        args.push("-e".to_string());
        args.push(entry.clone());
    }
    args.push(container.to_string());
    args.extend(command.iter().cloned());
    args
}

/// Container name addressed by `down`.
///
/// An explicit name wins and gets the managed prefix if it lacks one.
/// Otherwise the project's own container is used.
pub(crate) fn down_target(config: Option<&ProjectConfig>, name: Option<&str>) -> Option<String> {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) if name.starts_with(CONTAINER_PREFIX) => Some(name.to_string()),
        Some(name) => Some(format!("{CONTAINER_PREFIX}{name}")),
        None => config.map(ProjectConfig::container_name),
    }
}

/// Read-only summary of a project's sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SandboxInfo {
    pub engine: Engine,
    pub name: String,
    pub project_dir: PathBuf,
    pub container: String,
    pub image: String,
    pub build: bool,
    pub work_dir: Option<String>,
    pub home_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub state: ContainerState,
}

/// Drives the sandbox container through an engine.
pub(crate) struct Controller<R> {
    runner: R,
}

impl<R: CommandRunner> Controller<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    #[cfg(test)]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Ask the engine whether `name` exists and is running.
    pub async fn state(&self, name: &str) -> Result<ContainerState, SandboxError> {
        let exists = self
            .runner
            .capture(&strings(&["container", "inspect", name]))
            .await?;
        if !exists.success {
            return Ok(ContainerState::Absent);
        }

        let output = self.checked(&["inspect", "-f", "{{.State.Running}}", name]).await?;
        if output.trim() == "true" {
            Ok(ContainerState::Running)
        } else {
            Ok(ContainerState::Stopped)
        }
    }

    /// Bring the project's container to the running state.
    ///
    /// Returns the state observed before anything was changed. A stopped
    /// container is started as it was created; configuration changes made
    /// since then need `down` first.
    pub async fn up(&self, config: &ProjectConfig) -> Result<ContainerState, SandboxError> {
        if let Some(build) = config.build() {
            info!("Building image {}", build.tag);
            let mut args = strings(&["build", "-t", build.tag.as_str(), "-f"]);
            args.push(build.containerfile.display().to_string());
            args.push(build.context.display().to_string());
            self.runner.interactive(&args).await?;
        }

        ensure_state_dir(&config.home_dir)?;
        ensure_state_dir(&config.cache_dir)?;

        let name = config.container_name();
        let state = self.state(&name).await?;
        match state {
            ContainerState::Absent => {
                let image = inspect_image(&self.runner, config.image_ref()).await?;
                let plan = RunPlan::new(config, &image);
                info!("Creating {} from {}", name, config.image_ref());
                self.runner
                    .interactive(&run_args(self.runner.engine(), config, &plan))
                    .await?;
            }
            ContainerState::Stopped => {
                info!("Starting {}", name);
                self.runner.interactive(&strings(&["start", name.as_str()])).await?;
            }
            ContainerState::Running => debug!("{} is already running", name),
        }
        Ok(state)
    }

    /// Open an interactive login shell in the running container.
    pub async fn enter(&self, config: &ProjectConfig, forward: &[String]) -> Result<(), SandboxError> {
        let shell = strings(&["bash", "-l"]);
        self.exec(config, forward, &shell, true).await
    }

    /// Run `command` in the running container.
    ///
    /// `forward` names host variables passed through with their current
    /// values. `tty` allocates a pseudo-terminal.
    pub async fn exec(
        &self,
        config: &ProjectConfig,
        forward: &[String],
        command: &[String],
        tty: bool,
    ) -> Result<(), SandboxError> {
        let name = config.container_name();
        if self.state(&name).await? != ContainerState::Running {
            return Err(SandboxError::not_running(name));
        }

        let image = inspect_image(&self.runner, config.image_ref()).await?;
        let user = resolve_user(&image, &config.user);
        let env = forward_env(forward, |var| std::env::var(var).ok());
        self.runner
            .interactive(&exec_args(&name, &user, &env, tty, command))
            .await
            .map_err(SandboxError::into_child_exited)
    }

    /// Stop and remove `target`. Both steps are best-effort: a container
    /// that is already stopped or gone is the desired end state.
    pub async fn down(&self, target: &str) {
        for args in [strings(&["stop", target]), strings(&["rm", "-f", target])] {
            match self.runner.capture(&args).await {
                Ok(output) if output.success => {}
                Ok(output) => debug!(
                    "Ignoring failed `{}`: {}",
                    display_command(self.runner.engine(), &args),
                    output.stderr.trim()
                ),
                Err(e) => debug!("Ignoring {:#}", anyhow::Error::from(e)),
            }
        }
    }

    /// Names of running managed containers.
    pub async fn list(&self) -> Result<Vec<String>, SandboxError> {
        let filter = format!("name=^{CONTAINER_PREFIX}");
        let output = self
            .checked(&["ps", "--filter", filter.as_str(), "--format", "{{.Names}}"])
            .await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Summarize the project's sandbox.
    pub async fn info(&self, config: &ProjectConfig) -> Result<SandboxInfo, SandboxError> {
        let container = config.container_name();
        let state = self.state(&container).await?;
        Ok(SandboxInfo {
            engine: self.runner.engine(),
            name: config.name.clone(),
            project_dir: config.project_dir.clone(),
            container,
            image: config.image_ref().to_string(),
            build: config.build().is_some(),
            work_dir: config.work_dir.clone(),
            home_dir: config.home_dir.clone(),
            cache_dir: config.cache_dir.clone(),
            state,
        })
    }

    /// Capture a command that must succeed, returning its stdout.
    async fn checked(&self, args: &[&str]) -> Result<String, SandboxError> {
        let args = strings(args);
        let output = self.runner.capture(&args).await?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(SandboxError::command_failed(
                display_command(self.runner.engine(), &args),
                output.code,
                output.stderr,
            ))
        }
    }
}

fn ensure_state_dir(path: &Path) -> Result<(), SandboxError> {
    debug!("Ensuring {} exists", path.display());
    create_private_dir(path).map_err(|e| SandboxError::state_dir(path, e))
}

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}
