//! In-memory engine for lifecycle tests.
//!
//! Emulates the subset of podman/docker behavior airlock depends on: an
//! image inspect record, per-name container state, and the exit statuses
//! of `start`/`stop`/`rm` against missing containers. Every invocation is
//! recorded for assertions.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use super::{display_command, CommandOutput, CommandRunner, Engine};
use crate::sandbox::{ContainerState, SandboxError};

/// Image record returned by `image inspect` unless overridden.
pub(crate) const DEFAULT_IMAGE_JSON: &str = r#"[{
    "Id": "sha256:0123",
    "Config": {
        "User": "ubuntu",
        "WorkingDir": "/workspace",
        "Env": ["PATH=/usr/local/bin:/usr/bin:/bin", "LANG=C.UTF-8", "HOME=/wrong"]
    }
}]"#;

#[derive(Debug)]
struct FakeState {
    containers: BTreeMap<String, ContainerState>,
    image_json: String,
    failing: HashSet<String>,
    calls: Vec<Vec<String>>,
}

/// A scripted container engine.
#[derive(Debug)]
pub(crate) struct FakeEngine {
    engine: Engine,
    state: Mutex<FakeState>,
}

impl FakeEngine {
    /// A podman-flavoured engine with no containers.
    pub fn new() -> Self {
        Self::with_engine(Engine::Podman)
    }

    /// An empty engine pretending to be `engine`.
    pub fn with_engine(engine: Engine) -> Self {
        Self {
            engine,
            state: Mutex::new(FakeState {
                containers: BTreeMap::new(),
                image_json: DEFAULT_IMAGE_JSON.to_string(),
                failing: HashSet::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Seed a container in the given state.
    pub fn with_container(self, name: &str, state: ContainerState) -> Self {
        self.state
            .lock()
            .unwrap()
            .containers
            .insert(name.to_string(), state);
        self
    }

    /// Replace the `image inspect` output.
    pub fn with_image_json(self, json: &str) -> Self {
        self.state.lock().unwrap().image_json = json.to_string();
        self
    }

    /// Make every invocation of `subcommand` exit non-zero.
    pub fn failing(self, subcommand: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(subcommand.to_string());
        self
    }

    /// All recorded invocations, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of invocations whose first argument is `subcommand`.
    pub fn count(&self, subcommand: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.first().map(String::as_str) == Some(subcommand))
            .count()
    }

    /// The most recent invocation of `subcommand`.
    pub fn last(&self, subcommand: &str) -> Option<Vec<String>> {
        self.calls()
            .into_iter()
            .rev()
            .find(|call| call.first().map(String::as_str) == Some(subcommand))
    }

    /// Current state of a container.
    pub fn state_of(&self, name: &str) -> ContainerState {
        self.state
            .lock()
            .unwrap()
            .containers
            .get(name)
            .copied()
            .unwrap_or(ContainerState::Absent)
    }

    fn respond(&self, args: &[String]) -> CommandOutput {
        let mut state = self.state.lock().unwrap();
        state.calls.push(args.to_vec());

        let words: Vec<&str> = args.iter().map(String::as_str).collect();
        let Some(&subcommand) = words.first() else {
            return CommandOutput::failed(125, "no command");
        };
        if state.failing.contains(subcommand) {
            return CommandOutput::failed(3, format!("{subcommand} failed"));
        }
        let target = words.last().map(|s| (*s).to_string()).unwrap_or_default();
        let missing = || CommandOutput::failed(125, format!("no such container: {target}"));

        match words.as_slice() {
            ["image", "inspect", ..] => CommandOutput::ok(state.image_json.clone()),
            ["container", "inspect", _] => match state.containers.get(&target) {
                Some(_) => CommandOutput::ok(format!("[{{\"Name\": \"{target}\"}}]")),
                None => missing(),
            },
            ["inspect", "-f", "{{.State.Running}}", _] => match state.containers.get(&target) {
                Some(ContainerState::Running) => CommandOutput::ok("true\n"),
                Some(_) => CommandOutput::ok("false\n"),
                None => missing(),
            },
            ["run", ..] => {
                let name = words
                    .iter()
                    .position(|w| *w == "--name")
                    .and_then(|i| words.get(i + 1))
                    .map(|s| (*s).to_string())
                    .unwrap_or_default();
                if state.containers.contains_key(&name) {
                    return CommandOutput::failed(125, format!("name {name} is already in use"));
                }
                state.containers.insert(name, ContainerState::Running);
                CommandOutput::ok("0123456789ab\n")
            }
            ["start", _] => match state.containers.get_mut(&target) {
                Some(s) => {
                    *s = ContainerState::Running;
                    CommandOutput::ok(format!("{target}\n"))
                }
                None => missing(),
            },
            ["stop", _] => match state.containers.get_mut(&target) {
                Some(s) => {
                    *s = ContainerState::Stopped;
                    CommandOutput::ok(format!("{target}\n"))
                }
                None => missing(),
            },
            ["rm", "-f", _] => match state.containers.remove(&target) {
                Some(_) => CommandOutput::ok(format!("{target}\n")),
                None => missing(),
            },
            ["ps", ..] => {
                let names: Vec<&str> = state
                    .containers
                    .iter()
                    .filter(|(_, s)| **s == ContainerState::Running)
                    .map(|(n, _)| n.as_str())
                    .collect();
                CommandOutput::ok(format!("{}\n", names.join("\n")))
            }
            _ => CommandOutput::ok(""),
        }
    }
}

#[async_trait]
impl CommandRunner for FakeEngine {
    fn engine(&self) -> Engine {
        self.engine
    }

    async fn capture(&self, args: &[String]) -> Result<CommandOutput, SandboxError> {
        Ok(self.respond(args))
    }

    async fn interactive(&self, args: &[String]) -> Result<(), SandboxError> {
        let output = self.respond(args);
        if output.success {
            Ok(())
        } else {
            Err(SandboxError::command_failed(
                display_command(self.engine, args),
                output.code,
                output.stderr,
            ))
        }
    }
}
