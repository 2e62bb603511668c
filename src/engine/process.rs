//! Engine runner backed by real child processes.

use async_trait::async_trait;
use std::process::Stdio;
use tracing::debug;

use super::{display_command, CommandOutput, CommandRunner, Engine};
use crate::sandbox::SandboxError;

/// Invokes the engine binary as a child process.
#[derive(Debug, Clone)]
pub(crate) struct ProcessRunner {
    engine: Engine,
}

impl ProcessRunner {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    fn command(&self, args: &[String]) -> tokio::process::Command {
        debug!("+ {}", display_command(self.engine, args));
        let mut cmd = tokio::process::Command::new(self.engine.binary());
        cmd.args(args);
        cmd
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    fn engine(&self) -> Engine {
        self.engine
    }

    async fn capture(&self, args: &[String]) -> Result<CommandOutput, SandboxError> {
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SandboxError::command_spawn(display_command(self.engine, args), e))?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn interactive(&self, args: &[String]) -> Result<(), SandboxError> {
        let status = self
            .command(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| SandboxError::command_spawn(display_command(self.engine, args), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(SandboxError::command_failed(
                display_command(self.engine, args),
                status.code(),
                String::new(),
            ))
        }
    }
}
