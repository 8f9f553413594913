//! Shell command tool

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use stepwise_config::ExecConfig;
use tokio::process::Command;
use tracing::{debug, warn};

use super::path_utils::Workspace;
use super::{truncate_output, ToolError, ToolTrait};
use crate::step::ToolName;

pub struct ExecuteCommandTool {
    workspace: Workspace,
    timeout_secs: u64,
    max_output: usize,
    deny_patterns: Vec<String>,
}

impl ExecuteCommandTool {
    pub fn new(workspace: Workspace) -> Self {
        Self::from_config(workspace, &ExecConfig::default())
    }

    pub fn from_config(workspace: Workspace, config: &ExecConfig) -> Self {
        Self {
            workspace,
            timeout_secs: config.timeout_secs,
            max_output: config.max_output,
            deny_patterns: config
                .deny_patterns
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn is_blocked(&self, command: &str) -> bool {
        let command = command.to_lowercase();
        self.deny_patterns
            .iter()
            .any(|p| !p.is_empty() && command.contains(p.as_str()))
    }
}

#[async_trait]
impl ToolTrait for ExecuteCommandTool {
    fn name(&self) -> ToolName {
        ToolName::ExecuteCommand
    }
    fn description(&self) -> &str {
        "Run a shell command in the workspace and return its output."
    }
    fn input_format(&self) -> &str {
        "shell command"
    }
    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let command = input.trim();
        if command.is_empty() {
            return Err(ToolError::InvalidInput("a command is required".to_string()));
        }
        if self.is_blocked(command) {
            warn!("refusing command: {}", command);
            return Err(ToolError::Blocked);
        }

        debug!("executing: {}", command);
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(self.workspace.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = match tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            cmd.output(),
        )
        .await
        {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ToolError::io("Error executing command", e)),
            Err(_) => return Err(ToolError::Timeout(self.timeout_secs)),
        };

        let mut parts = Vec::new();
        if !result.stdout.is_empty() {
            parts.push(format!("STDOUT:\n{}", String::from_utf8_lossy(&result.stdout)));
        }
        if !result.stderr.is_empty() {
            parts.push(format!("STDERR:\n{}", String::from_utf8_lossy(&result.stderr)));
        }
        let output = if parts.is_empty() {
            "(No output)".to_string()
        } else {
            truncate_output(parts.join("\n"), self.max_output)
        };

        if result.status.success() {
            Ok(output)
        } else {
            // Killed by a signal has no exit code
            Err(ToolError::CommandFailed {
                code: result.status.code().unwrap_or(-1),
                output,
            })
        }
    }
}
