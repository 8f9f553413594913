//! Tool registry and the built-in tools
//!
//! Every tool takes a single string and returns a single string. Inputs with
//! several fields join them with [`FIELD_DELIMITER`]; each tool splits its
//! own input into a typed record as soon as it is called.

pub mod filesystem;
pub mod path_utils;
pub mod search;
pub mod shell;

pub use filesystem::{CreateDirectoryTool, ListFilesTool, ReadFileTool, WriteFileTool};
pub use path_utils::Workspace;
pub use search::SearchCodeTool;
pub use shell::ExecuteCommandTool;

use async_trait::async_trait;
use std::collections::BTreeMap;
use stepwise_config::Config;
use thiserror::Error;
use tracing::{debug, warn};

use crate::step::ToolName;

/// Separator between fields of a multi-part tool input
pub const FIELD_DELIMITER: &str = "|||";

/// Tool failures. The registry turns these into `Error: ...` strings for the
/// model.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("File '{0}' does not exist")]
    FileNotFound(String),

    #[error("'{0}' is not a file")]
    NotAFile(String),

    #[error("Directory '{0}' does not exist")]
    DirectoryNotFound(String),

    #[error("'{0}' is not a directory")]
    NotADirectory(String),

    #[error("Path {path} is outside workspace {workspace}")]
    OutsideWorkspace { path: String, workspace: String },

    #[error("Command blocked for safety reasons")]
    Blocked,

    #[error("Command timed out after {0} seconds")]
    Timeout(u64),

    #[error("Command exited with code {code}\n{output}")]
    CommandFailed { code: i32, output: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> ToolName;
    fn description(&self) -> &str;
    /// Shape of the input string, as shown to the model
    fn input_format(&self) -> &str;
    async fn execute(&self, input: &str) -> Result<String, ToolError>;
}

/// Fixed mapping from tool name to handler
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// All built-in tools except those disabled in `config`
    pub fn from_config(config: &Config) -> Self {
        let workspace = Workspace::new(
            config.workspace_path(),
            config.tools.restrict_to_workspace,
        );
        let mut registry = Self::new();
        register_default_tools(&mut registry, config, &workspace);
        registry
    }

    /// Replaces any tool already registered under the same name
    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name(), Box::new(tool));
    }

    pub fn get(&self, name: ToolName) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.tools.get(&name).map(|t| t.as_ref())
    }

    pub fn has(&self, name: ToolName) -> bool {
        self.tools.contains_key(&name)
    }

    pub fn names(&self) -> Vec<ToolName> {
        self.tools.keys().copied().collect()
    }

    /// Tool list for the system prompt
    pub fn catalogue(&self) -> String {
        self.tools
            .values()
            .map(|t| {
                format!(
                    "- {}: {} Input: {}",
                    t.name(),
                    t.description(),
                    t.input_format()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Run a tool. Never fails: errors come back as text starting with
    /// `Error:` so the model can react to them.
    pub async fn invoke(&self, name: ToolName, input: &str) -> String {
        let Some(tool) = self.tools.get(&name) else {
            warn!("tool {} is not registered", name);
            return format!("Error: Tool '{}' is not available", name);
        };

        debug!("invoking {} ({} bytes of input)", name, input.len());
        match tool.execute(input).await {
            Ok(output) => output,
            Err(e) => {
                warn!("tool {} failed: {}", name, e);
                format!("Error: {}", e)
            }
        }
    }

    /// [`invoke`](Self::invoke) for a name that has not been validated yet
    pub async fn invoke_by_name(&self, name: &str, input: &str) -> String {
        match name.parse::<ToolName>() {
            Ok(tool) => self.invoke(tool, input).await,
            Err(_) => format!("Error: Unknown tool '{}'", name),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the built-in tools not listed in `tools.disabled`
pub fn register_default_tools(registry: &mut ToolRegistry, config: &Config, workspace: &Workspace) {
    let enabled = |name: ToolName| !config.is_tool_disabled(name.as_str());

    if enabled(ToolName::ReadFile) {
        registry.register(ReadFileTool::new(workspace.clone()));
    }
    if enabled(ToolName::WriteFile) {
        registry.register(WriteFileTool::new(workspace.clone()));
    }
    if enabled(ToolName::CreateDirectory) {
        registry.register(CreateDirectoryTool::new(workspace.clone()));
    }
    if enabled(ToolName::ListFiles) {
        registry.register(ListFilesTool::new(workspace.clone()));
    }
    if enabled(ToolName::ExecuteCommand) {
        registry.register(ExecuteCommandTool::from_config(
            workspace.clone(),
            &config.tools.exec,
        ));
    }
    if enabled(ToolName::SearchCode) {
        registry.register(SearchCodeTool::new(
            workspace.clone(),
            config.tools.search.max_matches,
        ));
    }
}

/// Split `input` into at most `max` delimiter-separated fields
pub(crate) fn split_fields(input: &str, max: usize) -> Result<Vec<&str>, ToolError> {
    let fields: Vec<&str> = input.split(FIELD_DELIMITER).collect();
    if fields.len() > max {
        return Err(ToolError::InvalidInput(format!(
            "expected at most {} fields separated by '{}', got {}",
            max,
            FIELD_DELIMITER,
            fields.len()
        )));
    }
    Ok(fields)
}

/// Cut `text` to at most `max` bytes on a char boundary, noting how much was dropped
pub(crate) fn truncate_output(text: String, max: usize) -> String {
    if text.len() <= max {
        return text;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}\n... (output truncated, {} more bytes)",
        &text[..cut],
        text.len() - cut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields() {
        assert_eq!(split_fields("a|||b|||c", 3).unwrap(), vec!["a", "b", "c"]);
        assert_eq!(split_fields("a", 3).unwrap(), vec!["a"]);
        assert!(matches!(
            split_fields("a|||b|||c|||d", 3),
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_truncate_output() {
        assert_eq!(truncate_output("short".to_string(), 10), "short");

        let long = "ab".repeat(10);
        let cut = truncate_output(long, 5);
        assert!(cut.starts_with("ababa\n"));
        assert!(cut.contains("15 more bytes"));

        // 'é' is two bytes; cutting at 3 must back off to 2
        let cut = truncate_output("éé".to_string(), 3);
        assert!(cut.starts_with("é\n"));
    }
}
