//! System prompt assembly

use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::tools::{ToolRegistry, FIELD_DELIMITER};

/// Optional project notes appended to the prompt when present in the workspace
pub const PROJECT_NOTES_FILE: &str = "STEPWISE.md";

/// Builds the system prompt that teaches the model the step protocol
pub struct ContextBuilder {
    workspace: PathBuf,
}

impl ContextBuilder {
    pub fn new(workspace: impl AsRef<Path>) -> Self {
        Self {
            workspace: workspace.as_ref().to_path_buf(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub async fn build_system_prompt(&self, tools: &ToolRegistry) -> String {
        let mut parts = vec![self.protocol(tools), Self::examples().to_string()];

        if let Some(notes) = self.load_project_notes().await {
            parts.push(format!("# Project notes ({})\n\n{}", PROJECT_NOTES_FILE, notes));
        }

        parts.join("\n\n---\n\n")
    }

    fn protocol(&self, tools: &ToolRegistry) -> String {
        let now = Local::now().format("%Y-%m-%d %H:%M (%A)");
        let catalogue = if tools.names().is_empty() {
            "(no tools are available)".to_string()
        } else {
            tools.catalogue()
        };

        format!(
            r#"# stepwise

You are a coding assistant working in a local workspace. You reason in explicit
steps and reply with exactly one JSON object per message, never prose around it.

## Steps
- START: restate the user's request. Fields: step, content
- PLAN: one piece of reasoning. Fields: step, content
- TOOL: call one tool. Fields: step, tool, input
- OUTPUT: the final answer for the user. Fields: step, content

After each TOOL you receive an OBSERVE message with the tool's output. Never
write an OBSERVE step yourself.

## Rules
1. Begin with START.
2. Use PLAN to think before acting.
3. Call one tool at a time and wait for its OBSERVE.
4. A tool output starting with "Error:" means the call failed; adjust and retry or explain.
5. Finish with OUTPUT.
6. Multi-part inputs separate their fields with {delim}.
7. For a new project, create a dedicated directory first and put its files inside it.

## Tools
{catalogue}

## Workspace
Relative paths resolve against: {workspace}

## Current Time
{now}"#,
            delim = FIELD_DELIMITER,
            catalogue = catalogue,
            workspace = self.workspace.display(),
            now = now,
        )
    }

    fn examples() -> &'static str {
        r#"# Examples

User: What files are in the current directory?
{"step": "START", "content": "The user wants the contents of the current directory"}
{"step": "PLAN", "content": "list_files on . answers this"}
{"step": "TOOL", "tool": "list_files", "input": "."}
{"step": "OBSERVE", "tool": "list_files", "input": ".", "output": "[DIR]  src/\n[FILE] main.py (120 bytes)"}
{"step": "OUTPUT", "content": "There is one directory, src/, and one file, main.py."}

User: Create hello.py that prints Hello World
{"step": "START", "content": "The user wants a hello.py script"}
{"step": "TOOL", "tool": "write_file", "input": "hello.py|||print('Hello World')\n"}
{"step": "OBSERVE", "tool": "write_file", "input": "hello.py|||print('Hello World')\n", "output": "Successfully wrote 21 characters to 'hello.py'"}
{"step": "OUTPUT", "content": "Created hello.py."}

User: Find TODO comments in Python files
{"step": "START", "content": "The user wants every TODO in .py files"}
{"step": "TOOL", "tool": "search_code", "input": "TODO|||.|||.py"}
{"step": "OBSERVE", "tool": "search_code", "input": "TODO|||.|||.py", "output": "main.py:10: # TODO: handle errors"}
{"step": "OUTPUT", "content": "One TODO, in main.py on line 10."}"#
    }

    async fn load_project_notes(&self) -> Option<String> {
        let path = self.workspace.join(PROJECT_NOTES_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) if !content.trim().is_empty() => Some(content),
            Ok(_) => None,
            Err(e) => {
                debug!("no project notes at {:?}: {}", path, e);
                None
            }
        }
    }
}
