//! File system tools

use async_trait::async_trait;
use std::io::ErrorKind;
use tracing::debug;

use super::path_utils::Workspace;
use super::{ToolError, ToolTrait, FIELD_DELIMITER};
use crate::step::ToolName;

fn required_path(input: &str) -> Result<&str, ToolError> {
    let path = input.trim();
    if path.is_empty() {
        return Err(ToolError::InvalidInput("a path is required".to_string()));
    }
    Ok(path)
}

pub struct ReadFileTool {
    workspace: Workspace,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolTrait for ReadFileTool {
    fn name(&self) -> ToolName {
        ToolName::ReadFile
    }
    fn description(&self) -> &str {
        "Read the contents of a file."
    }
    fn input_format(&self) -> &str {
        "file_path"
    }
    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let raw = required_path(input)?;
        let path = self.workspace.resolve(raw).await?;

        debug!("reading {:?}", path);
        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ToolError::FileNotFound(raw.to_string()))
            }
            Err(e) => return Err(ToolError::io("Error reading file", e)),
        };
        if !meta.is_file() {
            return Err(ToolError::NotAFile(raw.to_string()));
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::io("Error reading file", e))?;
        if content.is_empty() {
            Ok("(Empty file)".to_string())
        } else {
            Ok(content)
        }
    }
}

/// Input of `write_file`: `path|||content`
#[derive(Debug, PartialEq, Eq)]
pub struct WriteFileInput<'a> {
    pub path: &'a str,
    pub content: &'a str,
}

impl<'a> WriteFileInput<'a> {
    /// Splits on the first delimiter only, so the content may contain it
    pub fn parse(input: &'a str) -> Result<Self, ToolError> {
        let (path, content) = input.split_once(FIELD_DELIMITER).ok_or_else(|| {
            ToolError::InvalidInput(format!(
                "expected 'file_path{}content'",
                FIELD_DELIMITER
            ))
        })?;
        Ok(Self {
            path: required_path(path)?,
            content,
        })
    }
}

pub struct WriteFileTool {
    workspace: Workspace,
}

impl WriteFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolTrait for WriteFileTool {
    fn name(&self) -> ToolName {
        ToolName::WriteFile
    }
    fn description(&self) -> &str {
        "Create or overwrite a file, creating parent directories as needed."
    }
    fn input_format(&self) -> &str {
        "file_path|||content"
    }
    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let args = WriteFileInput::parse(input)?;
        let path = self.workspace.resolve(args.path).await?;

        debug!("writing {:?}", path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io("Error writing file", e))?;
        }
        tokio::fs::write(&path, args.content)
            .await
            .map_err(|e| ToolError::io("Error writing file", e))?;

        Ok(format!(
            "Successfully wrote {} characters to '{}'",
            args.content.chars().count(),
            args.path
        ))
    }
}

pub struct CreateDirectoryTool {
    workspace: Workspace,
}

impl CreateDirectoryTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolTrait for CreateDirectoryTool {
    fn name(&self) -> ToolName {
        ToolName::CreateDirectory
    }
    fn description(&self) -> &str {
        "Create a directory and any missing parents."
    }
    fn input_format(&self) -> &str {
        "directory_path"
    }
    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let raw = required_path(input)?;
        let path = self.workspace.resolve(raw).await?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {
                return Ok(format!("Directory '{}' already exists", raw));
            }
            Ok(_) => {
                return Err(ToolError::InvalidInput(format!(
                    "'{}' exists but is not a directory",
                    raw
                )))
            }
            Err(_) => {}
        }

        debug!("creating directory {:?}", path);
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| ToolError::io("Error creating directory", e))?;
        Ok(format!("Successfully created directory '{}'", raw))
    }
}

pub struct ListFilesTool {
    workspace: Workspace,
}

impl ListFilesTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl ToolTrait for ListFilesTool {
    fn name(&self) -> ToolName {
        ToolName::ListFiles
    }
    fn description(&self) -> &str {
        "List the files and directories in a directory."
    }
    fn input_format(&self) -> &str {
        "directory_path (defaults to '.')"
    }
    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let raw = match input.trim() {
            "" => ".",
            path => path,
        };
        let path = self.workspace.resolve(raw).await?;

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ToolError::NotADirectory(raw.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ToolError::DirectoryNotFound(raw.to_string()))
            }
            Err(e) => return Err(ToolError::io("Error listing directory", e)),
        }

        let mut dir = tokio::fs::read_dir(&path)
            .await
            .map_err(|e| ToolError::io("Error listing directory", e))?;
        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| ToolError::io("Error listing directory", e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            // Follows symlinks, like a plain stat
            let meta = tokio::fs::metadata(entry.path()).await.ok();
            let line = match meta {
                Some(m) if m.is_dir() => format!("[DIR]  {}/", name),
                Some(m) => format!("[FILE] {} ({} bytes)", name, m.len()),
                None => format!("[FILE] {} (0 bytes)", name),
            };
            entries.push((name, line));
        }

        if entries.is_empty() {
            return Ok(format!("Directory '{}' is empty", raw));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries
            .into_iter()
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_input_splits_on_first_delimiter() {
        let args = WriteFileInput::parse("notes.md|||a|||b").unwrap();
        assert_eq!(args.path, "notes.md");
        assert_eq!(args.content, "a|||b");
    }

    #[test]
    fn test_write_input_allows_empty_content() {
        let args = WriteFileInput::parse("empty.txt|||").unwrap();
        assert_eq!(args.content, "");
    }

    #[test]
    fn test_write_input_requires_delimiter_and_path() {
        assert!(matches!(
            WriteFileInput::parse("only-a-path.txt"),
            Err(ToolError::InvalidInput(_))
        ));
        assert!(matches!(
            WriteFileInput::parse("  |||content"),
            Err(ToolError::InvalidInput(_))
        ));
    }
}
