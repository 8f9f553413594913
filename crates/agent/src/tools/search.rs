//! Recursive text search

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::path_utils::Workspace;
use super::{split_fields, ToolError, ToolTrait};
use crate::step::ToolName;

/// Input of `search_code`: `pattern[|||directory[|||extension]]`
#[derive(Debug, PartialEq, Eq)]
pub struct SearchCodeInput<'a> {
    pub pattern: &'a str,
    pub directory: &'a str,
    pub extension: Option<&'a str>,
}

impl<'a> SearchCodeInput<'a> {
    pub fn parse(input: &'a str) -> Result<Self, ToolError> {
        let fields = split_fields(input, 3)?;
        let pattern = fields[0];
        if pattern.trim().is_empty() {
            return Err(ToolError::InvalidInput("a search pattern is required".to_string()));
        }
        let directory = match fields.get(1).map(|d| d.trim()) {
            Some(dir) if !dir.is_empty() => dir,
            _ => ".",
        };
        let extension = fields
            .get(2)
            .map(|e| e.trim())
            .filter(|e| !e.is_empty());
        Ok(Self {
            pattern,
            directory,
            extension,
        })
    }
}

pub struct SearchCodeTool {
    workspace: Workspace,
    max_matches: usize,
}

impl SearchCodeTool {
    pub fn new(workspace: Workspace, max_matches: usize) -> Self {
        Self {
            workspace,
            max_matches,
        }
    }
}

#[async_trait]
impl ToolTrait for SearchCodeTool {
    fn name(&self) -> ToolName {
        ToolName::SearchCode
    }
    fn description(&self) -> &str {
        "Case-insensitive search for text in files under a directory, skipping hidden files."
    }
    fn input_format(&self) -> &str {
        "pattern|||directory_path|||file_extension (directory and extension optional)"
    }
    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let args = SearchCodeInput::parse(input)?;
        let root = self.workspace.resolve(args.directory).await?;

        match tokio::fs::metadata(&root).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => return Err(ToolError::NotADirectory(args.directory.to_string())),
            Err(_) => return Err(ToolError::DirectoryNotFound(args.directory.to_string())),
        }

        debug!("searching {:?} for {:?}", root, args.pattern);
        let pattern = args.pattern.to_lowercase();
        let extension = args.extension.map(str::to_string);
        let (matches, searched) =
            tokio::task::spawn_blocking(move || scan(&root, &pattern, extension.as_deref()))
                .await
                .map_err(|e| ToolError::io("Error searching code", std::io::Error::other(e)))?;

        Ok(format_matches(
            matches,
            searched,
            args.pattern,
            self.max_matches,
        ))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Walk `root` and collect `relpath:line: text` for every matching line.
/// Returns the matches and the number of files read.
fn scan(root: &Path, pattern: &str, extension: Option<&str>) -> (Vec<String>, usize) {
    let mut matches = Vec::new();
    let mut searched = 0;

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker.filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if let Some(ext) = extension {
            if !name.ends_with(ext) {
                continue;
            }
        }
        let Ok(bytes) = std::fs::read(entry.path()) else {
            continue;
        };
        searched += 1;

        let text = String::from_utf8_lossy(&bytes);
        let rel: PathBuf = entry
            .path()
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        for (idx, line) in text.lines().enumerate() {
            if line.to_lowercase().contains(pattern) {
                matches.push(format!("{}:{}: {}", rel.display(), idx + 1, line.trim()));
            }
        }
    }

    (matches, searched)
}

fn format_matches(matches: Vec<String>, searched: usize, pattern: &str, limit: usize) -> String {
    if matches.is_empty() {
        return format!("No matches found for '{}' in {} files", pattern, searched);
    }
    let total = matches.len();
    let mut shown = matches.into_iter().take(limit).collect::<Vec<_>>().join("\n");
    if total > limit {
        shown.push_str(&format!("\n... ({} more matches)", total - limit));
    }
    shown
}
