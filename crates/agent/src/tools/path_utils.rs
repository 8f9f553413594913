//! Resolving tool paths against the workspace

use std::path::{Component, Path, PathBuf};

use super::ToolError;

/// Root that relative tool paths are resolved against, optionally confining
/// every path to it
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    restrict: bool,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, restrict: bool) -> Self {
        Self {
            root: root.into(),
            restrict,
        }
    }

    /// Unrestricted workspace rooted at `root`
    pub fn unrestricted(root: impl Into<PathBuf>) -> Self {
        Self::new(root, false)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_restricted(&self) -> bool {
        self.restrict
    }

    /// Resolve a path given by the model.
    ///
    /// `~/` is expanded, relative paths are joined to the root. When the
    /// workspace is restricted the result must stay inside the root after
    /// symlinks and `..` are resolved.
    pub async fn resolve(&self, path: &str) -> Result<PathBuf, ToolError> {
        let expanded = expand_tilde(path);
        let joined = if expanded.is_absolute() {
            expanded
        } else {
            self.root.join(expanded)
        };

        if !self.restrict {
            return Ok(joined);
        }

        let absolute = absolutize(&joined).await?;
        let root = absolutize(&self.root).await?;
        if !is_path_within_workspace(&absolute, &root) {
            return Err(ToolError::OutsideWorkspace {
                path: path.to_string(),
                workspace: root.display().to_string(),
            });
        }
        Ok(absolute)
    }
}

/// Canonicalize the longest existing ancestor and lexically normalize the rest
async fn absolutize(path: &Path) -> Result<PathBuf, ToolError> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| ToolError::io("reading current directory", e))?
            .join(path)
    };

    let mut existing = path.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = tokio::fs::canonicalize(existing).await {
            let mut result = canonical;
            for part in rest.iter().rev() {
                result.push(part);
            }
            return Ok(normalize(&result));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(normalize(&path)),
        }
    }
}

/// Resolve `.` and `..` without touching the file system
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Component-wise prefix check
fn is_path_within_workspace(path: &Path, workspace: &Path) -> bool {
    path.starts_with(workspace)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
