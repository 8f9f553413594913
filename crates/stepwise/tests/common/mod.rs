//! Common test utilities for stepwise integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Isolated HOME with its own config directory and workspace
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub config_dir: PathBuf,
    pub workspace_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let config_dir = temp_dir.path().join(".stepwise");
        let workspace_dir = temp_dir.path().join("workspace");

        std::fs::create_dir_all(&workspace_dir)?;

        Ok(Self {
            temp_dir,
            config_dir,
            workspace_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.json")
    }

    pub fn workspace_file(&self, name: &str) -> PathBuf {
        self.workspace_dir.join(name)
    }

    /// Command running in the temp dir with no API key in its environment
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_stepwise"));
        cmd.current_dir(self.temp_dir.path())
            .env("HOME", self.temp_dir.path())
            .env_remove("OPENAI_API_KEY")
            .env_remove("OPENROUTER_API_KEY")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Write a config pointing at the test workspace
    pub fn create_config(&self, api_key: &str, api_base: Option<&str>) -> anyhow::Result<()> {
        let config = serde_json::json!({
            "agent": {
                "workspace": self.workspace_dir.to_string_lossy(),
                "model": "test-model",
                "max_steps": 5,
                "model_timeout_secs": 10
            },
            "providers": {
                "openai": { "api_key": api_key, "api_base": api_base }
            }
        });
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::write(self.config_file(), serde_json::to_string_pretty(&config)?)?;
        Ok(())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}

/// Body of a `/chat/completions` response whose message is `content`
pub fn completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
    .to_string()
}
