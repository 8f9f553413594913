//! stepwise command implementations

use anyhow::{bail, Context, Result};
use std::io::{BufRead, Write};
use tracing::{debug, info};

use stepwise_agent::{StdoutTranscript, StepLoop, ToolRegistry};
use stepwise_config::{self, Config, OPENAI_API_KEY_ENV, OPENROUTER_API_KEY_ENV};
use stepwise_provider::OpenAiProvider;

const EXIT_WORDS: [&str; 3] = ["quit", "exit", "q"];

/// Write the default config
pub async fn init_command() -> Result<()> {
    println!("Initializing stepwise...");

    let config = stepwise_config::init()
        .await
        .context("failed to write default config")?;

    let workspace = config.workspace_path();
    tokio::fs::create_dir_all(&workspace)
        .await
        .with_context(|| format!("failed to create workspace {}", workspace.display()))?;

    println!(
        "✓ Config at {}",
        stepwise_config::config_path().display()
    );
    println!("\nNext steps:");
    println!(
        "  1. Export {} (or {}), or add a key to the config file",
        OPENAI_API_KEY_ENV, OPENROUTER_API_KEY_ENV
    );
    println!("  2. Start chatting: stepwise chat");

    Ok(())
}

/// Run one query, or an interactive session when `message` is `None`
pub async fn chat_command(message: Option<String>) -> Result<()> {
    let config = Config::load().await.context("failed to load config")?;

    let api_key = config.api_key().with_context(|| {
        format!(
            "No API key configured. Set {} or add one to {}",
            OPENAI_API_KEY_ENV,
            stepwise_config::config_path().display()
        )
    })?;
    let provider = OpenAiProvider::new(api_key, config.api_base(), Some(config.default_model()));
    let agent = StepLoop::from_config(provider, &config);
    debug!(
        "workspace {}, {} tools",
        config.workspace_path().display(),
        agent.tools().names().len()
    );

    if let Some(query) = message {
        let turn = agent.run_turn(&query, &mut StdoutTranscript).await;
        // The transcript already shows the failure line
        if let Some(e) = turn.error() {
            bail!("turn failed: {}", e);
        }
        return Ok(());
    }

    println!("stepwise (type 'quit' to exit)");
    println!("{}", "-".repeat(40));

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("\nYou: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            println!();
            break;
        };
        let line = line.context("failed to read from stdin")?;
        let query = line.trim();

        if EXIT_WORDS.contains(&query.to_lowercase().as_str()) {
            println!("Goodbye!");
            break;
        }
        if query.is_empty() {
            continue;
        }

        let turn = agent.run_turn(query, &mut StdoutTranscript).await;
        info!("turn finished after {} model queries", turn.model_queries);
    }

    Ok(())
}

/// Print where things are and what is configured
pub async fn status_command() -> Result<()> {
    let config_path = stepwise_config::config_path();

    println!("stepwise status");
    println!("{}", "-".repeat(40));
    println!(
        "Config:     {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing]"
        }
    );

    let config = Config::load().await.context("failed to load config")?;
    let workspace = config.workspace_path();
    println!(
        "Workspace:  {} {}",
        workspace.display(),
        if workspace.is_dir() { "[OK]" } else { "[Missing]" }
    );
    println!("Model:      {}", config.default_model());
    println!("API key:    {}", key_source(&config));
    println!("Max steps:  {}", config.agent.max_steps);
    println!(
        "Restricted: {}",
        if config.tools.restrict_to_workspace {
            "yes"
        } else {
            "no"
        }
    );

    let tools = ToolRegistry::from_config(&config).names();
    let names: Vec<&str> = tools.iter().map(|t| t.as_str()).collect();
    println!(
        "Tools:      {}",
        if names.is_empty() {
            "(none)".to_string()
        } else {
            names.join(", ")
        }
    );

    Ok(())
}

fn key_source(config: &Config) -> String {
    let from_env = |var: &str| {
        std::env::var(var)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false)
    };
    if from_env(OPENAI_API_KEY_ENV) {
        format!("[Set] ({})", OPENAI_API_KEY_ENV)
    } else if from_env(OPENROUTER_API_KEY_ENV) {
        format!("[Set] ({})", OPENROUTER_API_KEY_ENV)
    } else if config.file_api_key().is_some() {
        "[Set] (config file)".to_string()
    } else {
        "[Missing]".to_string()
    }
}
