//! stepwise - a step-by-step coding assistant

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{chat_command, init_command, status_command};

/// stepwise - coding assistant for your terminal
#[derive(Parser)]
#[command(name = "stepwise")]
#[command(about = "A step-by-step coding assistant for your terminal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default config
    Init,
    /// Chat with the assistant
    Chat {
        /// Run a single query and exit
        #[arg(short, long)]
        message: Option<String>,
        /// Verbose logging
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show configuration status
    Status,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Logs go to stderr; stdout carries the transcript
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(matches!(cli.command, Commands::Chat { verbose: true, .. }));

    let result = match cli.command {
        Commands::Init => init_command().await,
        Commands::Chat { message, .. } => chat_command(message).await,
        Commands::Status => status_command().await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
