//! Chatty CLI: the main entry point.
//!
//! Commands:
//! - `chat`: interactive or single-message conversation
//! - `config`: show the effective configuration

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "chatty",
    about = "Chatty: conversations you can rewrite and recompute",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the model
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Override the configured directive
        #[arg(short, long)]
        directive: Option<String>,

        /// Start without built-in capabilities
        #[arg(long)]
        no_tools: bool,
    },

    /// Show the effective configuration (secrets redacted)
    Config,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so they never interleave with replies on stdout.
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Chat {
            message,
            directive,
            no_tools,
        } => commands::chat::run(message, directive, no_tools).await?,
        Commands::Config => commands::config_cmd::run().await?,
    }

    Ok(())
}
