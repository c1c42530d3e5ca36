//! Recall CLI
//!
//! Personal notes you can ask questions about.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, NoteCommand, ResyncCommand, StatsCommand};
use recall_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Recall - personal notes with question answering
#[derive(Parser, Debug)]
#[command(name = "recall")]
#[command(about = "Personal notes you can ask questions about", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RECALL_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RECALL_CONFIG")]
    config: Option<PathBuf>,

    /// User whose notes to work with
    #[arg(short, long, global = true, env = "RECALL_USER")]
    user: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Completion provider (ollama, openai)
    #[arg(short, long, global = true, env = "RECALL_PROVIDER")]
    provider: Option<String>,

    /// Completion model identifier
    #[arg(short, long, global = true, env = "RECALL_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write and manage notes
    Note(NoteCommand),

    /// Ask a question about your notes
    Ask(AskCommand),

    /// Repair the search index
    Resync(ResyncCommand),

    /// Show note and index counts
    Stats(StatsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.user,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Recall CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_recall_dir()?;

    let command_name = match &cli.command {
        Commands::Note(_) => "note",
        Commands::Ask(_) => "ask",
        Commands::Resync(_) => "resync",
        Commands::Stats(_) => "stats",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Note(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => {
            config.validate()?;
            cmd.execute(&config).await
        }
        Commands::Resync(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
