//! Ask command handler.
//!
//! Answers a question from the caller's own notes.

use super::{authenticate, print_json};
use clap::Args;
use recall_core::{config::AppConfig, AppError, AppResult};
use recall_llm::create_client;
use recall_notes::{IndexMode, NotesWorkspace, RagResponse};
use recall_prompt::load_prompt;
use std::time::Duration;

/// Shown in place of an answer when any step fails. Details go to the log.
const NO_ANSWER: &str = "Sorry, I couldn't get an answer to that right now.";

/// Ask a question about your notes
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let owner = authenticate(config)?;
        tracing::info!("Executing ask command");

        let workspace = NotesWorkspace::open(&config.workspace, IndexMode::Open)?;
        let prompt = load_prompt(&config.workspace, &workspace.config.prompt_id)?;
        tracing::debug!("Loaded prompt definition: {}", prompt.id);

        let timeout = config
            .completion_timeout_secs()
            .map(Duration::from_secs)
            .unwrap_or_else(|| workspace.config.retrieval.call_timeout());
        let api_key = config.resolve_api_key(&config.provider);
        let client = create_client(
            &config.provider,
            config.completion_endpoint(),
            api_key.as_deref(),
            timeout,
        )
        .map_err(AppError::Config)?;

        let pipeline = workspace.pipeline(client, prompt, &config.model);

        match pipeline.answer(&owner, &self.question).await {
            Ok(response) => self.print_response(&response),
            Err(err) => {
                tracing::error!(
                    stage = %err.stage(),
                    kind = err.kind(),
                    "Query failed: {}",
                    err
                );
                println!("{}", NO_ANSWER);
                Err(err.into())
            }
        }
    }

    fn print_response(&self, response: &RagResponse) -> AppResult<()> {
        if self.json {
            return print_json(response);
        }

        println!("{}", response.answer.trim());

        if tracing::enabled!(tracing::Level::DEBUG) {
            for source in &response.sources {
                tracing::debug!(id = %source.note.id, score = source.score, "Source");
            }
        }
        Ok(())
    }
}
