//! Stats command handler.

use super::{authenticate, print_json};
use clap::Args;
use recall_core::{config::AppConfig, AppResult};
use recall_notes::{IndexMode, NotesWorkspace};

/// Show note and index counts
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let owner = authenticate(config)?;
        tracing::info!("Executing stats command");

        let workspace = NotesWorkspace::open(&config.workspace, IndexMode::Open)?;
        let stats = workspace.service().stats(&owner).await?;

        if self.json {
            return print_json(&stats);
        }

        println!("Notes:            {}", stats.notes);
        println!("Indexed vectors:  {}", stats.indexed_vectors);
        println!("Not yet indexed:  {}", stats.unindexed_notes);
        println!("Stale vectors:    {}", stats.dangling_vectors);
        if stats.unindexed_notes > 0 || stats.dangling_vectors > 0 {
            println!("Run `recall resync` to bring the index up to date.");
        }
        Ok(())
    }
}
