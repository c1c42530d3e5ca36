//! Resync command handler.
//!
//! Re-embeds every note of the caller and drops vectors whose note is gone.
//! With `--rebuild` the index is emptied first and every owner is re-embedded.

use super::{authenticate, print_json};
use clap::Args;
use recall_core::{config::AppConfig, AppResult};
use recall_notes::{IndexMode, NotesWorkspace};

/// Rebuild the search index from your notes
#[derive(Args, Debug)]
pub struct ResyncCommand {
    /// Discard the whole index first (needed after changing the embedding model)
    #[arg(long)]
    pub rebuild: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ResyncCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let owner = authenticate(config)?;
        tracing::info!(rebuild = self.rebuild, "Executing resync command");

        let mode = if self.rebuild {
            IndexMode::Rebuild
        } else {
            IndexMode::Open
        };
        let workspace = NotesWorkspace::open(&config.workspace, mode)?;
        let service = workspace.service();

        // A rebuild empties the index for everyone, so everyone is re-indexed.
        let report = match mode {
            IndexMode::Rebuild => service.resync_all().await?,
            IndexMode::Open => service.resync(&owner).await?,
        };

        if self.json {
            return print_json(&report);
        }

        println!(
            "Indexed {}/{} notes for {} user(s), pruned {} stale vectors",
            report.indexed, report.notes, report.owners, report.pruned
        );
        if report.degraded > 0 {
            eprintln!(
                "{} notes could not be indexed; see the log for details",
                report.degraded
            );
        }
        Ok(())
    }
}
