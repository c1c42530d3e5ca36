//! Note command handler.
//!
//! Create, edit, pin, remove and browse notes. Every write reports whether
//! the vector index kept up; a degraded write still succeeds.

use super::{authenticate, print_json};
use clap::{Args, Subcommand};
use recall_core::{config::AppConfig, AppResult};
use recall_notes::{
    IndexMode, IndexStatus, Note, NoteId, NoteUpdate, NotesWorkspace, Page, WriteResult,
};

/// Manage notes
#[derive(Args, Debug)]
pub struct NoteCommand {
    #[command(subcommand)]
    pub action: NoteAction,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum NoteAction {
    /// Write a new note
    Add {
        /// Note text
        content: String,
    },
    /// Replace a note's text
    Edit {
        id: String,
        /// New note text
        content: String,
    },
    /// Pin a note
    Pin { id: String },
    /// Unpin a note
    Unpin { id: String },
    /// Delete a note
    Rm { id: String },
    /// Show one note
    Show { id: String },
    /// List notes, newest first
    List {
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Notes per page
        #[arg(long, default_value_t = recall_notes::types::DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },
}

impl NoteCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let owner = authenticate(config)?;
        tracing::info!("Executing note command");
        tracing::debug!("Note options: {:?}", self.action);

        let workspace = NotesWorkspace::open(&config.workspace, IndexMode::Open)?;
        let service = workspace.service();

        match &self.action {
            NoteAction::Add { content } => {
                let result = service.create(&owner, content).await?;
                self.print_write(&result)
            }
            NoteAction::Edit { id, content } => {
                let update = NoteUpdate {
                    content: Some(content.clone()),
                    pinned: None,
                };
                let result = service.update(&owner, &NoteId::from(id.as_str()), update).await?;
                self.print_write(&result)
            }
            NoteAction::Pin { id } => {
                let result = service.set_pinned(&owner, &NoteId::from(id.as_str()), true).await?;
                self.print_write(&result)
            }
            NoteAction::Unpin { id } => {
                let result = service.set_pinned(&owner, &NoteId::from(id.as_str()), false).await?;
                self.print_write(&result)
            }
            NoteAction::Rm { id } => {
                let result = service.delete(&owner, &NoteId::from(id.as_str())).await?;
                if self.json {
                    return print_json(&result);
                }
                println!("Deleted {}", result.removed);
                warn_if_degraded(&result.index);
                Ok(())
            }
            NoteAction::Show { id } => {
                let note = service.get(&owner, &NoteId::from(id.as_str())).await?;
                if self.json {
                    return print_json(&note);
                }
                print_note(&note);
                Ok(())
            }
            NoteAction::List { page, limit } => {
                let page = service.list(&owner, Page::new(*page, *limit)).await?;
                if self.json {
                    return print_json(&page);
                }
                for note in &page.notes {
                    print_note(note);
                }
                let p = &page.pagination;
                println!(
                    "Page {}/{} ({} notes{})",
                    p.page,
                    p.total_pages.max(1),
                    p.total,
                    if p.has_more { ", more available" } else { "" }
                );
                Ok(())
            }
        }
    }

    fn print_write(&self, result: &WriteResult) -> AppResult<()> {
        if self.json {
            return print_json(result);
        }
        print_note(&result.note);
        warn_if_degraded(&result.index);
        Ok(())
    }
}

fn print_note(note: &Note) {
    let pin = if note.pinned { " [pinned]" } else { "" };
    println!(
        "{}{}  {}",
        note.id,
        pin,
        note.updated_at.format("%Y-%m-%d %H:%M")
    );
    println!("  {}", note.content);
}

fn warn_if_degraded(status: &IndexStatus) {
    if let IndexStatus::Degraded { reason } = status {
        eprintln!(
            "Saved, but search may not see this change yet ({}). Run `recall resync` to repair.",
            reason
        );
    }
}
