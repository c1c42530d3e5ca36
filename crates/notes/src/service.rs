//! Note operations as seen by a signed-in user.

use crate::store::NoteStore;
use crate::sync::{IndexStatus, NoteIndexer, ResyncReport};
use crate::types::{normalize_content, NewNote, Note, NoteId, NotePage, NoteUpdate, OwnerId, Page};
use crate::vector_index::OwnerFilter;
use recall_core::{AppError, AppResult};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// A saved note and what happened to its vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WriteResult {
    pub note: Note,
    pub index: IndexStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteResult {
    pub removed: NoteId,
    pub index: IndexStatus,
}

/// Store and index counts for one owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    pub notes: u64,
    pub indexed_vectors: u64,
    /// Notes with no vector (degraded writes not yet repaired)
    pub unindexed_notes: u64,
    /// Vectors whose note is gone
    pub dangling_vectors: u64,
}

pub struct NoteService {
    store: Arc<dyn NoteStore>,
    indexer: NoteIndexer,
}

impl NoteService {
    pub fn new(store: Arc<dyn NoteStore>, indexer: NoteIndexer) -> Self {
        Self { store, indexer }
    }

    pub async fn create(&self, owner: &OwnerId, content: &str) -> AppResult<WriteResult> {
        let content = normalize_content(content)?;
        let note = self
            .store
            .insert(NewNote {
                owner_id: owner.clone(),
                content,
            })
            .await?;

        let index = self.indexer.on_note_written(&note).await;
        Ok(WriteResult { note, index })
    }

    /// Apply a partial update. Only a content change re-embeds the note.
    pub async fn update(&self, owner: &OwnerId, id: &NoteId, update: NoteUpdate) -> AppResult<WriteResult> {
        if update.is_empty() {
            return Err(AppError::InvalidInput(
                "Nothing to update: provide content or pinned".to_string(),
            ));
        }

        let update = NoteUpdate {
            content: update.content.as_deref().map(normalize_content).transpose()?,
            pinned: update.pinned,
        };
        let content_changed = update.content.is_some();

        let note = self
            .store
            .update(id, owner, update)
            .await?
            .ok_or_else(|| not_found(id))?;

        let index = if content_changed {
            self.indexer.on_note_written(&note).await
        } else {
            IndexStatus::Unchanged
        };
        Ok(WriteResult { note, index })
    }

    pub async fn set_pinned(&self, owner: &OwnerId, id: &NoteId, pinned: bool) -> AppResult<WriteResult> {
        self.update(
            owner,
            id,
            NoteUpdate {
                content: None,
                pinned: Some(pinned),
            },
        )
        .await
    }

    pub async fn get(&self, owner: &OwnerId, id: &NoteId) -> AppResult<Note> {
        self.store.get(id, owner).await?.ok_or_else(|| not_found(id))
    }

    pub async fn list(&self, owner: &OwnerId, page: Page) -> AppResult<NotePage> {
        self.store.list(owner, page).await
    }

    /// Delete from the store, then drop the vector.
    pub async fn delete(&self, owner: &OwnerId, id: &NoteId) -> AppResult<DeleteResult> {
        if !self.store.delete(id, owner).await? {
            return Err(not_found(id));
        }

        let index = self.indexer.on_note_deleted(id).await;
        Ok(DeleteResult {
            removed: id.clone(),
            index,
        })
    }

    pub async fn resync(&self, owner: &OwnerId) -> AppResult<ResyncReport> {
        self.indexer.resync_owner(self.store.as_ref(), owner).await
    }

    /// Re-index every owner's notes, e.g. after a rebuild emptied the index.
    pub async fn resync_all(&self) -> AppResult<ResyncReport> {
        self.indexer.resync_all(self.store.as_ref()).await
    }

    pub async fn stats(&self, owner: &OwnerId) -> AppResult<NoteStats> {
        let notes = self.store.list_all(owner).await?;
        let vector_ids = self.indexer.index().ids(&OwnerFilter::new(owner)).await?;

        let note_ids: HashSet<&NoteId> = notes.iter().map(|n| &n.id).collect();
        let vector_set: HashSet<&NoteId> = vector_ids.iter().collect();

        Ok(NoteStats {
            notes: notes.len() as u64,
            indexed_vectors: vector_ids.len() as u64,
            unindexed_notes: note_ids.difference(&vector_set).count() as u64,
            dangling_vectors: vector_set.difference(&note_ids).count() as u64,
        })
    }
}

fn not_found(id: &NoteId) -> AppError {
    AppError::NotFound(format!("note {}", id))
}
