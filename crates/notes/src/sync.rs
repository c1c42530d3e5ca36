//! Keeps the vector index in step with the note store.
//!
//! The store is the source of truth. Index maintenance runs after the store
//! write has succeeded and never fails the caller: problems come back as
//! [`IndexStatus::Degraded`] so the caller can report them.

use crate::deadline::bounded;
use crate::embeddings::EmbeddingProvider;
use crate::store::NoteStore;
use crate::types::{Note, NoteId, OwnerId};
use crate::vector_index::{OwnerFilter, VectorIndex, VectorMetadata, VectorRecord};
use recall_core::AppResult;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Outcome of index maintenance after a store write.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum IndexStatus {
    /// The index reflects the note.
    Indexed,
    /// Nothing to do (e.g. a pin-only edit).
    Unchanged,
    /// The store write stands but the index could not be updated. The note
    /// stays readable directly and is missing from answers until re-indexed.
    Degraded { reason: String },
}

impl IndexStatus {
    pub fn is_degraded(&self) -> bool {
        matches!(self, IndexStatus::Degraded { .. })
    }
}

/// Counts from [`NoteIndexer::resync_owner`] and [`NoteIndexer::resync_all`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResyncReport {
    /// Owners processed
    pub owners: usize,
    /// Notes found in the store
    pub notes: usize,
    /// Notes embedded and upserted
    pub indexed: usize,
    /// Notes whose embed or upsert failed
    pub degraded: usize,
    /// Vectors removed because their note no longer exists
    pub pruned: usize,
}

pub struct NoteIndexer {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    call_timeout: Duration,
}

impl NoteIndexer {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            embedder,
            index,
            call_timeout,
        }
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Re-embed `note` and upsert its vector.
    #[instrument(skip(self, note), fields(id = %note.id, owner = %note.owner_id))]
    pub async fn on_note_written(&self, note: &Note) -> IndexStatus {
        match self.index_note(note).await {
            Ok(()) => {
                debug!("Indexed note");
                IndexStatus::Indexed
            }
            Err(reason) => {
                warn!(%reason, "Note saved but not indexed");
                // A vector for the previous content must not keep matching.
                if let Err(e) = bounded(self.call_timeout, self.index.delete(&note.id)).await {
                    warn!(error = %e, "Stale vector could not be removed");
                }
                IndexStatus::Degraded { reason }
            }
        }
    }

    async fn index_note(&self, note: &Note) -> Result<(), String> {
        if note.content.trim().is_empty() {
            return Err("note has no content to embed".to_string());
        }

        let values = bounded(self.call_timeout, self.embedder.embed(&note.content))
            .await
            .map_err(|e| format!("embedding failed: {}", e))?;

        let record = VectorRecord {
            id: note.id.clone(),
            values,
            metadata: VectorMetadata {
                owner_id: note.owner_id.clone(),
            },
        };

        bounded(self.call_timeout, self.index.upsert(record))
            .await
            .map_err(|e| format!("index upsert failed: {}", e))
    }

    /// Remove the vector of a note already deleted from the store. A
    /// failure leaves a dangling vector, which queries tolerate.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn on_note_deleted(&self, id: &NoteId) -> IndexStatus {
        match bounded(self.call_timeout, self.index.delete(id)).await {
            Ok(()) => {
                debug!("Removed vector");
                IndexStatus::Indexed
            }
            Err(e) => {
                let reason = format!("index delete failed: {}", e);
                warn!(%reason, "Note deleted but its vector remains");
                IndexStatus::Degraded { reason }
            }
        }
    }

    /// Rebuild one owner's slice of the index from the store.
    ///
    /// Every note is re-embedded and upserted, and vectors whose note is
    /// gone are deleted. Safe to run repeatedly.
    #[instrument(skip(self, store), fields(owner = %owner))]
    pub async fn resync_owner(&self, store: &dyn NoteStore, owner: &OwnerId) -> AppResult<ResyncReport> {
        let notes = store.list_all(owner).await?;
        let mut report = ResyncReport {
            owners: 1,
            notes: notes.len(),
            ..Default::default()
        };

        for note in &notes {
            match self.on_note_written(note).await {
                IndexStatus::Degraded { .. } => report.degraded += 1,
                _ => report.indexed += 1,
            }
        }

        let live: HashSet<&NoteId> = notes.iter().map(|n| &n.id).collect();
        let indexed = self.index.ids(&OwnerFilter::new(owner)).await?;
        for id in indexed.iter().filter(|id| !live.contains(id)) {
            if !self.on_note_deleted(id).await.is_degraded() {
                report.pruned += 1;
            }
        }

        info!(
            notes = report.notes,
            indexed = report.indexed,
            degraded = report.degraded,
            pruned = report.pruned,
            "Resync complete"
        );
        Ok(report)
    }

    /// Resync every owner the store knows about. Used after the index was
    /// wiped, where resyncing only the caller would leave everyone else out.
    #[instrument(skip(self, store))]
    pub async fn resync_all(&self, store: &dyn NoteStore) -> AppResult<ResyncReport> {
        let mut total = ResyncReport::default();
        for owner in store.owners().await? {
            let report = self.resync_owner(store, &owner).await?;
            total.owners += report.owners;
            total.notes += report.notes;
            total.indexed += report.indexed;
            total.degraded += report.degraded;
            total.pruned += report.pruned;
        }

        info!(owners = total.owners, notes = total.notes, "Resynced all owners");
        Ok(total)
    }
}
