//! Joining vector matches with hydrated notes.

use crate::rag::types::EnrichedResult;
use crate::types::{Note, NoteId, OwnerId};
use crate::vector_index::VectorMatch;
use recall_prompt::PromptExcerpt;
use std::collections::HashMap;

/// Attach scores to hydrated notes and order them best first.
///
/// - Notes not owned by `owner` are dropped, whatever the store returned.
/// - A note with no matching vector hit scores 0.
/// - Equal scores keep the order the index returned them in.
///
/// Matches without a note (dangling vectors) simply produce nothing.
pub fn merge_and_rank(matches: &[VectorMatch], notes: Vec<Note>, owner: &OwnerId) -> Vec<EnrichedResult> {
    let mut hits: HashMap<&NoteId, (usize, f32)> = HashMap::with_capacity(matches.len());
    for (rank, m) in matches.iter().enumerate() {
        hits.entry(&m.id).or_insert((rank, m.score.unwrap_or(0.0)));
    }

    let mut ranked: Vec<(usize, EnrichedResult)> = Vec::with_capacity(notes.len());
    for note in notes {
        if &note.owner_id != owner {
            tracing::warn!(
                id = %note.id,
                "Dropping note hydrated for another owner"
            );
            continue;
        }
        if ranked.iter().any(|(_, r)| r.note.id == note.id) {
            continue;
        }

        let (rank, score) = hits.get(&note.id).copied().unwrap_or((usize::MAX, 0.0));
        ranked.push((rank, EnrichedResult { note, score }));
    }

    ranked.sort_by(|(rank_a, a), (rank_b, b)| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(rank_a.cmp(rank_b))
    });

    ranked.into_iter().map(|(_, result)| result).collect()
}

/// Prompt excerpts in ranked order.
pub fn excerpts(results: &[EnrichedResult]) -> Vec<PromptExcerpt> {
    results
        .iter()
        .map(|r| PromptExcerpt {
            content: r.note.content.clone(),
            score: r.score,
        })
        .collect()
}
