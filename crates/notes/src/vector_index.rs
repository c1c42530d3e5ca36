//! Vector index abstraction.
//!
//! The index holds one `(id, vector, {ownerId})` record per searchable
//! note. Every query must carry an [`OwnerFilter`]; there is no way to
//! express an unscoped search through this trait.

use crate::types::{NoteId, OwnerId};
use async_trait::async_trait;
use recall_core::AppResult;
use serde::{Deserialize, Serialize};

/// Metadata stored alongside each vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VectorMetadata {
    pub owner_id: OwnerId,
}

/// A vector keyed by the note it was computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    pub id: NoteId,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// Restricts a query to one owner's vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerFilter {
    pub owner_id: OwnerId,
}

impl OwnerFilter {
    pub fn new(owner_id: &OwnerId) -> Self {
        Self {
            owner_id: owner_id.clone(),
        }
    }

    pub fn matches(&self, metadata: &VectorMetadata) -> bool {
        metadata.owner_id == self.owner_id
    }
}

/// Similarity search request.
#[derive(Debug, Clone)]
pub struct VectorQuery {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub filter: OwnerFilter,
    pub include_metadata: bool,
    pub include_values: bool,
}

impl VectorQuery {
    /// Query returning metadata but not stored values.
    pub fn new(vector: Vec<f32>, top_k: usize, filter: OwnerFilter) -> Self {
        Self {
            vector,
            top_k,
            filter,
            include_metadata: true,
            include_values: false,
        }
    }
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
    pub id: NoteId,
    /// Similarity, when the backend reports one
    pub score: Option<f32>,
    pub metadata: Option<VectorMetadata>,
    pub values: Option<Vec<f32>>,
}

/// Trait for vector index backends.
///
/// - `upsert` replaces any prior record with the same id.
/// - `delete` of an unknown id succeeds.
/// - `query` returns at most `top_k` matches, best first, only for the
///   filtered owner; no candidates is an empty list.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(&self, record: VectorRecord) -> AppResult<()>;

    async fn delete(&self, id: &NoteId) -> AppResult<()>;

    async fn query(&self, query: &VectorQuery) -> AppResult<Vec<VectorMatch>>;

    /// Ids of every vector stored for the filtered owner.
    async fn ids(&self, filter: &OwnerFilter) -> AppResult<Vec<NoteId>>;

    async fn count(&self, filter: &OwnerFilter) -> AppResult<u64> {
        Ok(self.ids(filter).await?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_filter_matches() {
        let u1 = OwnerId::parse("u1").unwrap();
        let u2 = OwnerId::parse("u2").unwrap();
        let filter = OwnerFilter::new(&u1);

        assert!(filter.matches(&VectorMetadata { owner_id: u1 }));
        assert!(!filter.matches(&VectorMetadata { owner_id: u2 }));
    }

    #[test]
    fn test_query_defaults() {
        let owner = OwnerId::parse("u1").unwrap();
        let query = VectorQuery::new(vec![0.1, 0.2], 5, OwnerFilter::new(&owner));
        assert!(query.include_metadata);
        assert!(!query.include_values);
        assert_eq!(query.top_k, 5);
    }

    #[test]
    fn test_metadata_json_shape() {
        let metadata = VectorMetadata {
            owner_id: OwnerId::parse("u1").unwrap(),
        };
        assert_eq!(
            serde_json::to_string(&metadata).unwrap(),
            r#"{"ownerId":"u1"}"#
        );
    }
}
