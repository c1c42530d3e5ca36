//! Note records and the identifiers that scope them.

use chrono::{DateTime, Utc};
use recall_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an authenticated user. Every note, vector and query is
/// scoped to exactly one owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Parse an owner id, rejecting blank input.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::Unauthenticated(
                "owner id must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque note identifier, assigned by the store on creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    /// Fresh random id for a new note.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A user-owned text memo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub owner_id: OwnerId,
    pub content: String,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a note. Content is expected to be normalized
/// already (see [`normalize_content`]).
#[derive(Debug, Clone)]
pub struct NewNote {
    pub owner_id: OwnerId,
    pub content: String,
}

/// Partial update of a note's mutable fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteUpdate {
    pub content: Option<String>,
    pub pinned: Option<bool>,
}

impl NoteUpdate {
    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.pinned.is_none()
    }
}

/// Default page size for listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// A 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Clamp page and limit to at least 1.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

/// Paging metadata returned with a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn compute(total: u64, page: Page) -> Self {
        let limit = u64::from(page.limit);
        let total_pages = total.div_ceil(limit);
        Self {
            total,
            page: page.page,
            limit: page.limit,
            total_pages,
            has_more: u64::from(page.page) < total_pages,
        }
    }
}

/// One page of notes, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePage {
    pub notes: Vec<Note>,
    pub pagination: Pagination,
}

/// Trim note content and reject it when nothing is left.
pub fn normalize_content(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "Note content is required".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
