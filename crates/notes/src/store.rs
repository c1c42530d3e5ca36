//! Document store: the source of truth for notes.

use crate::types::{NewNote, Note, NoteId, NotePage, NoteUpdate, OwnerId, Page, Pagination};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use recall_core::{AppError, AppResult};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Note persistence. Every operation is scoped to one owner; a note owned
/// by someone else behaves exactly like a missing note.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn insert(&self, note: NewNote) -> AppResult<Note>;

    async fn get(&self, id: &NoteId, owner: &OwnerId) -> AppResult<Option<Note>>;

    /// Notes among `ids` owned by `owner`. Unknown or foreign ids are
    /// silently omitted; order is unspecified.
    async fn find_by_ids(&self, ids: &[NoteId], owner: &OwnerId) -> AppResult<Vec<Note>>;

    /// One page of the owner's notes, newest first.
    async fn list(&self, owner: &OwnerId, page: Page) -> AppResult<NotePage>;

    /// Every note of the owner, oldest first.
    async fn list_all(&self, owner: &OwnerId) -> AppResult<Vec<Note>>;

    /// Apply `update` and refresh `updated_at`. `None` when no such note.
    async fn update(&self, id: &NoteId, owner: &OwnerId, update: NoteUpdate) -> AppResult<Option<Note>>;

    /// `true` when a note was removed.
    async fn delete(&self, id: &NoteId, owner: &OwnerId) -> AppResult<bool>;

    async fn count(&self, owner: &OwnerId) -> AppResult<u64>;

    /// Every owner with at least one note.
    async fn owners(&self) -> AppResult<Vec<OwnerId>>;
}

const NOTE_COLUMNS: &str = "id, owner_id, content, pinned, created_at, updated_at";

pub struct SqliteNoteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteNoteStore {
    pub fn open(db_path: &Path) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Store(format!("Failed to create store directory: {}", e)))?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Store(format!("Failed to open note store: {}", e)))?;
        tracing::debug!("Opened note store at {:?}", db_path);
        Self::init(conn)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Store(format!("Failed to open in-memory store: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                content TEXT NOT NULL,
                pinned INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_notes_owner_created ON notes(owner_id, created_at);
            "#,
        )
        .map_err(|e| AppError::Store(format!("Failed to create tables: {}", e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `op` against the connection on the blocking pool, so a caller's
    /// deadline can give up on a slow statement.
    async fn with_conn<T, F>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| AppError::Store("Note store lock poisoned".to_string()))?;
            op(&guard)
        })
        .await
        .map_err(|e| AppError::Store(format!("Note store task failed: {}", e)))?
    }
}

/// Current time at the precision the store keeps.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 so that text order matches time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    let owner: String = row.get(1)?;
    let owner_id = OwnerId::parse(&owner)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    Ok(Note {
        id: NoteId::from(row.get::<_, String>(0)?),
        owner_id,
        content: row.get(2)?,
        pinned: row.get(3)?,
        created_at: parse_timestamp(row, 4)?,
        updated_at: parse_timestamp(row, 5)?,
    })
}

fn select_one(conn: &Connection, id: &NoteId, owner: &OwnerId) -> AppResult<Option<Note>> {
    conn.query_row(
        &format!("SELECT {} FROM notes WHERE id = ?1 AND owner_id = ?2", NOTE_COLUMNS),
        params![id.as_str(), owner.as_str()],
        row_to_note,
    )
    .optional()
    .map_err(|e| AppError::Store(format!("Failed to load note {}: {}", id, e)))
}

fn select_many(conn: &Connection, sql: &str, args: Vec<String>) -> AppResult<Vec<Note>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;
    let notes = stmt
        .query_map(params_from_iter(args), row_to_note)
        .map_err(|e| AppError::Store(format!("Failed to query notes: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Store(format!("Failed to read note row: {}", e)))?;
    Ok(notes)
}

fn count_for(conn: &Connection, owner: &OwnerId) -> AppResult<u64> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM notes WHERE owner_id = ?1",
            params![owner.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| AppError::Store(format!("Failed to count notes: {}", e)))?;
    Ok(count as u64)
}

#[async_trait]
impl NoteStore for SqliteNoteStore {
    async fn insert(&self, note: NewNote) -> AppResult<Note> {
        let created = now();
        let note = Note {
            id: NoteId::generate(),
            owner_id: note.owner_id,
            content: note.content,
            pinned: false,
            created_at: created,
            updated_at: created,
        };

        self.with_conn(move |conn| {
            conn.execute(
                &format!("INSERT INTO notes ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)", NOTE_COLUMNS),
                params![
                    note.id.as_str(),
                    note.owner_id.as_str(),
                    note.content,
                    note.pinned,
                    format_timestamp(&note.created_at),
                    format_timestamp(&note.updated_at),
                ],
            )
            .map_err(|e| AppError::Store(format!("Failed to insert note: {}", e)))?;

            tracing::debug!(id = %note.id, owner = %note.owner_id, "Inserted note");
            Ok(note)
        })
        .await
    }

    async fn get(&self, id: &NoteId, owner: &OwnerId) -> AppResult<Option<Note>> {
        let (id, owner) = (id.clone(), owner.clone());
        self.with_conn(move |conn| select_one(conn, &id, &owner)).await
    }

    async fn find_by_ids(&self, ids: &[NoteId], owner: &OwnerId) -> AppResult<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {} FROM notes WHERE owner_id = ?1 AND id IN ({})",
            NOTE_COLUMNS, placeholders
        );

        let mut args = Vec::with_capacity(ids.len() + 1);
        args.push(owner.as_str().to_string());
        args.extend(ids.iter().map(|id| id.as_str().to_string()));

        self.with_conn(move |conn| select_many(conn, &sql, args)).await
    }

    async fn list(&self, owner: &OwnerId, page: Page) -> AppResult<NotePage> {
        let owner = owner.clone();
        self.with_conn(move |conn| {
            let total = count_for(conn, &owner)?;

            let sql = format!(
                "SELECT {} FROM notes WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT {} OFFSET {}",
                NOTE_COLUMNS,
                page.limit,
                page.offset()
            );
            let notes = select_many(conn, &sql, vec![owner.as_str().to_string()])?;

            Ok(NotePage {
                notes,
                pagination: Pagination::compute(total, page),
            })
        })
        .await
    }

    async fn list_all(&self, owner: &OwnerId) -> AppResult<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE owner_id = ?1 ORDER BY created_at ASC, rowid ASC",
            NOTE_COLUMNS
        );
        let args = vec![owner.as_str().to_string()];
        self.with_conn(move |conn| select_many(conn, &sql, args)).await
    }

    async fn update(&self, id: &NoteId, owner: &OwnerId, update: NoteUpdate) -> AppResult<Option<Note>> {
        let (id, owner) = (id.clone(), owner.clone());
        self.with_conn(move |conn| {
            let Some(mut note) = select_one(conn, &id, &owner)? else {
                return Ok(None);
            };

            if let Some(content) = update.content {
                note.content = content;
            }
            if let Some(pinned) = update.pinned {
                note.pinned = pinned;
            }
            note.updated_at = now().max(note.created_at);

            conn.execute(
                "UPDATE notes SET content = ?1, pinned = ?2, updated_at = ?3 WHERE id = ?4 AND owner_id = ?5",
                params![
                    note.content,
                    note.pinned,
                    format_timestamp(&note.updated_at),
                    id.as_str(),
                    owner.as_str(),
                ],
            )
            .map_err(|e| AppError::Store(format!("Failed to update note {}: {}", id, e)))?;

            tracing::debug!(id = %id, "Updated note");
            Ok(Some(note))
        })
        .await
    }

    async fn delete(&self, id: &NoteId, owner: &OwnerId) -> AppResult<bool> {
        let (id, owner) = (id.clone(), owner.clone());
        self.with_conn(move |conn| {
            let removed = conn
                .execute(
                    "DELETE FROM notes WHERE id = ?1 AND owner_id = ?2",
                    params![id.as_str(), owner.as_str()],
                )
                .map_err(|e| AppError::Store(format!("Failed to delete note {}: {}", id, e)))?;
            Ok(removed > 0)
        })
        .await
    }

    async fn count(&self, owner: &OwnerId) -> AppResult<u64> {
        let owner = owner.clone();
        self.with_conn(move |conn| count_for(conn, &owner)).await
    }

    async fn owners(&self) -> AppResult<Vec<OwnerId>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT DISTINCT owner_id FROM notes ORDER BY owner_id")
                .map_err(|e| AppError::Store(format!("Failed to prepare query: {}", e)))?;
            let raw = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(|e| AppError::Store(format!("Failed to list owners: {}", e)))?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Store(format!("Failed to read owner row: {}", e)))?;
            raw.iter().map(|owner| OwnerId::parse(owner)).collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deadline::{bounded, CallError};
    use std::time::Duration;
    use tempfile::TempDir;

    fn owner(id: &str) -> OwnerId {
        OwnerId::parse(id).unwrap()
    }

    fn new_note(owner_id: &str, content: &str) -> NewNote {
        NewNote {
            owner_id: owner(owner_id),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        let note = store.insert(new_note("u1", "Dentist Friday 3pm")).await.unwrap();

        assert!(!note.pinned);
        assert_eq!(note.created_at, note.updated_at);

        let loaded = store.get(&note.id, &owner("u1")).await.unwrap().unwrap();
        assert_eq!(loaded.content, "Dentist Friday 3pm");
        assert_eq!(loaded.id, note.id);
    }

    #[tokio::test]
    async fn test_foreign_owner_sees_nothing() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        let note = store.insert(new_note("u1", "secret")).await.unwrap();
        let u2 = owner("u2");

        assert!(store.get(&note.id, &u2).await.unwrap().is_none());
        assert!(store.find_by_ids(&[note.id.clone()], &u2).await.unwrap().is_empty());
        assert!(store
            .update(&note.id, &u2, NoteUpdate { pinned: Some(true), content: None })
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete(&note.id, &u2).await.unwrap());
        assert_eq!(store.count(&owner("u1")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_find_by_ids_omits_missing() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        let a = store.insert(new_note("u1", "a")).await.unwrap();
        let b = store.insert(new_note("u1", "b")).await.unwrap();

        let ids = vec![a.id.clone(), NoteId::from("gone"), b.id.clone()];
        let mut found: Vec<NoteId> = store
            .find_by_ids(&ids, &owner("u1"))
            .await
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        found.sort();

        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(found, expected);
        assert!(store.find_by_ids(&[], &owner("u1")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_paginates_newest_first() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.insert(new_note("u1", &format!("note {}", i))).await.unwrap();
        }
        store.insert(new_note("u2", "other")).await.unwrap();

        let first = store.list(&owner("u1"), Page::new(1, 2)).await.unwrap();
        assert_eq!(first.pagination.total, 5);
        assert_eq!(first.pagination.total_pages, 3);
        assert!(first.pagination.has_more);
        assert_eq!(first.notes[0].content, "note 4");
        assert_eq!(first.notes[1].content, "note 3");

        let last = store.list(&owner("u1"), Page::new(3, 2)).await.unwrap();
        assert_eq!(last.notes.len(), 1);
        assert_eq!(last.notes[0].content, "note 0");
        assert!(!last.pagination.has_more);

        let all = store.list_all(&owner("u1")).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].content, "note 0");
    }

    #[tokio::test]
    async fn test_update_refreshes_timestamp() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        let note = store.insert(new_note("u1", "draft")).await.unwrap();

        let updated = store
            .update(
                &note.id,
                &owner("u1"),
                NoteUpdate {
                    content: Some("final".to_string()),
                    pinned: Some(true),
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.content, "final");
        assert!(updated.pinned);
        assert_eq!(updated.created_at, note.created_at);
        assert!(updated.updated_at >= note.updated_at);

        let reloaded = store.get(&note.id, &owner("u1")).await.unwrap().unwrap();
        assert_eq!(reloaded, updated);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        let note = store.insert(new_note("u1", "temp")).await.unwrap();

        assert!(store.delete(&note.id, &owner("u1")).await.unwrap());
        assert!(!store.delete(&note.id, &owner("u1")).await.unwrap());
        assert!(store.get(&note.id, &owner("u1")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".recall/notes.sqlite");

        let id = {
            let store = SqliteNoteStore::open(&path).unwrap();
            store.insert(new_note("u1", "kept")).await.unwrap().id
        };

        let store = SqliteNoteStore::open(&path).unwrap();
        let note = store.get(&id, &owner("u1")).await.unwrap().unwrap();
        assert_eq!(note.content, "kept");
    }

    #[tokio::test]
    async fn test_owners_lists_each_once() {
        let store = SqliteNoteStore::open_in_memory().unwrap();
        assert!(store.owners().await.unwrap().is_empty());

        store.insert(new_note("u2", "a")).await.unwrap();
        store.insert(new_note("u1", "b")).await.unwrap();
        store.insert(new_note("u2", "c")).await.unwrap();

        assert_eq!(store.owners().await.unwrap(), vec![owner("u1"), owner("u2")]);
    }

    #[tokio::test]
    async fn test_busy_connection_does_not_block_deadline() {
        let store = SqliteNoteStore::open_in_memory().unwrap();

        let held = store.conn.lock().unwrap();
        let err = bounded(Duration::from_millis(50), store.count(&owner("u1")))
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::TimedOut(_)));
        drop(held);

        assert_eq!(store.count(&owner("u1")).await.unwrap(), 0);
    }
}
