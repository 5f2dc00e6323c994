//! SQLite storage for the entries API
//!
//! One table; uniqueness of words is enforced by a `UNIQUE` column holding
//! the normalized word, so two concurrent inserts of the same word cannot
//! both succeed.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use fjalor_core::models::{normalize_word, now_millis};
use fjalor_core::{Entry, EntryId};

/// Errors from the entries database
#[derive(Error, Debug)]
pub enum DbError {
    /// The normalized word is already taken by another row
    #[error("Word already exists")]
    Duplicate,

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Validated fields of a create or update request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryFields {
    pub word: String,
    pub definition: String,
    pub illustration: String,
    pub recording: Option<String>,
}

/// Entries table behind a mutex
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> DbResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> DbResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    /// All entries ordered by word
    pub fn list(&self) -> DbResult<Vec<Entry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, word, definition, illustration, recording, created_at, updated_at
             FROM dictionary_entries
             ORDER BY word ASC",
        )?;
        let entries = stmt
            .query_map([], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Insert a new row with a fresh id and timestamps
    pub fn insert(&self, fields: &EntryFields) -> DbResult<Entry> {
        let conn = self.lock()?;
        let id = EntryId::generate();
        let now = now_millis();

        conn.execute(
            "INSERT INTO dictionary_entries
                 (id, word, word_key, definition, illustration, recording, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                id.as_str(),
                fields.word,
                normalize_word(&fields.word),
                fields.definition,
                fields.illustration,
                fields.recording,
                now
            ],
        )
        .map_err(unique_violation)?;

        Ok(Entry {
            id,
            word: fields.word.clone(),
            definition: fields.definition.clone(),
            illustration: fields.illustration.clone(),
            recording: fields.recording.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the fields of a row; `None` if the id is unknown
    pub fn update(&self, id: &str, fields: &EntryFields) -> DbResult<Option<Entry>> {
        let conn = self.lock()?;
        let now = now_millis();

        let created_at: Option<i64> = conn
            .query_row(
                "UPDATE dictionary_entries
                 SET word = ?2, word_key = ?3, definition = ?4, illustration = ?5,
                     recording = ?6, updated_at = ?7
                 WHERE id = ?1
                 RETURNING created_at",
                params![
                    id,
                    fields.word,
                    normalize_word(&fields.word),
                    fields.definition,
                    fields.illustration,
                    fields.recording,
                    now
                ],
                |row| row.get(0),
            )
            .optional()
            .map_err(unique_violation)?;

        Ok(created_at.map(|created_at| Entry {
            id: EntryId::from(id),
            word: fields.word.clone(),
            definition: fields.definition.clone(),
            illustration: fields.illustration.clone(),
            recording: fields.recording.clone(),
            created_at,
            updated_at: now,
        }))
    }

    /// Delete a row; false if the id is unknown
    pub fn delete(&self, id: &str) -> DbResult<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM dictionary_entries WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub fn count(&self) -> DbResult<usize> {
        let conn = self.lock()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM dictionary_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Initialize the database schema
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS dictionary_entries (
            id TEXT PRIMARY KEY,
            word TEXT NOT NULL,
            -- trimmed, lowercased word
            word_key TEXT NOT NULL UNIQUE,
            definition TEXT NOT NULL,
            illustration TEXT NOT NULL DEFAULT '',
            recording TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_entries_word ON dictionary_entries(word);
        "#,
    )
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<Entry> {
    Ok(Entry {
        id: EntryId::from(row.get::<_, String>(0)?),
        word: row.get(1)?,
        definition: row.get(2)?,
        illustration: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        recording: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Map a UNIQUE constraint failure to `DbError::Duplicate`
fn unique_violation(err: rusqlite::Error) -> DbError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            DbError::Duplicate
        }
        _ => DbError::Sqlite(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(word: &str) -> EntryFields {
        EntryFields {
            word: word.to_string(),
            definition: "definition".to_string(),
            illustration: "illustration".to_string(),
            recording: None,
        }
    }

    #[test]
    fn test_insert_and_list_ordered() {
        let db = Database::open_in_memory().unwrap();
        db.insert(&fields("qen")).unwrap();
        db.insert(&fields("mace")).unwrap();

        let words: Vec<_> = db.list().unwrap().into_iter().map(|e| e.word).collect();
        assert_eq!(words, vec!["mace", "qen"]);
    }

    #[test]
    fn test_insert_duplicate_word_case_insensitive() {
        let db = Database::open_in_memory().unwrap();
        db.insert(&fields("Mace")).unwrap();

        assert!(matches!(db.insert(&fields("mace")), Err(DbError::Duplicate)));
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn test_update_keeps_created_at() {
        let db = Database::open_in_memory().unwrap();
        let entry = db.insert(&fields("mace")).unwrap();

        let mut changed = fields("Mace");
        changed.recording = Some("data:audio/webm;base64,AAAA".to_string());
        let updated = db.update(entry.id.as_str(), &changed).unwrap().unwrap();

        assert_eq!(updated.created_at, entry.created_at);
        assert!(updated.updated_at >= entry.updated_at);
        assert_eq!(db.list().unwrap()[0].recording, changed.recording);
    }

    #[test]
    fn test_update_unknown_and_collision() {
        let db = Database::open_in_memory().unwrap();
        db.insert(&fields("mace")).unwrap();
        let qen = db.insert(&fields("qen")).unwrap();

        assert!(db.update("missing", &fields("lule")).unwrap().is_none());
        assert!(matches!(
            db.update(qen.id.as_str(), &fields("MACE")),
            Err(DbError::Duplicate)
        ));
    }

    #[test]
    fn test_delete() {
        let db = Database::open_in_memory().unwrap();
        let entry = db.insert(&fields("mace")).unwrap();

        assert!(db.delete(entry.id.as_str()).unwrap());
        assert!(!db.delete(entry.id.as_str()).unwrap());
        assert_eq!(db.count().unwrap(), 0);
    }
}
