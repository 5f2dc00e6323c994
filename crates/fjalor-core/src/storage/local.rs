//! Local entry persistence
//!
//! Stores the whole collection as one versioned JSON blob
//! (`digital_dictionary_v1.json` in the data directory). Writes are atomic
//! (write to temp file, then rename) so a crash never leaves a torn blob.
//!
//! This component never fails observably: a missing, corrupt or
//! structurally wrong blob loads as an empty collection, and write failures
//! are logged and dropped.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use crate::models::{DataSchema, Entry, SCHEMA_VERSION};

/// Persistence for the versioned entry blob
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    /// Create a store persisting to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the blob
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a blob exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the persisted schema, degrading to an empty one on any problem
    pub fn load(&self) -> DataSchema {
        match self.try_load() {
            Ok(Some(schema)) => {
                debug!(
                    "Loaded {} entries from {:?}",
                    schema.entries.len(),
                    self.path
                );
                schema
            }
            Ok(None) => DataSchema::empty(),
            Err(e) => {
                warn!("Ignoring stored entries: {}", e);
                if let Some(hint) = e.recovery_suggestion() {
                    warn!("{}", hint);
                }
                DataSchema::empty()
            }
        }
    }

    /// Save the schema, logging (not returning) any failure
    pub fn save(&self, schema: &DataSchema) {
        if let Err(e) = self.try_save(schema) {
            warn!("Failed to persist entries: {}", e);
            if let Some(hint) = e.recovery_suggestion() {
                warn!("{}", hint);
            }
        }
    }

    /// Load with errors reported; `None` when nothing is stored yet
    pub fn try_load(&self) -> StorageResult<Option<DataSchema>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)
            .map_err(|e| StorageError::from_read(e, self.path.clone()))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }

        decode(&raw)
            .map(Some)
            .map_err(|details| StorageError::InvalidFormat {
                path: self.path.clone(),
                details,
            })
    }

    /// Save with errors reported
    pub fn try_save(&self, schema: &DataSchema) -> StorageResult<()> {
        let bytes = serde_json::to_vec(schema)?;
        atomic_write(&self.path, &bytes)
    }
}

/// Validate and decode a stored blob
///
/// Requires an object with a numeric `version` and an array `entries`.
/// Records that do not parse as entries are dropped one by one so a single
/// bad record never costs the rest. Older versions are migrated.
pub fn decode(raw: &str) -> Result<DataSchema, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;

    let mut version = value
        .get("version")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| "missing or non-numeric `version`".to_string())? as u32;

    let mut entries = value
        .get("entries")
        .filter(|e| e.is_array())
        .cloned()
        .ok_or_else(|| "missing `entries` array".to_string())?;

    while version < SCHEMA_VERSION {
        (version, entries) = migrate(version, entries);
    }

    let records = match entries {
        Value::Array(records) => records,
        _ => Vec::new(),
    };
    let entries = records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match serde_json::from_value::<Entry>(record) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Dropping stored record {}: {}", idx, e);
                None
            }
        })
        .collect();

    Ok(DataSchema { version, entries })
}

/// Bring an older schema up to date
///
/// No earlier layout is known, so every older version collapses to the
/// current version with no entries.
fn migrate(version: u32, _entries: Value) -> (u32, Value) {
    warn!(
        "Discarding entries stored with unsupported schema version {}",
        version
    );
    (SCHEMA_VERSION, Value::Array(Vec::new()))
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryDraft;
    use tempfile::TempDir;

    fn store(temp_dir: &TempDir) -> LocalStore {
        LocalStore::new(temp_dir.path().join("digital_dictionary_v1.json"))
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        assert!(!store.exists());
        let schema = store.load();
        assert_eq!(schema.version, SCHEMA_VERSION);
        assert!(schema.entries.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);

        let entry = Entry::new(EntryDraft::new("mace", "animal", "Macja po fle."));
        store.save(&DataSchema::new(vec![entry.clone()]));
        assert!(store.exists());

        let loaded = store.load();
        assert_eq!(loaded.entries, vec![entry]);
        // Temp file is renamed away
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(temp_dir.path().join("a").join("b").join("blob.json"));

        store.try_save(&DataSchema::empty()).unwrap();
        assert!(store.exists());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        fs::write(store.path(), "{not json").unwrap();

        assert!(store.load().entries.is_empty());
        assert!(matches!(
            store.try_load(),
            Err(StorageError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_structural_mismatch_loads_empty() {
        for raw in [
            r#"[]"#,
            r#"null"#,
            r#"{"entries": []}"#,
            r#"{"version": "1", "entries": []}"#,
            r#"{"version": 1}"#,
            r#"{"version": 1, "entries": {}}"#,
        ] {
            assert!(decode(raw).is_err(), "expected rejection of {}", raw);
        }
    }

    #[test]
    fn test_old_version_collapses_to_empty() {
        let raw = r#"{"version": 0, "entries": [
            {"id":"a","word":"mace","definition":"animal","createdAt":1,"updatedAt":1}
        ]}"#;
        let schema = decode(raw).unwrap();
        assert_eq!(schema.version, SCHEMA_VERSION);
        assert!(schema.entries.is_empty());
    }

    #[test]
    fn test_records_missing_optional_fields() {
        let raw = r#"{"version": 1, "entries": [
            {"id":"a","word":"mace","definition":"animal","createdAt":1,"updatedAt":2}
        ]}"#;
        let schema = decode(raw).unwrap();
        assert_eq!(schema.entries.len(), 1);
        assert_eq!(schema.entries[0].illustration, "");
        assert!(schema.entries[0].recording.is_none());
    }

    #[test]
    fn test_bad_record_is_dropped_alone() {
        let raw = r#"{"version": 1, "entries": [
            {"id":"a","word":"mace","definition":"animal","illustration":"Macja fle.","createdAt":1,"updatedAt":2},
            {"id":"b","word":3},
            {"id":"c","word":"qen","definition":"dog"}
        ]}"#;
        let schema = decode(raw).unwrap();

        let words: Vec<_> = schema.entries.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["mace", "qen"]);
        assert_eq!(schema.entries[1].created_at, 0);
        assert_eq!(schema.entries[1].updated_at, 0);
    }

    #[test]
    fn test_load_keeps_good_records() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        fs::write(
            store.path(),
            r#"{"version": 1, "entries": [
                {"id":"a","word":"mace","definition":"animal","createdAt":1,"updatedAt":1},
                {"id":"b","word":"qen","definition":null}
            ]}"#,
        )
        .unwrap();

        let schema = store.load();
        assert_eq!(schema.entries.len(), 1);
        assert_eq!(schema.entries[0].word, "mace");
    }

    #[test]
    fn test_empty_file_loads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = store(&temp_dir);
        fs::write(store.path(), "  \n").unwrap();

        assert!(store.try_load().unwrap().is_none());
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        let temp_dir = TempDir::new().unwrap();
        // A directory where the blob should be makes the rename fail
        let path = temp_dir.path().join("blob.json");
        fs::create_dir_all(path.join("occupied")).unwrap();
        let store = LocalStore::new(&path);

        store.save(&DataSchema::empty());
        assert!(store.try_save(&DataSchema::empty()).is_err());
    }
}
