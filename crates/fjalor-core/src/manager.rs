//! Entry manager
//!
//! The `EntryManager` owns the in-memory entry collection and is the only
//! thing that mutates it. Every mutation runs the same pipeline:
//!
//! 1. Validate and normalize the input against the current collection
//! 2. Hand the record to the selected `EntryStore`
//! 3. Absorb the returned record into memory
//! 4. Persist a snapshot through the `LocalStore`
//!
//! A failure at any step stops the pipeline, so the collection and the blob
//! only ever change together.
//!
//! ## Usage
//!
//! ```ignore
//! let mut manager = EntryManager::open(&config)?;
//! manager.add(EntryDraft::new("mace", "animal", "Macja po fle.")).await?;
//! for entry in manager.visible_entries() {
//!     println!("{}", entry.word);
//! }
//! ```

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, info};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::{CloudConfig, Config};
use crate::error::{EntryError, EntryResult};
use crate::models::{
    normalize_word, now_millis, DataSchema, Entry, EntryDraft, EntryId, ImportItem,
    ImportStrategy, ImportSummary, SortOrder,
};
use crate::storage::LocalStore;
use crate::store::{store_for, EntryStore, StoreMode};

/// State of the link to the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// No cloud configuration; local-only mode
    Disabled,
    /// A pull from the server is in flight
    Syncing,
    /// Cloud mode, last operation succeeded
    Ready,
    /// Last sync failed
    Error(String),
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Disabled => write!(f, "disabled"),
            SyncStatus::Syncing => write!(f, "syncing"),
            SyncStatus::Ready => write!(f, "ready"),
            SyncStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Owner of the entry collection
pub struct EntryManager {
    entries: Vec<Entry>,
    /// Normalized word -> entry id
    index: HashMap<String, EntryId>,
    selected: Option<EntryId>,
    sort_order: SortOrder,
    search: String,
    sync_status: SyncStatus,
    store: Box<dyn EntryStore>,
    local: LocalStore,
}

impl EntryManager {
    /// Open the manager for a configuration
    ///
    /// Loads the local blob and selects the remote store when a cloud
    /// configuration is present.
    pub fn open(config: &Config) -> EntryResult<Self> {
        let local = LocalStore::new(config.entries_path());
        let store = store_for(config.cloud().as_ref())?;
        Ok(Self::with_store(local, store))
    }

    /// Build a manager from explicit collaborators
    pub fn with_store(local: LocalStore, store: Box<dyn EntryStore>) -> Self {
        let schema = local.load();
        let sync_status = initial_status(store.as_ref());
        let mut manager = Self {
            entries: schema.entries,
            index: HashMap::new(),
            selected: None,
            sort_order: SortOrder::default(),
            search: String::new(),
            sync_status,
            store,
            local,
        };
        manager.rebuild_index();
        debug!(
            "Entry manager ready: {} entries, {} mode",
            manager.entries.len(),
            manager.store.mode()
        );
        manager
    }

    /// Re-select the store after the cloud settings changed
    pub fn reconfigure(&mut self, cloud: Option<&CloudConfig>) -> EntryResult<()> {
        self.store = store_for(cloud)?;
        self.sync_status = initial_status(self.store.as_ref());
        info!("Switched to {} mode", self.store.mode());
        Ok(())
    }

    // ==================== Mutations ====================

    /// Add a new entry and select it
    pub async fn add(&mut self, draft: EntryDraft) -> EntryResult<Entry> {
        let draft = draft.trimmed();
        let key = normalize_word(&draft.word);
        if key.is_empty() {
            return Err(EntryError::Validation("Word cannot be empty.".to_string()));
        }
        if self.index.contains_key(&key) {
            return Err(EntryError::Duplicate { word: draft.word });
        }

        let entry = self.store.create(&draft).await?;
        self.absorb(entry.clone());
        self.selected = Some(entry.id.clone());
        self.persist();

        info!("Added '{}' ({})", entry.word, entry.id.short());
        Ok(entry)
    }

    /// Replace the mutable fields of an existing entry
    pub async fn update(&mut self, id: &EntryId, draft: EntryDraft) -> EntryResult<Entry> {
        let existing = self
            .get(id)
            .cloned()
            .ok_or_else(|| EntryError::NotFound { id: id.clone() })?;

        let draft = draft.trimmed();
        let key = normalize_word(&draft.word);
        if key.is_empty() {
            return Err(EntryError::Validation("Word cannot be empty.".to_string()));
        }
        if let Some(owner) = self.index.get(&key) {
            if owner != id {
                return Err(EntryError::Duplicate { word: draft.word });
            }
        }

        let updated = self.store.update(&existing, &draft).await?;
        if let Some(slot) = self.entries.iter_mut().find(|e| &e.id == id) {
            *slot = updated.clone();
        }
        self.rebuild_index();
        self.persist();

        info!("Updated '{}' ({})", updated.word, updated.id.short());
        Ok(updated)
    }

    /// Delete an entry
    ///
    /// In cloud mode the server delete must succeed before anything changes
    /// locally.
    pub async fn remove(&mut self, id: &EntryId) -> EntryResult<()> {
        self.store.delete(id).await?;

        let before = self.entries.len();
        self.entries.retain(|e| &e.id != id);
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        if self.entries.len() == before {
            debug!("Remove of unknown entry {} ignored", id);
            return Ok(());
        }

        self.rebuild_index();
        self.persist();
        info!("Removed {}", id.short());
        Ok(())
    }

    /// Merge a batch of imported records into the collection
    ///
    /// Items are processed in order against the running collection, so
    /// duplicates within the batch are resolved with the same strategy.
    pub fn import_batch(&mut self, items: Vec<ImportItem>, strategy: ImportStrategy) -> ImportSummary {
        let mut summary = ImportSummary::default();
        let mut taken_ids: HashSet<EntryId> = self.entries.iter().map(|e| e.id.clone()).collect();

        for item in items {
            let word = item.word.trim().to_string();
            let key = normalize_word(&word);
            if key.is_empty() {
                summary.skipped += 1;
                continue;
            }

            match self.index.get(&key).cloned() {
                Some(existing_id) => match strategy {
                    ImportStrategy::Skip => summary.skipped += 1,
                    ImportStrategy::Overwrite => {
                        if let Some(existing) = self.entries.iter_mut().find(|e| e.id == existing_id) {
                            overwrite(existing, &item, word);
                            summary.overwritten += 1;
                        }
                    }
                    ImportStrategy::KeepBoth => {
                        let unique = self.suffixed_word(&word);
                        let entry = Entry::new(EntryDraft {
                            word: unique,
                            definition: item.definition.clone(),
                            illustration: item.illustration().unwrap_or_default().to_string(),
                            recording: item.recording.clone().flatten(),
                        });
                        taken_ids.insert(entry.id.clone());
                        self.absorb(entry);
                        summary.added += 1;
                    }
                },
                None => {
                    let entry = verbatim(&item, word, &taken_ids);
                    taken_ids.insert(entry.id.clone());
                    self.absorb(entry);
                    summary.added += 1;
                }
            }
        }

        self.persist();
        info!("Import ({}): {}", strategy, summary);
        summary
    }

    /// Pull the full collection from the server, replacing local entries
    ///
    /// Returns the number of entries received. On failure the collection is
    /// left as it was.
    pub async fn sync_from_cloud(&mut self) -> EntryResult<usize> {
        if !self.store.is_remote() {
            self.sync_status = SyncStatus::Disabled;
            return Err(EntryError::NotConfigured);
        }

        self.sync_status = SyncStatus::Syncing;
        match self.store.fetch_all().await {
            Ok(entries) => {
                let count = entries.len();
                self.entries = entries;
                self.rebuild_index();
                if let Some(selected) = self.selected.clone() {
                    if self.get(&selected).is_none() {
                        self.selected = None;
                    }
                }
                self.persist();
                self.sync_status = SyncStatus::Ready;
                info!("Pulled {} entries from cloud", count);
                Ok(count)
            }
            Err(e) => {
                self.sync_status = SyncStatus::Error(e.to_string());
                Err(e)
            }
        }
    }

    // ==================== Export ====================

    /// Snapshot of the whole collection in the persisted schema
    pub fn export_snapshot(&self) -> DataSchema {
        DataSchema::new(self.entries.clone())
    }

    /// Snapshot rendered as pretty-printed JSON
    pub fn export_json(&self) -> String {
        // Serializing plain strings and integers cannot fail
        serde_json::to_string_pretty(&self.export_snapshot()).unwrap_or_default()
    }

    // ==================== Queries ====================

    /// All entries in storage order
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &EntryId) -> Option<&Entry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    /// Find an entry by word (case-insensitive, trimmed)
    pub fn find_by_word(&self, word: &str) -> Option<&Entry> {
        self.index
            .get(&normalize_word(word))
            .and_then(|id| self.get(id))
    }

    /// Entries matching the search filter, in the current sort order
    ///
    /// A blank filter shows everything. Otherwise the query is matched as
    /// typed (lowercased, not trimmed) against each word.
    pub fn visible_entries(&self) -> Vec<&Entry> {
        let active = !self.search.trim().is_empty();
        let query = self.search.to_lowercase();
        let mut visible: Vec<&Entry> = self
            .entries
            .iter()
            .filter(|e| !active || e.word.to_lowercase().contains(&query))
            .collect();

        match self.sort_order {
            SortOrder::Alphabetical => visible.sort_by(|a, b| compare_words(&a.word, &b.word)),
            SortOrder::Newest => visible.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }
        visible
    }

    // ==================== View state ====================

    /// Select an entry; unknown ids clear the selection
    pub fn select(&mut self, id: Option<&EntryId>) {
        self.selected = id.filter(|id| self.get(id).is_some()).cloned();
    }

    pub fn selected_id(&self) -> Option<&EntryId> {
        self.selected.as_ref()
    }

    pub fn selected_entry(&self) -> Option<&Entry> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.sort_order = order;
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
    }

    pub fn sync_status(&self) -> &SyncStatus {
        &self.sync_status
    }

    pub fn mode(&self) -> StoreMode {
        self.store.mode()
    }

    pub fn is_cloud(&self) -> bool {
        self.store.is_remote()
    }

    pub fn local_store(&self) -> &LocalStore {
        &self.local
    }

    // ==================== Internals ====================

    fn absorb(&mut self, entry: Entry) {
        self.index.insert(entry.normalized_word(), entry.id.clone());
        self.entries.push(entry);
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .map(|e| (e.normalized_word(), e.id.clone()))
            .collect();
    }

    fn persist(&self) {
        self.local.save(&self.export_snapshot());
    }

    /// `word (2)`, `word (3)`, ... whichever is first free
    fn suffixed_word(&self, word: &str) -> String {
        let mut suffix = 2;
        loop {
            let candidate = format!("{} ({})", word, suffix);
            if !self.index.contains_key(&normalize_word(&candidate)) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

fn initial_status(store: &dyn EntryStore) -> SyncStatus {
    if store.is_remote() {
        SyncStatus::Ready
    } else {
        SyncStatus::Disabled
    }
}

/// Apply an imported record on top of an existing entry
///
/// Illustration and recording are only replaced when the import carries them.
fn overwrite(existing: &mut Entry, item: &ImportItem, word: String) {
    existing.word = word;
    existing.definition = item.definition.clone();
    if let Some(illustration) = item.illustration() {
        existing.illustration = illustration.to_string();
    }
    if let Some(recording) = &item.recording {
        existing.recording = recording.clone();
    }
    existing.touch();
}

/// Build a new entry from an import record, keeping its identity when free
fn verbatim(item: &ImportItem, word: String, taken_ids: &HashSet<EntryId>) -> Entry {
    let now = now_millis();
    let id = item
        .id
        .clone()
        .filter(|id| !id.as_str().is_empty() && !taken_ids.contains(id));
    let keep_identity = id.is_some();

    let created_at = if keep_identity {
        item.created_at.unwrap_or(now)
    } else {
        now
    };
    let updated_at = if keep_identity {
        item.updated_at.unwrap_or(created_at)
    } else {
        now
    };

    Entry {
        id: id.unwrap_or_else(EntryId::generate),
        word,
        definition: item.definition.clone(),
        illustration: item.illustration().unwrap_or_default().to_string(),
        recording: item.recording.clone().flatten(),
        created_at,
        updated_at,
    }
}

/// Key for locale-aware alphabetical ordering
///
/// Decomposes to NFD and drops combining marks, so "Ç" sorts with "C".
pub fn sort_key(word: &str) -> String {
    word.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Case- and accent-insensitive comparison, ties broken by the full word
pub fn compare_words(a: &str, b: &str) -> Ordering {
    sort_key(a)
        .cmp(&sort_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
}
