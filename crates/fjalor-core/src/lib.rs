//! Fjalor Core Library
//!
//! This crate provides the core functionality for Fjalor, a small personal
//! dictionary: word entries with a definition, an example sentence and an
//! optional recorded pronunciation.
//!
//! # Architecture
//!
//! - **Local blob**: the whole collection persisted as one versioned JSON file
//! - **Cloud mode**: optional HTTP API that becomes the source of truth when
//!   configured; the local blob then caches the server state
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut manager = EntryManager::open(&config)?;
//!
//! // Add an entry
//! manager.add(EntryDraft::new("mace", "animal", "Macja po fle.")).await?;
//!
//! // Query entries
//! let visible = manager.visible_entries();
//! ```
//!
//! # Modules
//!
//! - `manager`: the entry manager (main entry point)
//! - `models`: entries, drafts, the persisted schema and import records
//! - `store`: local and remote entry stores
//! - `remote`: HTTP client for the entries API
//! - `storage`: local blob persistence
//! - `speech`: text-to-speech and recording playback
//! - `config`: application configuration

pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod remote;
pub mod speech;
pub mod storage;
pub mod store;

pub use config::{CloudConfig, Config, SpeechSettings};
pub use error::{EntryError, EntryResult};
pub use manager::{EntryManager, SyncStatus};
pub use models::{
    DataSchema, Entry, EntryDraft, EntryId, FormErrors, ImportItem, ImportStrategy, ImportSummary,
    SortOrder,
};
pub use remote::{ApiClient, ApiError};
pub use speech::{Speech, SpeechError};
pub use storage::{LocalStore, StorageError};
pub use store::{EntryStore, LocalEntryStore, RemoteEntryStore, StoreMode};
