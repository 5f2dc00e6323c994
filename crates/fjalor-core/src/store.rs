//! Entry stores
//!
//! The `EntryStore` trait is where an entry mutation actually happens. The
//! manager validates and then hands the record to whichever store the
//! configuration selected:
//!
//! - `LocalEntryStore` builds records in-process (fresh id, local clock)
//! - `RemoteEntryStore` sends them to the HTTP API and returns the server's
//!   canonical record
//!
//! Stores never touch the manager's collection. They return data for the
//! manager to absorb.
//!
//! ## Usage
//!
//! ```ignore
//! let store = store_for(config.cloud().as_ref())?;
//! let entry = store.create(&draft).await?;
//! ```

use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use crate::config::CloudConfig;
use crate::error::{EntryError, EntryResult};
use crate::models::{Entry, EntryDraft, EntryId};
use crate::remote::ApiClient;

/// Where mutations are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    Local,
    Cloud,
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreMode::Local => write!(f, "local"),
            StoreMode::Cloud => write!(f, "cloud"),
        }
    }
}

/// Capability that performs entry mutations
#[async_trait]
pub trait EntryStore: Send + Sync {
    fn mode(&self) -> StoreMode;

    fn is_remote(&self) -> bool {
        self.mode() == StoreMode::Cloud
    }

    /// Create a record from an already validated draft
    async fn create(&self, draft: &EntryDraft) -> EntryResult<Entry>;

    /// Produce the updated version of `entry`
    async fn update(&self, entry: &Entry, draft: &EntryDraft) -> EntryResult<Entry>;

    /// Delete the record with `id`
    async fn delete(&self, id: &EntryId) -> EntryResult<()>;

    /// Fetch the authoritative collection
    async fn fetch_all(&self) -> EntryResult<Vec<Entry>>;
}

/// Store that applies mutations in-process
#[derive(Debug, Default, Clone)]
pub struct LocalEntryStore;

#[async_trait]
impl EntryStore for LocalEntryStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Local
    }

    async fn create(&self, draft: &EntryDraft) -> EntryResult<Entry> {
        Ok(Entry::new(draft.clone()))
    }

    async fn update(&self, entry: &Entry, draft: &EntryDraft) -> EntryResult<Entry> {
        let mut updated = entry.clone();
        updated.apply(draft.clone());
        Ok(updated)
    }

    async fn delete(&self, _id: &EntryId) -> EntryResult<()> {
        Ok(())
    }

    async fn fetch_all(&self) -> EntryResult<Vec<Entry>> {
        Err(EntryError::NotConfigured)
    }
}

/// Store backed by the entries HTTP API
#[derive(Debug, Clone)]
pub struct RemoteEntryStore {
    client: ApiClient,
}

impl RemoteEntryStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Build a store for the given cloud configuration
    pub fn connect(config: &CloudConfig) -> EntryResult<Self> {
        let client = ApiClient::new(config).map_err(EntryError::from)?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

#[async_trait]
impl EntryStore for RemoteEntryStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Cloud
    }

    async fn create(&self, draft: &EntryDraft) -> EntryResult<Entry> {
        debug!("Creating '{}' on {}", draft.word, self.client.base_url());
        self.client
            .create_entry(draft)
            .await
            .map_err(|e| EntryError::from_api(e, Some(&draft.word), None))
    }

    async fn update(&self, entry: &Entry, draft: &EntryDraft) -> EntryResult<Entry> {
        debug!("Updating {} on {}", entry.id, self.client.base_url());
        self.client
            .update_entry(&entry.id, draft)
            .await
            .map_err(|e| EntryError::from_api(e, Some(&draft.word), Some(&entry.id)))
    }

    async fn delete(&self, id: &EntryId) -> EntryResult<()> {
        debug!("Deleting {} on {}", id, self.client.base_url());
        self.client
            .delete_entry(id)
            .await
            .map_err(|e| EntryError::from_api(e, None, Some(id)))
    }

    async fn fetch_all(&self) -> EntryResult<Vec<Entry>> {
        self.client.list_entries().await.map_err(EntryError::from)
    }
}

/// Select the store for a configuration: remote when cloud is configured
pub fn store_for(cloud: Option<&CloudConfig>) -> EntryResult<Box<dyn EntryStore>> {
    match cloud {
        Some(config) => Ok(Box::new(RemoteEntryStore::connect(config)?)),
        None => Ok(Box::new(LocalEntryStore)),
    }
}
