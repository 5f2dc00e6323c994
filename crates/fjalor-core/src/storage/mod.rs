//! Storage layer
//!
//! Persists the entry collection as a single versioned JSON blob.
//!
//! ## Architecture
//!
//! - **Blob**: `{ version, entries }`, the same shape as export files
//! - **Entry Manager**: owns the in-memory collection and hands a snapshot
//!   to the store after every successful mutation
//!
//! In cloud mode the blob is a cache of the last server state.

pub mod error;
pub mod local;

pub use error::{StorageError, StorageResult};
pub use local::LocalStore;
