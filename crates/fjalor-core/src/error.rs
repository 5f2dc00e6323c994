//! Entry operation errors
//!
//! Every public operation of the entry manager reports failure through
//! `EntryError`. Remote failures are translated from `ApiError` so callers
//! only ever branch on one taxonomy.

use thiserror::Error;

use crate::models::EntryId;
use crate::remote::ApiError;

/// Errors returned by entry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// A required field is empty or malformed
    #[error("{0}")]
    Validation(String),

    /// Another entry already uses this word
    #[error("An entry for '{word}' already exists.")]
    Duplicate { word: String },

    /// The entry vanished (locally or on the server)
    #[error("Entry not found: {id}")]
    NotFound { id: EntryId },

    /// The server rejected the shared passphrase
    #[error("Not authorized: {0}. Check the passphrase in your settings.")]
    Unauthorized(String),

    /// A cloud operation was attempted without a cloud configuration
    #[error("Cloud sync is not configured. Set api_base_url to enable it.")]
    NotConfigured,

    /// Transport failure or unexpected server response
    #[error("Network error: {0}")]
    Network(String),
}

impl EntryError {
    /// Translate an API failure for an operation on `word` / `id`
    ///
    /// `409` becomes `Duplicate`, `404` becomes `NotFound`, `401` becomes
    /// `Unauthorized`, `400` and `413` become `Validation`.
    pub fn from_api(error: ApiError, word: Option<&str>, id: Option<&EntryId>) -> Self {
        match error.status() {
            Some(400) => EntryError::Validation(error.message()),
            Some(413) => EntryError::Validation(
                "Entry is too large to upload. Try a shorter recording.".to_string(),
            ),
            Some(401) | Some(403) => EntryError::Unauthorized(error.message()),
            Some(404) => EntryError::NotFound {
                id: id.cloned().unwrap_or_else(|| EntryId::from("")),
            },
            Some(409) => EntryError::Duplicate {
                word: word.unwrap_or_default().to_string(),
            },
            _ => EntryError::Network(error.to_string()),
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, EntryError::Network(_) | EntryError::Unauthorized(_))
    }

    /// Message suitable for a status bar or toast
    pub fn user_message(&self) -> String {
        match self {
            EntryError::NotFound { .. } => "This entry no longer exists.".to_string(),
            EntryError::Network(_) => format!("{} Your local copy is unchanged.", self),
            other => other.to_string(),
        }
    }

    /// Short category label for status lines and JSON output
    pub fn kind(&self) -> &'static str {
        match self {
            EntryError::Validation(_) => "validation",
            EntryError::Duplicate { .. } => "duplicate",
            EntryError::NotFound { .. } => "not_found",
            EntryError::Unauthorized(_) => "unauthorized",
            EntryError::NotConfigured => "not_configured",
            EntryError::Network(_) => "network",
        }
    }
}

impl From<ApiError> for EntryError {
    fn from(error: ApiError) -> Self {
        EntryError::from_api(error, None, None)
    }
}

/// Result type for entry operations
pub type EntryResult<T> = Result<T, EntryError>;
