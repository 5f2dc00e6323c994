//! Data models for Fjalor
//!
//! Defines the dictionary entry, the editable draft submitted by forms,
//! and the versioned schema shared by local persistence and import/export.
//! Field names serialize in camelCase so the JSON matches the HTTP API and
//! files exported by other clients.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Current version of the persisted schema
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum word length accepted by entry forms
pub const MAX_WORD_LEN: usize = 60;
/// Maximum definition length accepted by entry forms
pub const MAX_DEFINITION_LEN: usize = 2000;
/// Maximum illustration length accepted by entry forms
pub const MAX_ILLUSTRATION_LEN: usize = 500;

/// Current time in milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Normalize a word for uniqueness comparison (trimmed, lowercased)
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Opaque entry identifier
///
/// New identifiers are UUID v4 strings, but identifiers coming from a remote
/// store or an import file are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Generate a fresh identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for compact listings
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A dictionary entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Unique identifier, immutable once assigned
    pub id: EntryId,
    /// The headword
    pub word: String,
    /// What the word means
    pub definition: String,
    /// Example sentence using the word
    #[serde(default)]
    pub illustration: String,
    /// Recorded pronunciation as a base64 data URL
    #[serde(default)]
    pub recording: Option<String>,
    /// Creation time (ms since epoch)
    #[serde(default)]
    pub created_at: i64,
    /// Last modification time (ms since epoch)
    #[serde(default)]
    pub updated_at: i64,
}

impl Entry {
    /// Create a new entry from a draft with a fresh id and timestamps
    pub fn new(draft: EntryDraft) -> Self {
        let now = now_millis();
        Self {
            id: EntryId::generate(),
            word: draft.word,
            definition: draft.definition,
            illustration: draft.illustration,
            recording: draft.recording,
            created_at: now,
            updated_at: now,
        }
    }

    /// The word used for uniqueness comparison
    pub fn normalized_word(&self) -> String {
        normalize_word(&self.word)
    }

    /// Replace the mutable fields with the draft's values
    pub fn apply(&mut self, draft: EntryDraft) {
        self.word = draft.word;
        self.definition = draft.definition;
        self.illustration = draft.illustration;
        self.recording = draft.recording;
        self.touch();
    }

    /// Refresh `updated_at`
    ///
    /// The timestamp always advances, even when two mutations land in the
    /// same millisecond.
    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at + 1);
    }

    pub fn has_recording(&self) -> bool {
        self.recording.as_deref().is_some_and(|r| !r.is_empty())
    }
}

/// The user-editable fields of an entry, as submitted by a form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub word: String,
    pub definition: String,
    pub illustration: String,
    pub recording: Option<String>,
}

impl EntryDraft {
    pub fn new(
        word: impl Into<String>,
        definition: impl Into<String>,
        illustration: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into(),
            definition: definition.into(),
            illustration: illustration.into(),
            recording: None,
        }
    }

    /// Attach (or clear) a recording
    pub fn with_recording(mut self, recording: Option<String>) -> Self {
        self.recording = recording;
        self
    }

    /// Draft pre-filled from an existing entry (for edit forms)
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            word: entry.word.clone(),
            definition: entry.definition.clone(),
            illustration: entry.illustration.clone(),
            recording: entry.recording.clone(),
        }
    }

    /// Copy with whitespace trimmed and an empty recording turned into `None`
    pub fn trimmed(&self) -> Self {
        Self {
            word: self.word.trim().to_string(),
            definition: self.definition.trim().to_string(),
            illustration: self.illustration.trim().to_string(),
            recording: self.recording.clone().filter(|r| !r.trim().is_empty()),
        }
    }

    /// Validate the draft the way the entry form does
    ///
    /// All three text fields are required; each has a length limit counted
    /// in characters after trimming.
    pub fn check_form(&self) -> Result<(), FormErrors> {
        let errors = FormErrors {
            word: check_field("Word", &self.word, MAX_WORD_LEN),
            definition: check_field("Definition", &self.definition, MAX_DEFINITION_LEN),
            illustration: check_field("Illustration", &self.illustration, MAX_ILLUSTRATION_LEN),
        };
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn check_field(label: &str, value: &str, max: usize) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        Some(format!("{} is required.", label))
    } else if value.chars().count() > max {
        Some(format!("{} must be at most {} characters.", label, max))
    } else {
        None
    }
}

/// Per-field form validation errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub word: Option<String>,
    pub definition: Option<String>,
    pub illustration: Option<String>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.word.is_none() && self.definition.is_none() && self.illustration.is_none()
    }

    /// All messages in field order
    pub fn messages(&self) -> Vec<&str> {
        [&self.word, &self.definition, &self.illustration]
            .into_iter()
            .filter_map(|m| m.as_deref())
            .collect()
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.messages().join(" "))
    }
}

impl std::error::Error for FormErrors {}

/// Versioned collection of entries
///
/// Same shape for the local blob and for import/export files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataSchema {
    pub version: u32,
    pub entries: Vec<Entry>,
}

impl DataSchema {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            entries,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Default for DataSchema {
    fn default() -> Self {
        Self::empty()
    }
}

/// One record from an import file
///
/// Only `word` is required. `illustration` and `recording` distinguish
/// "absent" from "present", which matters when overwriting.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImportItem {
    #[serde(default)]
    pub id: Option<EntryId>,
    pub word: String,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub illustration: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub recording: Option<Option<String>>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

impl ImportItem {
    /// Illustration if present and non-empty
    pub fn illustration(&self) -> Option<&str> {
        self.illustration.as_deref().filter(|s| !s.is_empty())
    }
}

impl From<Entry> for ImportItem {
    fn from(entry: Entry) -> Self {
        Self {
            id: Some(entry.id),
            word: entry.word,
            definition: entry.definition,
            illustration: Some(entry.illustration),
            recording: Some(entry.recording),
            created_at: Some(entry.created_at),
            updated_at: Some(entry.updated_at),
        }
    }
}

/// Deserialize a field that was present (possibly `null`) as `Some(..)`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Error returned when an import document has the wrong shape
#[derive(Debug, Error)]
pub enum ImportFileError {
    #[error("Invalid file format: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid file format: expected an object with an `entries` array")]
    MissingEntries,
}

/// Parse an import/export document and return its items
///
/// The document must be an object whose `entries` field is an array.
pub fn parse_import_document(text: &str) -> Result<Vec<ImportItem>, ImportFileError> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let entries = value
        .get("entries")
        .filter(|e| e.is_array())
        .cloned()
        .ok_or(ImportFileError::MissingEntries)?;
    Ok(serde_json::from_value(entries)?)
}

/// Order of the visible entry list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Alphabetical,
    Newest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Alphabetical => "alphabetical",
            SortOrder::Newest => "newest",
        }
    }

    /// The other order (for toggling)
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Alphabetical => SortOrder::Newest,
            SortOrder::Newest => SortOrder::Alphabetical,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "alphabetical" | "alpha" | "az" => Ok(SortOrder::Alphabetical),
            "newest" | "new" | "recent" => Ok(SortOrder::Newest),
            _ => Err(format!(
                "unknown sort order '{}' (use alphabetical or newest)",
                s
            )),
        }
    }
}

/// How duplicates are handled when importing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportStrategy {
    /// Drop incoming duplicates
    #[default]
    Skip,
    /// Replace the existing entry's content
    Overwrite,
    /// Insert the incoming entry under a suffixed word
    KeepBoth,
}

impl ImportStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStrategy::Skip => "skip",
            ImportStrategy::Overwrite => "overwrite",
            ImportStrategy::KeepBoth => "keep-both",
        }
    }
}

impl fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "skip" => Ok(ImportStrategy::Skip),
            "overwrite" => Ok(ImportStrategy::Overwrite),
            "keep-both" | "keepboth" => Ok(ImportStrategy::KeepBoth),
            _ => Err(format!(
                "unknown strategy '{}' (use skip, overwrite or keep-both)",
                s
            )),
        }
    }
}

/// Counts reported after an import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub skipped: usize,
    pub overwritten: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} overwritten, {} skipped",
            self.added, self.overwritten, self.skipped
        )
    }
}
