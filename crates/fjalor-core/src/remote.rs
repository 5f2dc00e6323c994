//! Remote API client
//!
//! Thin request/response mapper for the entries HTTP API:
//!
//! - `GET    /api/entries`          → `{ entries: [...] }`
//! - `POST   /api/entries`          → `{ entry }`
//! - `PUT    /api/entries?id=<id>`  → `{ entry }`
//! - `DELETE /api/entries?id=<id>`  → `{ ok: true }`
//!
//! Each call is a single round trip: no retries, no caching. Non-2xx
//! responses become `ApiError::Status` carrying the parsed error payload.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::CloudConfig;
use crate::models::{Entry, EntryDraft, EntryId};

/// Header carrying the shared write passphrase
pub const PASSPHRASE_HEADER: &str = "X-Passphrase";

/// Path of the entries resource
pub const ENTRIES_PATH: &str = "/api/entries";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the remote API
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("Server returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        payload: Value,
    },

    /// A success response was missing the expected data
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// HTTP status, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Human-readable message (server's `error` field when available)
    pub fn message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Request body for create and update
#[derive(Debug, Serialize)]
struct EntryBody<'a> {
    word: &'a str,
    definition: &'a str,
    illustration: &'a str,
    recording: Option<&'a str>,
}

impl<'a> From<&'a EntryDraft> for EntryBody<'a> {
    fn from(draft: &'a EntryDraft) -> Self {
        Self {
            word: &draft.word,
            definition: &draft.definition,
            illustration: &draft.illustration,
            recording: draft.recording.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    entries: Option<Vec<Entry>>,
}

#[derive(Debug, Deserialize)]
struct EntryResponse {
    entry: Option<Entry>,
}

/// HTTP client for the entries API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    passphrase: Option<String>,
}

impl ApiClient {
    /// Create a client for the given cloud configuration
    pub fn new(config: &CloudConfig) -> ApiResult<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: normalize_base_url(&config.api_base_url),
            passphrase: config
                .passphrase
                .clone()
                .filter(|p| !p.trim().is_empty()),
        })
    }

    /// The normalized base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch every entry from the server
    pub async fn list_entries(&self) -> ApiResult<Vec<Entry>> {
        let body = self.request(Method::GET, None, None).await?;
        let response: ListResponse = serde_json::from_value(body)
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        response
            .entries
            .ok_or_else(|| ApiError::InvalidResponse("missing `entries`".to_string()))
    }

    /// Create an entry; returns the server's canonical record
    pub async fn create_entry(&self, draft: &EntryDraft) -> ApiResult<Entry> {
        let payload = serde_json::to_value(EntryBody::from(draft))
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let body = self.request(Method::POST, None, Some(payload)).await?;
        parse_entry(body)
    }

    /// Update an entry; returns the server's canonical record
    pub async fn update_entry(&self, id: &EntryId, draft: &EntryDraft) -> ApiResult<Entry> {
        let payload = serde_json::to_value(EntryBody::from(draft))
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        let body = self.request(Method::PUT, Some(id), Some(payload)).await?;
        parse_entry(body)
    }

    /// Delete an entry
    pub async fn delete_entry(&self, id: &EntryId) -> ApiResult<()> {
        self.request(Method::DELETE, Some(id), None).await?;
        Ok(())
    }

    /// Perform one request and return the parsed JSON body
    ///
    /// Empty or unparseable bodies become `Value::Null`.
    async fn request(
        &self,
        method: Method,
        id: Option<&EntryId>,
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, ENTRIES_PATH);
        debug!("{} {} id={:?}", method, url, id.map(EntryId::as_str));

        let mut builder = self.client.request(method, &url);
        if let Some(id) = id {
            builder = builder.query(&[("id", id.as_str())]);
        }
        if let Some(ref passphrase) = self.passphrase {
            builder = builder.header(PASSPHRASE_HEADER, passphrase);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let json = parse_body(&text);

        if !status.is_success() {
            debug!("Request failed with status {}", status);
            return Err(status_error(status, json));
        }

        Ok(json)
    }
}

/// Trim whitespace and a trailing slash
fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}

fn parse_body(text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or(Value::Null)
}

fn status_error(status: StatusCode, payload: Value) -> ApiError {
    let message = payload
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    ApiError::Status {
        status: status.as_u16(),
        message,
        payload,
    }
}

fn parse_entry(body: Value) -> ApiResult<Entry> {
    let response: EntryResponse =
        serde_json::from_value(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
    response
        .entry
        .ok_or_else(|| ApiError::InvalidResponse("missing `entry`".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url(" https://dict.example.com/ "),
            "https://dict.example.com"
        );
        assert_eq!(
            normalize_base_url("http://localhost:3000"),
            "http://localhost:3000"
        );
    }

    #[test]
    fn test_parse_body_degrades_to_null() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("<html>oops</html>"), Value::Null);
        assert_eq!(parse_body(r#"{"ok":true}"#), json!({"ok": true}));
    }

    #[test]
    fn test_status_error_uses_payload_message() {
        let err = status_error(StatusCode::CONFLICT, json!({"error": "Word already exists"}));
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.message(), "Word already exists");
    }

    #[test]
    fn test_status_error_falls_back_to_reason() {
        let err = status_error(StatusCode::NOT_FOUND, Value::Null);
        assert_eq!(err.message(), "Not Found");

        let err = status_error(StatusCode::from_u16(599).unwrap(), Value::Null);
        assert_eq!(err.message(), "HTTP 599");
    }

    #[test]
    fn test_parse_entry() {
        let body = json!({
            "entry": {
                "id": "e1",
                "word": "mace",
                "definition": "animal",
                "illustration": "Macja po fle.",
                "recording": null,
                "createdAt": 10,
                "updatedAt": 10
            }
        });
        let entry = parse_entry(body).unwrap();
        assert_eq!(entry.id.as_str(), "e1");
        assert_eq!(entry.created_at, 10);

        assert!(matches!(
            parse_entry(json!({"ok": true})),
            Err(ApiError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_entry(Value::Null),
            Err(ApiError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_blank_passphrase_is_not_sent() {
        let client = ApiClient::new(&CloudConfig {
            api_base_url: "http://localhost:3000/".to_string(),
            passphrase: Some("  ".to_string()),
        })
        .unwrap();
        assert!(client.passphrase.is_none());
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_entry_body_serializes_null_recording() {
        let draft = EntryDraft::new("mace", "animal", "Macja po fle.");
        let value = serde_json::to_value(EntryBody::from(&draft)).unwrap();
        assert_eq!(value["word"], "mace");
        assert!(value["recording"].is_null());
    }
}
