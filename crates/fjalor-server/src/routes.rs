//! Handlers for `/api/entries`

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use fjalor_core::remote::PASSPHRASE_HEADER;

use crate::db::EntryFields;
use crate::error::ApiFailure;
use crate::AppState;

type ApiResult<T> = Result<T, ApiFailure>;

/// Extractor results whose rejections are rendered as `{ error }`
type QueryInput = Result<Query<IdQuery>, QueryRejection>;
type BodyInput = Result<Bytes, BytesRejection>;

#[derive(Debug, Deserialize)]
pub struct IdQuery {
    id: Option<String>,
}

impl IdQuery {
    fn require(&self) -> ApiResult<&str> {
        self.id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiFailure::BadRequest("Missing id".to_string()))
    }
}

/// `GET /api/entries`
pub async fn list_entries(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let entries = state.db.list()?;
    debug!("Listing {} entries", entries.len());
    Ok(Json(json!({ "entries": entries })))
}

/// `POST /api/entries`
pub async fn create_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: BodyInput,
) -> ApiResult<(StatusCode, Json<Value>)> {
    authorize(&state, &headers)?;
    let fields = parse_fields(&body?)?;

    let entry = state.db.insert(&fields)?;
    info!("Created '{}' ({})", entry.word, entry.id.short());
    Ok((StatusCode::CREATED, Json(json!({ "entry": entry }))))
}

/// `PUT /api/entries?id=<id>`
pub async fn update_entry(
    State(state): State<AppState>,
    query: QueryInput,
    headers: HeaderMap,
    body: BodyInput,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let Query(query) = query?;
    let id = query.require()?;
    let fields = parse_fields(&body?)?;

    let entry = state.db.update(id, &fields)?.ok_or(ApiFailure::NotFound)?;
    info!("Updated '{}' ({})", entry.word, entry.id.short());
    Ok(Json(json!({ "entry": entry })))
}

/// `DELETE /api/entries?id=<id>`
pub async fn delete_entry(
    State(state): State<AppState>,
    query: QueryInput,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    authorize(&state, &headers)?;
    let Query(query) = query?;
    let id = query.require()?;

    if !state.db.delete(id)? {
        return Err(ApiFailure::NotFound);
    }
    info!("Deleted {}", id);
    Ok(Json(json!({ "ok": true })))
}

pub async fn method_not_allowed() -> ApiFailure {
    ApiFailure::MethodNotAllowed
}

pub async fn not_found() -> ApiFailure {
    ApiFailure::NotFound
}

/// Check the shared passphrase for a write
///
/// A blank or missing server passphrase allows everything.
fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let Some(expected) = state.expected_passphrase() else {
        return Ok(());
    };

    let got = headers
        .get(PASSPHRASE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    if !got.is_empty() && got == expected {
        Ok(())
    } else {
        warn!("Rejected write with bad passphrase");
        Err(ApiFailure::Unauthorized)
    }
}

/// Parse and validate a create/update body
///
/// Text fields are trimmed and must be non-empty. An empty body counts as
/// missing fields; a body that is not JSON is rejected outright.
pub fn parse_fields(body: &[u8]) -> ApiResult<EntryFields> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(body)
            .map_err(|e| ApiFailure::BadRequest(format!("Invalid JSON body: {}", e)))?
    };

    let word = text_field(&value, "word");
    let definition = text_field(&value, "definition");
    let illustration = text_field(&value, "illustration");
    let recording = text_field(&value, "recording");

    if word.is_empty() || definition.is_empty() || illustration.is_empty() {
        return Err(ApiFailure::BadRequest("Missing required fields".to_string()));
    }

    Ok(EntryFields {
        word,
        definition,
        illustration,
        recording: Some(recording).filter(|r| !r.is_empty()),
    })
}

/// A string (or number) field, trimmed; anything else is empty
fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
