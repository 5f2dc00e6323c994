//! Fjalor Server
//!
//! HTTP API for cloud mode, backed by SQLite:
//!
//! - `GET    /api/entries`          → `200 { entries }` (no passphrase needed)
//! - `POST   /api/entries`          → `201 { entry }`
//! - `PUT    /api/entries?id=<id>`  → `200 { entry }`
//! - `DELETE /api/entries?id=<id>`  → `200 { ok: true }`
//!
//! Writes require the `X-Passphrase` header when a passphrase is configured.
//! Every response carries CORS headers; `OPTIONS` answers `204`.

pub mod cors;
pub mod db;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{middleware, routing::get, Router};

pub use db::{Database, DbError, EntryFields};
pub use error::ApiFailure;

/// Default request body limit; recordings travel inline as data URLs
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Server settings that affect request handling
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shared write passphrase; `None` or blank allows all writes
    pub passphrase: Option<String>,
    /// Value for `Access-Control-Allow-Origin` (`*` for any)
    pub allowed_origin: String,
    /// Largest accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            passphrase: None,
            allowed_origin: "*".to_string(),
            max_body_bytes: MAX_BODY_BYTES,
        }
    }
}

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
        }
    }

    /// The configured passphrase, trimmed; `None` when blank
    pub fn expected_passphrase(&self) -> Option<&str> {
        self.config
            .passphrase
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Build the HTTP API router over the given state.
pub fn build_router(state: AppState) -> Router {
    let entries = get(routes::list_entries)
        .post(routes::create_entry)
        .put(routes::update_entry)
        .delete(routes::delete_entry)
        .fallback(routes::method_not_allowed);

    Router::new()
        .route(fjalor_core::remote::ENTRIES_PATH, entries)
        .fallback(routes::not_found)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(middleware::from_fn_with_state(state.clone(), cors::apply_cors))
        .with_state(state)
}
