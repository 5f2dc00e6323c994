//! API failures and their JSON rendering

use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

use crate::db::DbError;

/// A failed request, rendered as `{ "error": "..." }`
#[derive(Error, Debug)]
pub enum ApiFailure {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Word already exists")]
    Conflict,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("{0}")]
    Internal(String),
}

impl ApiFailure {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiFailure::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiFailure::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiFailure::NotFound => StatusCode::NOT_FOUND,
            ApiFailure::Conflict => StatusCode::CONFLICT,
            ApiFailure::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiFailure::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiFailure::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiFailure {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate => ApiFailure::Conflict,
            other => {
                error!("{}", other);
                ApiFailure::Internal(other.to_string())
            }
        }
    }
}

impl From<QueryRejection> for ApiFailure {
    fn from(rejection: QueryRejection) -> Self {
        ApiFailure::BadRequest(format!("Invalid query: {}", rejection.body_text()))
    }
}

impl From<BytesRejection> for ApiFailure {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiFailure::PayloadTooLarge
        } else {
            ApiFailure::BadRequest(rejection.body_text())
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}
