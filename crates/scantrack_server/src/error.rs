//! Errors surfaced by the scan service and their HTTP mapping.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use scantrack_db::StoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ScanError {
    /// Missing or malformed request input
    #[error("{0}")]
    Validation(String),

    /// First scan of a barcode with a zero or negative increment
    #[error("Cannot create new record for {barcode} with a non-positive increment")]
    CannotCreate { barcode: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScanError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::CannotCreate { .. } => StatusCode::BAD_REQUEST,
            Self::Store(err) if err.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to the caller. Store internals stay in the logs.
    pub fn public_message(&self) -> String {
        match self.status() {
            StatusCode::SERVICE_UNAVAILABLE => "Database not available".to_string(),
            StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ScanError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }

        let mut resp = (status, Json(json!({ "error": self.public_message() }))).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            resp.headers_mut()
                .insert("retry-after", HeaderValue::from_static("3"));
        }
        resp
    }
}
