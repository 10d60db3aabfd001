//! Error types for the gateway server.

use std::path::PathBuf;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Asset root directory is absent at startup.
    #[error("Asset root missing or not a directory: {}", .0.display())]
    AssetRootMissing(PathBuf),

    /// Entry document is absent at startup.
    #[error("Entry document not found: {}", .0.display())]
    EntryMissing(PathBuf),

    /// Entry document has no head-open tag to inject after.
    #[error("Entry document has no <head> tag to inject the runtime config after")]
    HeadMarkerMissing,

    /// Request body could not be read.
    #[error("Request body error: {0}")]
    Body(#[from] axum::Error),

    /// Response construction failed.
    #[error("Response build error: {0}")]
    Http(#[from] axum::http::Error),

    /// Backend request failed.
    #[error("Upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::Upstream(err) => (
                StatusCode::BAD_GATEWAY,
                json!({
                    "error": "Upstream request failed",
                    "detail": err.to_string(),
                }),
            ),
            Self::Body(err) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Request body could not be read",
                    "detail": err.to_string(),
                }),
            ),
            Self::AssetRootMissing(_)
            | Self::EntryMissing(_)
            | Self::HeadMarkerMissing
            | Self::Http(_)
            | Self::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": self.to_string(),
                }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}
