//! Error types for the Postmark client.

use thiserror::Error;

/// Errors that can occur when sending through Postmark.
#[derive(Debug, Error)]
pub enum PostmarkError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Postmark refused the request.
    #[error("Postmark error {code} ({status}): {message}")]
    Api {
        status: u16,
        code: i64,
        message: String,
    },

    /// Invalid response from server.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
