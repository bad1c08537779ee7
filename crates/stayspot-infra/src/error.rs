//! HTTP error response body
//!
//! The `IntoResponse` mapping for `AppError` lives in stayspot-api; this crate only owns
//! the serialized shape so every service renders errors the same way.

use serde::Serialize;

/// Standard error response format for HTTP APIs
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>, code: impl Into<String>, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            recoverable,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
