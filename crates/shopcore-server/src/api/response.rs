//! API response types
//!
//! The uniform error envelope returned by every endpoint, plus the
//! production/diagnostic switch that decides whether internal failure
//! detail is exposed to clients.

use serde::Serialize;

/// Standard error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an error response with diagnostic details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Error response for an internal failure.
    ///
    /// Outside production the original error message is attached as
    /// `details`; in production clients only see the generic message.
    pub fn internal(
        code: impl Into<String>,
        message: impl Into<String>,
        source: &impl std::fmt::Display,
    ) -> Self {
        if is_development() {
            Self::with_details(code, message, serde_json::json!(source.to_string()))
        } else {
            Self::new(code, message)
        }
    }
}

/// Check if running in development mode
pub fn is_development() -> bool {
    std::env::var("APP_ENV")
        .map(|env| env == "development")
        .unwrap_or_else(|_| cfg!(debug_assertions))
}
