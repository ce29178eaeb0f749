use std::time::Duration;

use thiserror::Error;

use crate::models::SkipKind;

/// Application-wide error types for hnbrief.
#[derive(Error, Debug)]
pub enum AppError {
    /// Upstream answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// HTTP request could not be built or completed for a non-transport reason.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Request timed out.
    #[error("Request timed out after {}", format_duration(.0))]
    Timeout(Duration),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Response body is not something the extractor can read.
    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Main-content extraction produced no usable text.
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    /// Upstream payload is missing required fields or is not the expected shape.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// LLM API call failed.
    #[error("LLM error (HTTP {status_code}): {message}")]
    LlmError {
        message: String,
        status_code: u16,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Caller passed input that can never be processed (e.g. item id 0).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Classify a collaborator failure into the skip taxonomy.
    ///
    /// Malformed payloads fail closed as network errors. Errors that should
    /// never reach a unit (config, invalid input, LLM) also land on
    /// `NetworkError` so a unit still yields exactly one outcome.
    pub fn skip_kind(&self) -> SkipKind {
        match self {
            AppError::HttpStatus { status, .. } => SkipKind::HttpError(*status),
            AppError::Timeout(_) => SkipKind::Timeout,
            AppError::UnsupportedContentType(_) => SkipKind::UnsupportedContentType,
            AppError::ExtractionFailed(_) => SkipKind::ExtractionFailed,
            AppError::HttpError(_)
            | AppError::NetworkError(_)
            | AppError::MalformedPayload(_)
            | AppError::SerializationError(_)
            | AppError::RateLimitExceeded
            | AppError::LlmError { .. }
            | AppError::ConfigError(_)
            | AppError::InvalidInput(_) => SkipKind::NetworkError,
        }
    }
}

/// Whole seconds when the duration has no fraction, milliseconds otherwise.
fn format_duration(duration: &Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
