//! Error types for topicdesk.
//!
//! Library crates use [`TopicDeskError`] via `thiserror`.
//! The binary wraps this with `color-eyre` for rich diagnostics.
//! With the `axum` feature enabled the error also implements `IntoResponse`
//! so intake handlers can return it directly.

use std::path::PathBuf;

/// Top-level error type for all topicdesk operations.
#[derive(Debug, thiserror::Error)]
pub enum TopicDeskError {
    /// Configuration loading or secret resolution error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level HTTP failure (connect, timeout, body read).
    #[error("network error: {0}")]
    Network(String),

    /// Bad inbound payload or schema violation in a block collection.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Missing or mismatched credential on an inbound request.
    #[error("auth error: {0}")]
    Auth(String),

    /// An agent call failed or returned output that violates its contract.
    #[error("agent error: {0}")]
    Agent(String),

    /// The document API refused a page creation or block append.
    #[error("publish error: HTTP {status}: {body}")]
    Publish { status: u16, body: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Unexpected internal failure (task panic, poisoned state).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TopicDeskError>;

impl TopicDeskError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Message shown to HTTP callers. Validation and auth errors carry their
    /// own text; everything else is reported generically.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation { message } => message.clone(),
            Self::Auth(msg) => msg.clone(),
            _ => "internal server error".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for TopicDeskError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Auth(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "detail": self.public_message() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TopicDeskError::config("NOTION_API_KEY is not set");
        assert_eq!(err.to_string(), "config error: NOTION_API_KEY is not set");

        let err = TopicDeskError::Publish {
            status: 400,
            body: "{\"code\":\"validation_error\"}".into(),
        };
        assert!(err.to_string().starts_with("publish error: HTTP 400"));
    }

    #[test]
    fn public_message_hides_internal_detail() {
        let err = TopicDeskError::Network("connection refused to 10.0.0.3".into());
        assert_eq!(err.public_message(), "internal server error");

        let err = TopicDeskError::validation("Invalid request: 'Page ID' is required");
        assert_eq!(err.public_message(), "Invalid request: 'Page ID' is required");
    }
}
