//! Error types for Scribe
//!
//! Source-level failures never reach this type: adapters contain them and
//! report them through `SourceReport`. Only request validation and truly
//! unexpected failures surface at the HTTP boundary.

use hyper::StatusCode;

/// Main error type for Scribe operations
#[derive(Debug, thiserror::Error)]
pub enum ScribeError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScribeError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Detail string without the variant prefix, for `{ error, details }` bodies
    pub fn details(&self) -> &str {
        match self {
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::Internal(msg)
            | Self::Config(msg) => msg,
        }
    }
}

impl From<std::io::Error> for ScribeError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ScribeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("JSON error: {}", err))
    }
}

/// Result type alias for Scribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;
