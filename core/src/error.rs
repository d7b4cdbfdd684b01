//! Error types for the crop API client.
//!
//! # Design
//! Three failure families: the request never completed (`Transport`), the
//! server answered with a non-2xx status (`HttpStatus`), or the body was not
//! the JSON we expected (`Parse`). `Display` renders the message placed in the
//! `error` field of a failure envelope; `kind()` gives callers a value to
//! branch on without inspecting that string.

/// Errors produced while executing or interpreting an API call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Network unreachable, DNS failure, connection reset, timeout.
    #[error("{0}")]
    Transport(String),

    /// The server responded with a status outside 200..300.
    #[error("HTTP error! status: {status}")]
    HttpStatus { status: u16, body: String },

    /// The response body was not valid JSON or not the expected JSON shape.
    #[error("invalid JSON response: {0}")]
    Parse(String),
}

/// Discriminant of an `ApiError`, for programmatic branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    HttpStatus,
    Parse,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::HttpStatus { .. } => ErrorKind::HttpStatus,
            ApiError::Parse(_) => ErrorKind::Parse,
        }
    }

    /// HTTP status for `HttpStatus` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ApiError::Transport(format!("request timed out: {err}"));
        }
        ApiError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}
