use reqwest::StatusCode;
use thiserror::Error;

use crate::session::{SessionError, SignOutReason};

/// Coarse classification used by callers to pick a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Server,
    Transport,
    Decode,
    Other,
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// 401 on a request that bypasses the interceptor, or on the resubmitted request.
    #[error("request was rejected as unauthenticated")]
    Unauthorized,

    /// The interceptor gave up and tore the session down.
    #[error("session ended: {0}")]
    SessionExpired(SignOutReason),

    #[error("forbidden: {message}")]
    Forbidden { message: String },

    #[error("rejected by server: {message}")]
    BadRequest { message: String },

    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("unexpected status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("cannot reach server: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Unauthorized | ApiError::SessionExpired(_) => ErrorKind::Authentication,
            ApiError::Forbidden { .. } => ErrorKind::Authorization,
            ApiError::BadRequest { .. } => ErrorKind::Validation,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Transport(_) => ErrorKind::Transport,
            ApiError::Decode { .. } => ErrorKind::Decode,
            ApiError::Status { .. } | ApiError::InvalidRequest(_) | ApiError::Session(_) => {
                ErrorKind::Other
            }
        }
    }

    /// HTTP status behind this error, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::Forbidden { .. } => Some(403),
            ApiError::BadRequest { .. } => Some(400),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Server { status, .. } | ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// Map a non-success response to an error. `body` is the raw response text.
    pub fn from_status(status: StatusCode, path: &str, body: &str) -> Self {
        let message = server_message(body);
        match status.as_u16() {
            400 => ApiError::BadRequest { message },
            401 => ApiError::Unauthorized,
            403 => ApiError::Forbidden { message },
            404 => ApiError::NotFound {
                path: path.to_string(),
            },
            s if status.is_server_error() => ApiError::Server { status: s, message },
            s => ApiError::Status { status: s, message },
        }
    }
}

/// Pull a human-readable message out of an error body.
fn server_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["message", "error", "detail"] {
            if let Some(serde_json::Value::String(s)) = map.get(key) {
                return s.clone();
            }
        }
    }
    trimmed.chars().take(200).collect()
}
