use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use produce_core::StoreError;

/// Wire code carried by an error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    InternalServerError,
    NotFound,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::BadRequest => write!(f, "BAD_REQUEST"),
            ErrorCode::InternalServerError => write!(f, "INTERNAL_SERVER_ERROR"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
        }
    }
}

/// Failure of a router procedure.
///
/// Missing context and invalid input are the caller's fault (`BadRequest`).
/// A failed platform call is ours (`Internal`) and keeps the store error as
/// its source.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("{message}")]
    BadRequest { message: String },

    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        source: StoreError,
    },

    #[error("no procedure at path '{path}'")]
    NotFound { path: String },
}

impl RouterError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        RouterError::BadRequest {
            message: message.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>, source: StoreError) -> Self {
        RouterError::Internal {
            message: message.into(),
            source,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            RouterError::BadRequest { .. } => ErrorCode::BadRequest,
            RouterError::Internal { .. } => ErrorCode::InternalServerError,
            RouterError::NotFound { .. } => ErrorCode::NotFound,
        }
    }
}

/// Error surface for the RPC server, its client side and transports.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("server protocol error: {0}")]
    Protocol(String),

    #[error("server is not running (socket missing: {socket})")]
    ServerNotRunning { socket: PathBuf },

    /// The server answered with an error response.
    #[error("{code}: {message}")]
    Rpc { code: ErrorCode, message: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ServerError {
    ServerError::Io {
        path: path.into(),
        source,
    }
}
