//! Error types for produce-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from platform store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`; cannot locate `~/.produce/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A record that must exist was not found.
    #[error("{what} not found")]
    NotFound { what: String },

    /// A create call targeted a record that already exists.
    #[error("{what} already exists")]
    Conflict { what: String },

    /// Model names and record ids become path segments; reject anything else.
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),

    /// The extension manifest failed validation.
    #[error("invalid extension manifest: {0}")]
    InvalidManifest(String),

    /// The backing store refused the call (lock poisoned, injected failure).
    #[error("platform store unavailable: {0}")]
    Unavailable(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
