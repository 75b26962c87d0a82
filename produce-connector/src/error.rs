//! Error types for produce-connector.

use thiserror::Error;

use produce_core::StoreError;

/// All errors that can arise from a sync run.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The model store rejected an upsert.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A record could not be serialized.
    #[error("record serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record does not satisfy its model definition.
    #[error("invalid {model} record '{id}': {reason}")]
    InvalidRecord {
        model: String,
        id: String,
        reason: String,
    },

    /// No definition exists for the model a record was written to.
    #[error("unknown model '{0}'")]
    UnknownModel(String),
}
