//! # produce-connector
//!
//! Content connector: declarative model definitions and the sync routine that
//! populates them.
//!
//! Call [`sync::run`] with a [`SyncMode`] to upsert the connector's records
//! into a [`produce_core::ModelStore`]. [`model::definitions`] describes the
//! document types the store should expect.

pub mod error;
pub mod model;
pub mod sync;

pub use error::ConnectorError;
pub use model::{definitions, FieldDefinition, FieldType, ModelDefinition, ModelKind};
pub use sync::{SyncMode, SyncReport, Upserted};
