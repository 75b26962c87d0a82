//! Produce core library: content types, platform store interfaces, feature
//! flag lookup and the extension manifest.
//!
//! - [`types`]: newtypes, documents and environment variables
//! - [`settings`]: [`TeamSettings`] schema and shallow merge
//! - [`store`]: [`ModelStore`] / [`PlatformClient`] and their implementations
//! - [`flag`]: [`FlagLookup`] and the build event handler flag key
//! - [`manifest`]: extension registration values
//! - [`error`]: [`StoreError`]

pub mod error;
pub mod flag;
pub mod manifest;
pub mod settings;
pub mod store;
pub mod types;

pub use error::StoreError;
pub use flag::{flag_is_set, FlagLookup, ProcessEnv, BUILD_EVENT_HANDLER_ENABLED_ENV_VAR};
pub use manifest::ExtensionManifest;
pub use settings::{SchemaError, TeamSettings};
pub use store::{LocalPlatform, MemoryPlatform, ModelStore, PlatformClient};
pub use types::{
    Block, Document, EnvVarValue, EnvironmentVariable, Post, PostRef, PublishStatus, RecordId,
    RequestContext, SiteId, TeamConfiguration, TeamId, User,
};
