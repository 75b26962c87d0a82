//! Interfaces to the external platform, plus two implementations.
//!
//! The content model store and the platform API (team configuration,
//! environment variables) are not part of this crate; everything here talks
//! to them through [`ModelStore`] and [`PlatformClient`]:
//!
//! - [`LocalPlatform`]: file-backed YAML under `~/.produce/`, for local runs
//! - [`MemoryPlatform`]: in-process maps, for tests
//!
//! Every call is a single blocking operation that either succeeds or fails.
//! No locking is layered on top; concurrent writers race and the last write
//! wins.

pub(crate) mod local;
mod memory;

pub use local::{produce_root, LocalPlatform};
pub use memory::MemoryPlatform;

use serde_json::Value;

use crate::error::StoreError;
use crate::types::{
    EnvVarValue, EnvironmentVariable, RecordId, SiteId, TeamConfiguration, TeamId, CONTEXT_ALL,
};

/// Content model storage with upsert-by-id semantics.
pub trait ModelStore: Send + Sync {
    /// Insert `record` under `model`/`id`, fully replacing any existing record
    /// with the same id.
    fn insert(&self, model: &str, id: &RecordId, record: Value) -> Result<(), StoreError>;

    fn get(&self, model: &str, id: &RecordId) -> Result<Option<Value>, StoreError>;

    /// All records of `model`, ordered by id.
    fn list(&self, model: &str) -> Result<Vec<Value>, StoreError>;
}

/// Team configuration and site environment variable API.
pub trait PlatformClient: Send + Sync {
    fn get_team_configuration(
        &self,
        team: &TeamId,
    ) -> Result<Option<TeamConfiguration>, StoreError>;

    /// Fails with [`StoreError::Conflict`] if the team already has one.
    fn create_team_configuration(
        &self,
        team: &TeamId,
        config: Value,
    ) -> Result<TeamConfiguration, StoreError>;

    /// Replaces the stored config wholesale. Fails with
    /// [`StoreError::NotFound`] if the team has none.
    fn update_team_configuration(
        &self,
        team: &TeamId,
        config: Value,
    ) -> Result<TeamConfiguration, StoreError>;

    fn get_environment_variables(
        &self,
        account: &TeamId,
        site: &SiteId,
    ) -> Result<Vec<EnvironmentVariable>, StoreError>;

    /// Set `key` to `value` for the `all` context, creating the variable if
    /// needed. Values for other contexts are kept.
    fn create_or_update_variable(
        &self,
        account: &TeamId,
        site: &SiteId,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError>;

    /// Remove `key` entirely. Removing an absent key succeeds.
    fn delete_environment_variable(
        &self,
        account: &TeamId,
        site: &SiteId,
        key: &str,
    ) -> Result<(), StoreError>;
}

pub(crate) fn set_all_context(vars: &mut Vec<EnvironmentVariable>, key: &str, value: &str) {
    let entry = EnvVarValue {
        context: CONTEXT_ALL.to_string(),
        value: value.to_string(),
    };
    match vars.iter_mut().find(|v| v.key == key) {
        Some(var) => {
            var.values.retain(|v| v.context != CONTEXT_ALL);
            var.values.push(entry);
        }
        None => vars.push(EnvironmentVariable {
            key: key.to_string(),
            values: vec![entry],
        }),
    }
}

pub(crate) fn remove_key(vars: &mut Vec<EnvironmentVariable>, key: &str) {
    vars.retain(|v| v.key != key);
}

/// Model names, ids and team/site ids become path segments in
/// [`LocalPlatform`]; both implementations accept the same alphabet.
pub(crate) fn check_segment(segment: &str) -> Result<(), StoreError> {
    let valid = !segment.is_empty()
        && !segment.starts_with('.')
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(segment.to_string()))
    }
}
