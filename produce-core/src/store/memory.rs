//! In-process platform store for tests and embedding.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde_json::Value;

use super::{check_segment, remove_key, set_all_context, ModelStore, PlatformClient};
use crate::error::StoreError;
use crate::types::{EnvironmentVariable, RecordId, SiteId, TeamConfiguration, TeamId};

#[derive(Debug, Default)]
struct State {
    models: BTreeMap<String, BTreeMap<RecordId, Value>>,
    teams: HashMap<TeamId, TeamConfiguration>,
    env: HashMap<(TeamId, SiteId), Vec<EnvironmentVariable>>,
}

/// `RwLock`-guarded maps. Reads and writes can be made to fail on demand, and
/// every call through either trait is counted.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    state: RwLock<State>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    calls: AtomicUsize,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read call fail with [`StoreError::Unavailable`].
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write call fail with [`StoreError::Unavailable`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of trait calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Seed a raw team configuration, bypassing validation and call counting.
    pub fn seed_team_configuration(&self, team: &TeamId, config: Value) -> Result<(), StoreError> {
        let now = Utc::now();
        self.state_mut()?.teams.insert(
            team.clone(),
            TeamConfiguration {
                team_id: team.clone(),
                config,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        self.state_mut()
    }

    fn state_mut(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl ModelStore for MemoryPlatform {
    fn insert(&self, model: &str, id: &RecordId, record: Value) -> Result<(), StoreError> {
        check_segment(model)?;
        check_segment(&id.0)?;
        self.write()?
            .models
            .entry(model.to_string())
            .or_default()
            .insert(id.clone(), record);
        Ok(())
    }

    fn get(&self, model: &str, id: &RecordId) -> Result<Option<Value>, StoreError> {
        Ok(self
            .read()?
            .models
            .get(model)
            .and_then(|records| records.get(id))
            .cloned())
    }

    fn list(&self, model: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .read()?
            .models
            .get(model)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }
}

impl PlatformClient for MemoryPlatform {
    fn get_team_configuration(
        &self,
        team: &TeamId,
    ) -> Result<Option<TeamConfiguration>, StoreError> {
        Ok(self.read()?.teams.get(team).cloned())
    }

    fn create_team_configuration(
        &self,
        team: &TeamId,
        config: Value,
    ) -> Result<TeamConfiguration, StoreError> {
        let mut state = self.write()?;
        if state.teams.contains_key(team) {
            return Err(StoreError::Conflict {
                what: format!("configuration for team {team}"),
            });
        }
        let now = Utc::now();
        let record = TeamConfiguration {
            team_id: team.clone(),
            config,
            created_at: now,
            updated_at: now,
        };
        state.teams.insert(team.clone(), record.clone());
        Ok(record)
    }

    fn update_team_configuration(
        &self,
        team: &TeamId,
        config: Value,
    ) -> Result<TeamConfiguration, StoreError> {
        let mut state = self.write()?;
        let Some(record) = state.teams.get_mut(team) else {
            return Err(StoreError::NotFound {
                what: format!("configuration for team {team}"),
            });
        };
        record.config = config;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn get_environment_variables(
        &self,
        account: &TeamId,
        site: &SiteId,
    ) -> Result<Vec<EnvironmentVariable>, StoreError> {
        Ok(self
            .read()?
            .env
            .get(&(account.clone(), site.clone()))
            .cloned()
            .unwrap_or_default())
    }

    fn create_or_update_variable(
        &self,
        account: &TeamId,
        site: &SiteId,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let vars = state
            .env
            .entry((account.clone(), site.clone()))
            .or_default();
        set_all_context(vars, key, value);
        Ok(())
    }

    fn delete_environment_variable(
        &self,
        account: &TeamId,
        site: &SiteId,
        key: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if let Some(vars) = state.env.get_mut(&(account.clone(), site.clone())) {
            remove_key(vars, key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_calls_and_injects_failures() {
        let store = MemoryPlatform::new();
        let team = TeamId::from("t");
        assert_eq!(store.calls(), 0);

        store.get_team_configuration(&team).expect("get");
        assert_eq!(store.calls(), 1);

        store.set_fail_writes(true);
        let err = store
            .create_team_configuration(&team, json!({}))
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.set_fail_writes(false);
        store.set_fail_reads(true);
        assert!(store.get_team_configuration(&team).is_err());
    }

    #[test]
    fn list_is_ordered_by_id() {
        let store = MemoryPlatform::new();
        for id in ["2", "1", "3"] {
            store
                .insert("Post", &RecordId::from(id), json!({ "id": id }))
                .expect("insert");
        }
        let ids: Vec<Value> = store
            .list("Post")
            .expect("list")
            .into_iter()
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("1"), json!("2"), json!("3")]);
    }
}
