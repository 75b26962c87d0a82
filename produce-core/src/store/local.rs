//! File-backed platform store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.produce/
//!   models/<Model>/<id>.yaml               (one record per file, mode 0600)
//!   teams/<team>/configuration.yaml        (team settings record)
//!   teams/<team>/sites/<site>/env.yaml     (site environment variables)
//! ```
//!
//! Writes go to a uniquely named `.tmp` sibling first and are renamed into
//! place, so neither a crash nor a concurrent writer leaves a truncated
//! record behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{check_segment, remove_key, set_all_context, ModelStore, PlatformClient};
use crate::error::{io_err, StoreError};
use crate::types::{EnvironmentVariable, RecordId, SiteId, TeamConfiguration, TeamId};

/// `<home>/.produce`. Pure, no I/O.
pub fn produce_root(home: &Path) -> PathBuf {
    home.join(".produce")
}

#[derive(Debug, Clone)]
pub struct LocalPlatform {
    root: PathBuf,
}

impl LocalPlatform {
    /// Store rooted at `<home>/.produce`. Nothing is created until the first write.
    pub fn at(home: &Path) -> Self {
        Self {
            root: produce_root(home),
        }
    }

    /// `at` convenience wrapper using `dirs::home_dir()`.
    pub fn from_home() -> Result<Self, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::HomeNotFound)?;
        Ok(Self::at(&home))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/models/<model>/<id>.yaml`
    pub fn record_path(&self, model: &str, id: &RecordId) -> Result<PathBuf, StoreError> {
        check_segment(model)?;
        check_segment(&id.0)?;
        Ok(self
            .root
            .join("models")
            .join(model)
            .join(format!("{}.yaml", id.0)))
    }

    /// `<root>/teams/<team>/configuration.yaml`
    pub fn team_configuration_path(&self, team: &TeamId) -> Result<PathBuf, StoreError> {
        check_segment(&team.0)?;
        Ok(self.root.join("teams").join(&team.0).join("configuration.yaml"))
    }

    /// `<root>/teams/<team>/sites/<site>/env.yaml`
    pub fn env_path(&self, team: &TeamId, site: &SiteId) -> Result<PathBuf, StoreError> {
        check_segment(&team.0)?;
        check_segment(&site.0)?;
        Ok(self
            .root
            .join("teams")
            .join(&team.0)
            .join("sites")
            .join(&site.0)
            .join("env.yaml"))
    }

    fn load_env(&self, path: &Path) -> Result<Vec<EnvironmentVariable>, StoreError> {
        Ok(read_yaml(path)?.unwrap_or_default())
    }
}

impl ModelStore for LocalPlatform {
    fn insert(&self, model: &str, id: &RecordId, record: Value) -> Result<(), StoreError> {
        let path = self.record_path(model, id)?;
        write_yaml_atomic(&path, &record)
    }

    fn get(&self, model: &str, id: &RecordId) -> Result<Option<Value>, StoreError> {
        read_yaml(&self.record_path(model, id)?)
    }

    fn list(&self, model: &str) -> Result<Vec<Value>, StoreError> {
        check_segment(model)?;
        let dir = self.root.join("models").join(model);
        if !dir.exists() {
            return Ok(vec![]);
        }

        // Keyed by the id encoded in the file name, same order as MemoryPlatform.
        let mut entries: Vec<(RecordId, PathBuf)> = std::fs::read_dir(&dir)
            .map_err(|e| io_err(&dir, e))?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                let id = name.strip_suffix(".yaml")?;
                check_segment(id).ok()?;
                Some((RecordId::from(id), e.path()))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut records = Vec::with_capacity(entries.len());
        for (_, path) in entries {
            if let Some(record) = read_yaml(&path)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl PlatformClient for LocalPlatform {
    fn get_team_configuration(
        &self,
        team: &TeamId,
    ) -> Result<Option<TeamConfiguration>, StoreError> {
        read_yaml(&self.team_configuration_path(team)?)
    }

    fn create_team_configuration(
        &self,
        team: &TeamId,
        config: Value,
    ) -> Result<TeamConfiguration, StoreError> {
        let path = self.team_configuration_path(team)?;
        if path.exists() {
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
        write_yaml_atomic(&path, &record)?;
        Ok(record)
    }

    fn update_team_configuration(
        &self,
        team: &TeamId,
        config: Value,
    ) -> Result<TeamConfiguration, StoreError> {
        let path = self.team_configuration_path(team)?;
        let Some(mut record) = read_yaml::<TeamConfiguration>(&path)? else {
            return Err(StoreError::NotFound {
                what: format!("configuration for team {team}"),
            });
        };
        record.config = config;
        record.updated_at = Utc::now();
        write_yaml_atomic(&path, &record)?;
        Ok(record)
    }

    fn get_environment_variables(
        &self,
        account: &TeamId,
        site: &SiteId,
    ) -> Result<Vec<EnvironmentVariable>, StoreError> {
        self.load_env(&self.env_path(account, site)?)
    }

    fn create_or_update_variable(
        &self,
        account: &TeamId,
        site: &SiteId,
        key: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        let path = self.env_path(account, site)?;
        let mut vars = self.load_env(&path)?;
        set_all_context(&mut vars, key, value);
        write_yaml_atomic(&path, &vars)
    }

    fn delete_environment_variable(
        &self,
        account: &TeamId,
        site: &SiteId,
        key: &str,
    ) -> Result<(), StoreError> {
        let path = self.env_path(account, site)?;
        if !path.exists() {
            return Ok(());
        }
        let mut vars = self.load_env(&path)?;
        let before = vars.len();
        remove_key(&mut vars, key);
        if vars.len() == before {
            return Ok(());
        }
        write_yaml_atomic(&path, &vars)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Serialize, write a uniquely named `.<file>.*.tmp` sibling (mode 0600),
/// then rename it over `path`. Concurrent writers never share a temp file, so
/// each rename publishes one complete document and the last one wins.
pub(crate) fn write_yaml_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let yaml = serde_yaml::to_string(value)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{file_name}."))
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|e| io_err(parent, e))?;
    tmp.write_all(yaml.as_bytes())
        .map_err(|e| io_err(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| io_err(tmp.path(), e))?;
    set_file_permissions(tmp.path())?;
    // A failed persist drops the temp file, which removes it.
    tmp.persist(path).map_err(|e| io_err(path, e.error))?;
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    if dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    set_dir_permissions(dir)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
