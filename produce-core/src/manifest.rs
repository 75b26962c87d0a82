//! Extension manifest: the registration values the host reads at load time.
//!
//! Stored at `<home>/.produce/extension.yaml`. A missing file means
//! [`ExtensionManifest::default`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::flag::BUILD_EVENT_HANDLER_ENABLED_ENV_VAR;
use crate::store::local::write_yaml_atomic;
use crate::store::produce_root;

pub const MANIFEST_FILE: &str = "extension.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionManifest {
    pub name: String,
    #[serde(default)]
    pub connector: ConnectorManifest,
    #[serde(default = "FunctionsManifest::edge_default")]
    pub edge_functions: FunctionsManifest,
    #[serde(default = "FunctionsManifest::serverless_default")]
    pub functions: FunctionsManifest,
    #[serde(default = "default_flag_key")]
    pub flag_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorManifest {
    /// Prepended to every model name in the public schema (`ExampleUser`).
    pub type_prefix: String,
    #[serde(default)]
    pub supports: ConnectorSupports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorSupports {
    pub connect: bool,
    pub visual_editor: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionsManifest {
    /// Source directory, relative to the extension root.
    pub directory: PathBuf,
    /// Prefix applied to every injected function name.
    pub prefix: String,
}

impl Default for ExtensionManifest {
    fn default() -> Self {
        Self {
            name: "produce".to_string(),
            connector: ConnectorManifest::default(),
            edge_functions: FunctionsManifest::edge_default(),
            functions: FunctionsManifest::serverless_default(),
            flag_key: default_flag_key(),
        }
    }
}

impl Default for ConnectorManifest {
    fn default() -> Self {
        Self {
            type_prefix: "Example".to_string(),
            supports: ConnectorSupports::default(),
        }
    }
}

impl Default for ConnectorSupports {
    fn default() -> Self {
        Self {
            connect: true,
            visual_editor: true,
        }
    }
}

impl FunctionsManifest {
    fn edge_default() -> Self {
        Self {
            directory: PathBuf::from("src/edge-functions"),
            prefix: "ef_prefix".to_string(),
        }
    }

    fn serverless_default() -> Self {
        Self {
            directory: PathBuf::from("src/functions"),
            prefix: "my_unique_prefix".to_string(),
        }
    }
}

fn default_flag_key() -> String {
    BUILD_EVENT_HANDLER_ENABLED_ENV_VAR.to_string()
}

impl ExtensionManifest {
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.trim().is_empty() {
            return Err(StoreError::InvalidManifest("name must not be empty".into()));
        }
        let prefix = &self.connector.type_prefix;
        if !prefix.starts_with(|c: char| c.is_ascii_uppercase())
            || !prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(StoreError::InvalidManifest(format!(
                "type prefix '{prefix}' must start with an uppercase letter and be alphanumeric"
            )));
        }
        for (what, value) in [
            ("edge function prefix", &self.edge_functions.prefix),
            ("function prefix", &self.functions.prefix),
            ("flag key", &self.flag_key),
        ] {
            if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(StoreError::InvalidManifest(format!(
                    "{what} '{value}' must be non-empty and contain only [A-Za-z0-9_]"
                )));
            }
        }
        Ok(())
    }
}

/// `<home>/.produce/extension.yaml`. Pure, no I/O.
pub fn manifest_path_at(home: &Path) -> PathBuf {
    produce_root(home).join(MANIFEST_FILE)
}

/// Load and validate the manifest, falling back to the default when absent.
pub fn load_at(home: &Path) -> Result<ExtensionManifest, StoreError> {
    let path = manifest_path_at(home);
    if !path.exists() {
        return Ok(ExtensionManifest::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| StoreError::Io {
        path: path.clone(),
        source: e,
    })?;
    let manifest: ExtensionManifest = serde_yaml::from_str(&contents)
        .map_err(|e| StoreError::Parse { path, source: e })?;
    manifest.validate()?;
    Ok(manifest)
}

/// Write the default manifest unless one exists. Returns the manifest in
/// effect and whether the file was created.
pub fn init_at(home: &Path) -> Result<(ExtensionManifest, bool), StoreError> {
    let path = manifest_path_at(home);
    if path.exists() {
        return Ok((load_at(home)?, false));
    }
    let manifest = ExtensionManifest::default();
    write_yaml_atomic(&path, &manifest)?;
    Ok((manifest, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_manifest_is_default() {
        let home = TempDir::new().expect("tempdir");
        let manifest = load_at(home.path()).expect("load");
        assert_eq!(manifest, ExtensionManifest::default());
        assert_eq!(manifest.connector.type_prefix, "Example");
        assert_eq!(manifest.edge_functions.prefix, "ef_prefix");
        assert_eq!(manifest.functions.prefix, "my_unique_prefix");
        assert_eq!(manifest.flag_key, "EXTENSIONPRODUCE0_ENABLED");
    }

    #[test]
    fn init_is_idempotent() {
        let home = TempDir::new().expect("tempdir");
        let (_, created) = init_at(home.path()).expect("first init");
        assert!(created);
        let (manifest, created) = init_at(home.path()).expect("second init");
        assert!(!created);
        assert_eq!(manifest, ExtensionManifest::default());
    }

    #[test]
    fn partial_manifest_fills_defaults() {
        let home = TempDir::new().expect("tempdir");
        let path = manifest_path_at(home.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "name: blog\nconnector:\n  type_prefix: Blog\n").unwrap();

        let manifest = load_at(home.path()).expect("load");
        assert_eq!(manifest.name, "blog");
        assert_eq!(manifest.connector.type_prefix, "Blog");
        assert!(manifest.connector.supports.visual_editor);
        assert_eq!(manifest.functions.directory, PathBuf::from("src/functions"));
    }

    #[test]
    fn lowercase_type_prefix_is_rejected() {
        let mut manifest = ExtensionManifest::default();
        manifest.connector.type_prefix = "example".into();
        assert!(matches!(
            manifest.validate(),
            Err(StoreError::InvalidManifest(_))
        ));
    }

    #[test]
    fn prefix_with_dash_is_rejected() {
        let mut manifest = ExtensionManifest::default();
        manifest.edge_functions.prefix = "ef-prefix".into();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("edge function prefix"));
    }
}
