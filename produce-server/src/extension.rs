//! Registration table.
//!
//! [`registrations`] spells out everything the extension hands the host:
//! connector models and sync, build event handlers and function bundles.
//! Nothing registers itself as a side effect of loading a module.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use produce_connector::model::{self, ModelDefinition, ModelKind};
use produce_connector::{sync, ConnectorError, SyncMode, SyncReport};
use produce_core::{ExtensionManifest, FlagLookup, ModelStore};

use crate::hooks::{
    on_pre_build, should_inject_edge_function, should_inject_function, BuildEventHandler,
    HookContext, HookOutcome, InjectionPredicate,
};

/// Build lifecycle events a handler can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildEvent {
    OnPreBuild,
    OnBuild,
    OnPostBuild,
    OnSuccess,
    OnError,
    OnEnd,
}

impl BuildEvent {
    pub fn all() -> &'static [BuildEvent] {
        &[
            BuildEvent::OnPreBuild,
            BuildEvent::OnBuild,
            BuildEvent::OnPostBuild,
            BuildEvent::OnSuccess,
            BuildEvent::OnError,
            BuildEvent::OnEnd,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildEvent::OnPreBuild => "onPreBuild",
            BuildEvent::OnBuild => "onBuild",
            BuildEvent::OnPostBuild => "onPostBuild",
            BuildEvent::OnSuccess => "onSuccess",
            BuildEvent::OnError => "onError",
            BuildEvent::OnEnd => "onEnd",
        }
    }
}

impl fmt::Display for BuildEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildEvent::all()
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = BuildEvent::all().iter().map(|e| e.as_str()).collect();
                format!("unknown build event '{s}'; expected one of: {}", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    Edge,
    Serverless,
}

/// A directory of functions the host injects into a site's deploy when the
/// predicate says so.
#[derive(Clone)]
pub struct FunctionBundle {
    pub kind: FunctionKind,
    pub directory: PathBuf,
    pub prefix: String,
    should_inject: InjectionPredicate,
}

impl fmt::Debug for FunctionBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionBundle")
            .field("kind", &self.kind)
            .field("directory", &self.directory)
            .field("prefix", &self.prefix)
            .finish()
    }
}

pub struct Extension {
    manifest: ExtensionManifest,
    models: Vec<ModelDefinition>,
    build_event_handlers: Vec<(BuildEvent, BuildEventHandler)>,
    function_bundles: Vec<FunctionBundle>,
}

impl Extension {
    /// An empty table: models declared, nothing else registered.
    pub fn new(manifest: ExtensionManifest) -> Self {
        Self {
            manifest,
            models: model::definitions(),
            build_event_handlers: Vec::new(),
            function_bundles: Vec::new(),
        }
    }

    pub fn add_build_event_handler(
        &mut self,
        event: BuildEvent,
        handler: BuildEventHandler,
    ) -> &mut Self {
        self.build_event_handlers.push((event, handler));
        self
    }

    pub fn add_edge_functions(
        &mut self,
        directory: impl AsRef<Path>,
        prefix: impl Into<String>,
        should_inject: InjectionPredicate,
    ) -> &mut Self {
        self.add_bundle(FunctionKind::Edge, directory, prefix, should_inject)
    }

    pub fn add_functions(
        &mut self,
        directory: impl AsRef<Path>,
        prefix: impl Into<String>,
        should_inject: InjectionPredicate,
    ) -> &mut Self {
        self.add_bundle(FunctionKind::Serverless, directory, prefix, should_inject)
    }

    fn add_bundle(
        &mut self,
        kind: FunctionKind,
        directory: impl AsRef<Path>,
        prefix: impl Into<String>,
        should_inject: InjectionPredicate,
    ) -> &mut Self {
        self.function_bundles.push(FunctionBundle {
            kind,
            directory: directory.as_ref().to_path_buf(),
            prefix: prefix.into(),
            should_inject,
        });
        self
    }

    pub fn manifest(&self) -> &ExtensionManifest {
        &self.manifest
    }

    pub fn models(&self) -> &[ModelDefinition] {
        &self.models
    }

    /// Public names of the connector's document types (`ExampleUser`, …).
    pub fn document_types(&self) -> Vec<String> {
        self.models
            .iter()
            .filter(|m| m.kind == ModelKind::Document)
            .map(|m| model::type_name(&self.manifest.connector.type_prefix, m.name))
            .collect()
    }

    pub fn function_bundles(&self) -> &[FunctionBundle] {
        &self.function_bundles
    }

    pub fn handler_count(&self, event: BuildEvent) -> usize {
        self.build_event_handlers
            .iter()
            .filter(|(e, _)| *e == event)
            .count()
    }

    /// Connector sync entry point.
    pub fn sync(
        &self,
        store: &dyn ModelStore,
        is_initial_sync: bool,
        now: DateTime<Utc>,
    ) -> Result<SyncReport, ConnectorError> {
        sync::run(store, SyncMode::from(is_initial_sync), now)
    }

    /// Run every handler registered for `event`, in registration order.
    pub fn run_build_event(&self, event: BuildEvent, flags: &dyn FlagLookup) -> Vec<HookOutcome> {
        let ctx = self.hook_context(flags);
        self.build_event_handlers
            .iter()
            .filter(|(e, _)| *e == event)
            .map(|(_, handler)| handler(&ctx))
            .collect()
    }

    /// Bundles whose predicate holds right now.
    pub fn functions_to_inject(&self, flags: &dyn FlagLookup) -> Vec<&FunctionBundle> {
        let ctx = self.hook_context(flags);
        self.function_bundles
            .iter()
            .filter(|b| (b.should_inject)(&ctx))
            .collect()
    }

    fn hook_context<'a>(&'a self, flags: &'a dyn FlagLookup) -> HookContext<'a> {
        HookContext {
            flags,
            flag_key: &self.manifest.flag_key,
        }
    }
}

/// This extension's registrations.
pub fn registrations(manifest: ExtensionManifest) -> Extension {
    let edge = manifest.edge_functions.clone();
    let functions = manifest.functions.clone();

    let mut extension = Extension::new(manifest);
    extension
        .add_build_event_handler(BuildEvent::OnPreBuild, on_pre_build)
        .add_edge_functions(edge.directory, edge.prefix, should_inject_edge_function)
        .add_functions(functions.directory, functions.prefix, should_inject_function);
    extension
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use produce_core::BUILD_EVENT_HANDLER_ENABLED_ENV_VAR;

    fn enabled() -> HashMap<String, String> {
        [(BUILD_EVENT_HANDLER_ENABLED_ENV_VAR.to_string(), "true".to_string())]
            .into_iter()
            .collect()
    }

    #[test]
    fn table_matches_manifest() {
        let ext = registrations(ExtensionManifest::default());
        assert_eq!(ext.handler_count(BuildEvent::OnPreBuild), 1);
        assert_eq!(ext.handler_count(BuildEvent::OnBuild), 0);

        let bundles = ext.function_bundles();
        assert_eq!(bundles.len(), 2);
        assert_eq!(bundles[0].kind, FunctionKind::Edge);
        assert_eq!(bundles[0].prefix, "ef_prefix");
        assert_eq!(bundles[0].directory, PathBuf::from("src/edge-functions"));
        assert_eq!(bundles[1].kind, FunctionKind::Serverless);
        assert_eq!(bundles[1].prefix, "my_unique_prefix");

        assert_eq!(ext.document_types(), vec!["ExampleUser", "ExamplePost"]);
        let names: Vec<_> = ext.models().iter().map(|m| m.name).collect();
        assert_eq!(names, ["User", "Post", "Blocks"]);
    }

    #[test]
    fn events_without_handlers_run_nothing() {
        let ext = registrations(ExtensionManifest::default());
        assert!(ext.run_build_event(BuildEvent::OnEnd, &enabled()).is_empty());
    }

    #[test]
    fn injection_follows_flag() {
        let ext = registrations(ExtensionManifest::default());
        assert!(ext.functions_to_inject(&HashMap::new()).is_empty());
        assert_eq!(ext.functions_to_inject(&enabled()).len(), 2);
    }

    #[test]
    fn manifest_flag_key_gates_handlers() {
        let mut manifest = ExtensionManifest::default();
        manifest.flag_key = "CUSTOM_FLAG".into();
        let ext = registrations(manifest);

        assert_eq!(
            ext.run_build_event(BuildEvent::OnPreBuild, &enabled()),
            vec![HookOutcome::Skipped]
        );
        let custom: HashMap<String, String> =
            [("CUSTOM_FLAG".to_string(), "1".to_string())].into_iter().collect();
        assert_eq!(
            ext.run_build_event(BuildEvent::OnPreBuild, &custom),
            vec![HookOutcome::Completed]
        );
    }

    #[test]
    fn build_event_parses_case_insensitively() {
        assert_eq!("onprebuild".parse::<BuildEvent>(), Ok(BuildEvent::OnPreBuild));
        assert!("onDeploy".parse::<BuildEvent>().is_err());
    }
}
