//! Settings router.
//!
//! | Path                        | Input          | Output                     |
//! |-----------------------------|----------------|----------------------------|
//! | `teamSettings.query`        | none           | `TeamSettings` or `null`   |
//! | `teamSettings.mutate`       | `TeamSettings` | `null`                     |
//! | `buildEventHandler.status`  | none           | `{ "enabled": bool }`      |
//! | `buildEventHandler.enable`  | none           | `{ "success", "message" }` |
//! | `buildEventHandler.disable` | none           | `{ "success", "message" }` |
//!
//! Context checks happen before any platform call. Stored settings that fail
//! the schema read as `None`; writes never swallow a platform failure.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use produce_core::settings::merge_shallow;
use produce_core::types::{RequestContext, SiteId, TeamId, CONTEXT_ALL};
use produce_core::{
    PlatformClient, SchemaError, StoreError, TeamSettings, BUILD_EVENT_HANDLER_ENABLED_ENV_VAR,
};

use crate::error::RouterError;

const TEAM_REQUIRED: &str = "teamId is required";
const TEAM_AND_SITE_REQUIRED: &str = "Both teamId and siteId are required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOutput {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub success: bool,
    pub message: String,
}

/// Addressable procedures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    TeamSettingsQuery,
    TeamSettingsMutate,
    BuildEventHandlerStatus,
    BuildEventHandlerEnable,
    BuildEventHandlerDisable,
}

impl Procedure {
    pub fn all() -> &'static [Procedure] {
        &[
            Procedure::TeamSettingsQuery,
            Procedure::TeamSettingsMutate,
            Procedure::BuildEventHandlerStatus,
            Procedure::BuildEventHandlerEnable,
            Procedure::BuildEventHandlerDisable,
        ]
    }

    pub fn path(&self) -> &'static str {
        match self {
            Procedure::TeamSettingsQuery => "teamSettings.query",
            Procedure::TeamSettingsMutate => "teamSettings.mutate",
            Procedure::BuildEventHandlerStatus => "buildEventHandler.status",
            Procedure::BuildEventHandlerEnable => "buildEventHandler.enable",
            Procedure::BuildEventHandlerDisable => "buildEventHandler.disable",
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Procedure {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Procedure::all()
            .iter()
            .copied()
            .find(|p| p.path() == s)
            .ok_or_else(|| RouterError::NotFound {
                path: s.to_string(),
            })
    }
}

pub struct AppRouter {
    client: Arc<dyn PlatformClient>,
    flag_key: String,
}

impl AppRouter {
    pub fn new(client: Arc<dyn PlatformClient>) -> Self {
        Self {
            client,
            flag_key: BUILD_EVENT_HANDLER_ENABLED_ENV_VAR.to_string(),
        }
    }

    /// Gate on a different environment variable.
    pub fn with_flag_key(mut self, key: impl Into<String>) -> Self {
        self.flag_key = key.into();
        self
    }

    pub fn flag_key(&self) -> &str {
        &self.flag_key
    }

    // -----------------------------------------------------------------------
    // teamSettings
    // -----------------------------------------------------------------------

    pub fn team_settings_query(
        &self,
        ctx: &RequestContext,
    ) -> Result<Option<TeamSettings>, RouterError> {
        let team = ctx.team().ok_or_else(|| RouterError::bad_request(TEAM_REQUIRED))?;

        let stored = self
            .client
            .get_team_configuration(team)
            .map_err(|e| RouterError::internal("Failed to load team configuration", e))?;
        let Some(stored) = stored else {
            return Ok(None);
        };

        match TeamSettings::parse(&stored.config) {
            Ok(settings) => Ok(Some(settings)),
            Err(err) => {
                let issues = serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string());
                tracing::warn!(team_id = %team, issues = %issues, "failed to parse team settings");
                Ok(None)
            }
        }
    }

    pub fn team_settings_mutate(
        &self,
        ctx: &RequestContext,
        input: &TeamSettings,
    ) -> Result<(), RouterError> {
        let team = ctx.team().ok_or_else(|| RouterError::bad_request(TEAM_REQUIRED))?;
        // Typed callers skip `dispatch`, so the schema is enforced here too.
        TeamSettings::parse(&input.to_value()).map_err(invalid_input)?;

        self.save_settings(team, input)
            .map_err(|e| RouterError::internal("Failed to save team configuration", e))
    }

    fn save_settings(&self, team: &TeamId, input: &TeamSettings) -> Result<(), StoreError> {
        match self.client.get_team_configuration(team)? {
            None => {
                self.client.create_team_configuration(team, input.to_value())?;
            }
            Some(existing) => {
                let merged = merge_shallow(&existing.config, input);
                self.client.update_team_configuration(team, merged)?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // buildEventHandler
    // -----------------------------------------------------------------------

    pub fn build_event_handler_status(
        &self,
        ctx: &RequestContext,
    ) -> Result<StatusOutput, RouterError> {
        let (team, site) = require_team_and_site(ctx)?;

        let vars = self
            .client
            .get_environment_variables(team, site)
            .map_err(|e| RouterError::internal("Failed to read environment variables", e))?;

        let enabled = vars
            .iter()
            .find(|v| v.key == self.flag_key)
            .and_then(|v| v.value_for(CONTEXT_ALL))
            .is_some();
        Ok(StatusOutput { enabled })
    }

    pub fn build_event_handler_enable(
        &self,
        ctx: &RequestContext,
    ) -> Result<Acknowledgement, RouterError> {
        let (team, site) = require_team_and_site(ctx)?;

        match self
            .client
            .create_or_update_variable(team, site, &self.flag_key, "true")
        {
            Ok(()) => {
                tracing::info!(team_id = %team, site_id = %site, "build event handler enabled");
                Ok(Acknowledgement {
                    success: true,
                    message: "Build event handler enabled successfully".to_string(),
                })
            }
            Err(err) => {
                tracing::error!(
                    team_id = %team,
                    site_id = %site,
                    error = %err,
                    "failed to enable build event handler",
                );
                Err(RouterError::internal("Failed to enable build event handler", err))
            }
        }
    }

    pub fn build_event_handler_disable(
        &self,
        ctx: &RequestContext,
    ) -> Result<Acknowledgement, RouterError> {
        let (team, site) = require_team_and_site(ctx)?;

        match self
            .client
            .delete_environment_variable(team, site, &self.flag_key)
        {
            Ok(()) => {
                tracing::info!(team_id = %team, site_id = %site, "build event handler disabled");
                Ok(Acknowledgement {
                    success: true,
                    message: "Build event handler disabled successfully".to_string(),
                })
            }
            Err(err) => {
                tracing::error!(
                    team_id = %team,
                    site_id = %site,
                    error = %err,
                    "failed to disable build event handler",
                );
                Err(RouterError::internal("Failed to disable build event handler", err))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Route a JSON call to its procedure. `input` is ignored by procedures
    /// that take none.
    pub fn dispatch(
        &self,
        path: &str,
        ctx: &RequestContext,
        input: &Value,
    ) -> Result<Value, RouterError> {
        let procedure: Procedure = path.parse()?;
        let output = match procedure {
            Procedure::TeamSettingsQuery => to_json(self.team_settings_query(ctx)?),
            Procedure::TeamSettingsMutate => {
                let input = TeamSettings::parse(input).map_err(invalid_input)?;
                self.team_settings_mutate(ctx, &input)?;
                Value::Null
            }
            Procedure::BuildEventHandlerStatus => to_json(self.build_event_handler_status(ctx)?),
            Procedure::BuildEventHandlerEnable => to_json(self.build_event_handler_enable(ctx)?),
            Procedure::BuildEventHandlerDisable => {
                to_json(self.build_event_handler_disable(ctx)?)
            }
        };
        Ok(output)
    }
}

fn require_team_and_site(ctx: &RequestContext) -> Result<(&TeamId, &SiteId), RouterError> {
    ctx.team_and_site()
        .ok_or_else(|| RouterError::bad_request(TEAM_AND_SITE_REQUIRED))
}

fn invalid_input(e: SchemaError) -> RouterError {
    RouterError::bad_request(format!("invalid input: {e}"))
}

fn to_json<T: Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use produce_core::MemoryPlatform;
    use serde_json::json;

    fn router() -> (Arc<MemoryPlatform>, AppRouter) {
        let store = Arc::new(MemoryPlatform::new());
        let router = AppRouter::new(store.clone());
        (store, router)
    }

    fn ctx(team: Option<&str>, site: Option<&str>) -> RequestContext {
        RequestContext::new(team.map(TeamId::from), site.map(SiteId::from))
    }

    #[test]
    fn procedure_paths_roundtrip() {
        for p in Procedure::all() {
            assert_eq!(p.path().parse::<Procedure>().expect("parse"), *p);
        }
        assert!(matches!(
            "teamSettings.delete".parse::<Procedure>(),
            Err(RouterError::NotFound { .. })
        ));
    }

    #[test]
    fn dispatch_rejects_invalid_mutate_input() {
        let (store, router) = router();
        let err = router
            .dispatch(
                "teamSettings.mutate",
                &ctx(Some("t"), None),
                &json!({ "exampleString": "" }),
            )
            .unwrap_err();
        assert!(matches!(err, RouterError::BadRequest { .. }));
        assert!(err.to_string().starts_with("invalid input"));
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn dispatch_query_without_settings_is_null() {
        let (_store, router) = router();
        let out = router
            .dispatch("teamSettings.query", &ctx(Some("t"), None), &Value::Null)
            .expect("query");
        assert_eq!(out, Value::Null);
    }

    #[test]
    fn dispatch_status_shape() {
        let (_store, router) = router();
        let out = router
            .dispatch(
                "buildEventHandler.status",
                &ctx(Some("t"), Some("s")),
                &Value::Null,
            )
            .expect("status");
        assert_eq!(out, json!({ "enabled": false }));
    }

    #[test]
    fn custom_flag_key_is_honored() {
        let store = Arc::new(MemoryPlatform::new());
        let router = AppRouter::new(store.clone()).with_flag_key("OTHER_FLAG");
        let c = ctx(Some("t"), Some("s"));
        router.build_event_handler_enable(&c).expect("enable");
        let vars = store
            .get_environment_variables(&TeamId::from("t"), &SiteId::from("s"))
            .expect("vars");
        assert_eq!(vars[0].key, "OTHER_FLAG");
    }
}
