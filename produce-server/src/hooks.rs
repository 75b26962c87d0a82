//! Host hook handlers.
//!
//! The host calls these at build time and when deciding which function
//! bundles to inject. Each one reads the flag through the [`FlagLookup`] it
//! is handed, at call time, so a flag flipped between builds takes effect on
//! the next call. An unset flag means "do nothing"; handlers never fail.

use serde::Serialize;

use produce_core::types::{SiteId, TeamId, CONTEXT_ALL};
use produce_core::{flag_is_set, FlagLookup, PlatformClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HookOutcome {
    Skipped,
    Completed,
}

/// What a handler gets to see.
pub struct HookContext<'a> {
    pub flags: &'a dyn FlagLookup,
    pub flag_key: &'a str,
}

impl HookContext<'_> {
    pub fn enabled(&self) -> bool {
        flag_is_set(self.flags, self.flag_key)
    }
}

pub type BuildEventHandler = fn(&HookContext<'_>) -> HookOutcome;
pub type InjectionPredicate = fn(&HookContext<'_>) -> bool;

pub fn on_pre_build(ctx: &HookContext<'_>) -> HookOutcome {
    if !ctx.enabled() {
        return HookOutcome::Skipped;
    }
    tracing::info!("Hello there.");
    HookOutcome::Completed
}

pub fn should_inject_edge_function(ctx: &HookContext<'_>) -> bool {
    ctx.enabled()
}

pub fn should_inject_function(ctx: &HookContext<'_>) -> bool {
    ctx.enabled()
}

/// Site variables read live from the platform, `all` context only.
pub struct SiteFlags<'a> {
    client: &'a dyn PlatformClient,
    team: TeamId,
    site: SiteId,
}

impl<'a> SiteFlags<'a> {
    pub fn new(client: &'a dyn PlatformClient, team: TeamId, site: SiteId) -> Self {
        Self { client, team, site }
    }
}

impl FlagLookup for SiteFlags<'_> {
    fn lookup(&self, key: &str) -> Option<String> {
        match self.client.get_environment_variables(&self.team, &self.site) {
            Ok(vars) => vars
                .into_iter()
                .find(|v| v.key == key)
                .and_then(|v| v.value_for(CONTEXT_ALL).map(|e| e.value.clone())),
            Err(err) => {
                tracing::warn!(
                    team_id = %self.team,
                    site_id = %self.site,
                    error = %err,
                    "failed to read site variables; treating flag as unset",
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use produce_core::{MemoryPlatform, BUILD_EVENT_HANDLER_ENABLED_ENV_VAR};

    fn flags(value: Option<&str>) -> HashMap<String, String> {
        value
            .map(|v| (BUILD_EVENT_HANDLER_ENABLED_ENV_VAR.to_string(), v.to_string()))
            .into_iter()
            .collect()
    }

    #[test]
    fn pre_build_skips_without_flag() {
        let flags = flags(None);
        let ctx = HookContext {
            flags: &flags,
            flag_key: BUILD_EVENT_HANDLER_ENABLED_ENV_VAR,
        };
        assert_eq!(on_pre_build(&ctx), HookOutcome::Skipped);
        assert!(!should_inject_edge_function(&ctx));
        assert!(!should_inject_function(&ctx));
    }

    #[test]
    fn pre_build_runs_with_flag() {
        let flags = flags(Some("true"));
        let ctx = HookContext {
            flags: &flags,
            flag_key: BUILD_EVENT_HANDLER_ENABLED_ENV_VAR,
        };
        assert_eq!(on_pre_build(&ctx), HookOutcome::Completed);
        assert!(should_inject_edge_function(&ctx));
        assert!(should_inject_function(&ctx));
    }

    #[test]
    fn site_flags_reads_all_context_and_degrades_on_error() {
        let store = MemoryPlatform::new();
        let (team, site) = (TeamId::from("t"), SiteId::from("s"));
        store
            .create_or_update_variable(&team, &site, "K", "v")
            .expect("set");

        let site_flags = SiteFlags::new(&store, team, site);
        assert_eq!(site_flags.lookup("K").as_deref(), Some("v"));
        assert_eq!(site_flags.lookup("MISSING"), None);

        store.set_fail_reads(true);
        assert_eq!(site_flags.lookup("K"), None);
    }
}
