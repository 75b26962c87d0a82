//! Feature-flag lookup.
//!
//! The build event handler and both function bundles are gated on one
//! environment variable. Handlers receive a [`FlagLookup`] instead of reading
//! process state directly, and they query it on every invocation.

use std::collections::HashMap;

/// Environment variable that enables the build event handler for a site.
pub const BUILD_EVENT_HANDLER_ENABLED_ENV_VAR: &str = "EXTENSIONPRODUCE0_ENABLED";

/// Key/value capability lookup.
pub trait FlagLookup {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Variables of the current process (the platform injects site variables
/// into the build environment).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl FlagLookup for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl FlagLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<T: FlagLookup + ?Sized> FlagLookup for &T {
    fn lookup(&self, key: &str) -> Option<String> {
        (**self).lookup(key)
    }
}

/// `true` when `key` is set to a non-empty value. `"false"` and `"0"` still
/// count as set.
pub fn flag_is_set(flags: &dyn FlagLookup, key: &str) -> bool {
    flags.lookup(key).is_some_and(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_value_is_unset() {
        let mut flags = HashMap::new();
        assert!(!flag_is_set(&flags, BUILD_EVENT_HANDLER_ENABLED_ENV_VAR));

        flags.insert(BUILD_EVENT_HANDLER_ENABLED_ENV_VAR.to_string(), String::new());
        assert!(!flag_is_set(&flags, BUILD_EVENT_HANDLER_ENABLED_ENV_VAR));

        flags.insert(BUILD_EVENT_HANDLER_ENABLED_ENV_VAR.to_string(), "false".into());
        assert!(flag_is_set(&flags, BUILD_EVENT_HANDLER_ENABLED_ENV_VAR));
    }

    #[test]
    fn process_env_reads_current_environment() {
        let key = "PRODUCE_FLAG_TEST_UNSET_VARIABLE";
        assert!(!flag_is_set(&ProcessEnv, key));
    }
}
