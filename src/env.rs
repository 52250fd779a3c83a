// OpenSoul Gate - Environment Snapshot
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Read-only view of environment variables handed to path resolution.
// Captured once at the process edge; resolvers never call std::env.

use std::collections::BTreeMap;

/// State directory override
pub const STATE_DIR_ENV: &str = "OPENSOUL_STATE_DIR";
/// Config file override
pub const CONFIG_PATH_ENV: &str = "OPENSOUL_CONFIG_PATH";
/// OAuth credential directory override
pub const OAUTH_DIR_ENV: &str = "OPENSOUL_OAUTH_DIR";
/// Named profile
pub const PROFILE_ENV: &str = "OPENSOUL_PROFILE";
/// Explicit home directory, takes precedence over HOME/USERPROFILE
pub const HOME_ENV: &str = "OPENSOUL_HOME";
/// Gateway listen port override
pub const GATEWAY_PORT_ENV: &str = "OPENSOUL_GATEWAY_PORT";

/// Environment variable snapshot.
///
/// `get` trims values and treats empty or whitespace-only values as unset,
/// which is how every OpenSoul override variable is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment. Non-UTF-8 entries are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    /// Trimmed value, `None` when unset or blank
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Untrimmed value exactly as captured
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Set `name` only when it is currently unset or blank. Returns true if written.
    pub fn set_default(&mut self, name: &str, value: impl Into<String>) -> bool {
        if self.is_set(name) {
            return false;
        }
        self.vars.insert(name.to_string(), value.into());
        true
    }
}

impl<K, V> FromIterator<(K, V)> for EnvSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
