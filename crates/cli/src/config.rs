//! Environment-derived configuration for the CLI.

use std::env;

/// Values the CLI reads from the environment; command-line flags take
/// precedence over all of them.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// `TAGFORGE_ACCOUNT_ID`
    pub account_id: Option<String>,
    /// `TAGFORGE_CONTAINER_ID`
    pub container_id: Option<String>,
    /// `TAGFORGE_WORKSPACE_PREFIX`, defaulting to `AutoGen`
    pub workspace_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            account_id: non_empty_env("TAGFORGE_ACCOUNT_ID"),
            container_id: non_empty_env("TAGFORGE_CONTAINER_ID"),
            workspace_prefix: non_empty_env("TAGFORGE_WORKSPACE_PREFIX").unwrap_or_else(|| "AutoGen".to_string()),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}
