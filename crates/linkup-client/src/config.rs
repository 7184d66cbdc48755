//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client runs against a local
//! development server with no configuration at all.

use std::path::PathBuf;
use std::time::Duration;

use linkup_shared::constants::{DEFAULT_API_URL, POLL_INTERVAL_SECS, REQUEST_TIMEOUT_SECS};

/// Client configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Root of the REST API, without a trailing slash.
    /// Env: `LINKUP_API_URL`
    /// Default: `http://localhost:8000/api`
    pub api_url: String,

    /// Period of the chat room poll.
    /// Env: `LINKUP_POLL_INTERVAL_SECS`
    /// Default: `5`
    pub poll_interval: Duration,

    /// Per-request timeout.
    /// Env: `LINKUP_REQUEST_TIMEOUT_SECS`
    /// Default: `30`
    pub request_timeout: Duration,

    /// Where the session tokens are stored.
    /// Env: `LINKUP_SESSION_PATH`
    /// Default: platform data directory.
    pub session_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            session_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("LINKUP_API_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.is_empty() {
                tracing::warn!("Empty LINKUP_API_URL, using default");
            } else {
                config.api_url = url.to_string();
            }
        }

        if let Some(val) = lookup("LINKUP_POLL_INTERVAL_SECS") {
            match parse_secs(&val) {
                Some(secs) => config.poll_interval = Duration::from_secs(secs),
                None => tracing::warn!(value = %val, "Invalid LINKUP_POLL_INTERVAL_SECS, using default"),
            }
        }

        if let Some(val) = lookup("LINKUP_REQUEST_TIMEOUT_SECS") {
            match parse_secs(&val) {
                Some(secs) => config.request_timeout = Duration::from_secs(secs),
                None => tracing::warn!(value = %val, "Invalid LINKUP_REQUEST_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(path) = lookup("LINKUP_SESSION_PATH") {
            if !path.trim().is_empty() {
                config.session_path = Some(PathBuf::from(path));
            }
        }

        config
    }
}

/// Positive whole number of seconds.
fn parse_secs(raw: &str) -> Option<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}
