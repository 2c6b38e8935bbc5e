//! Runtime configuration.
//!
//! Values come from the environment (a `.env` file is honoured), falling
//! back to defaults. Unparsable numbers are ignored with a warning.

use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

/// Default player API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.balldontlie.io/v1";

/// Default number of players per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Default HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page fetcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    pub base_url: String,
    /// Sent verbatim as the `Authorization` header when present
    pub api_key: Option<String>,
    pub per_page: u32,
    pub timeout: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            per_page: DEFAULT_PAGE_SIZE,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl FetcherConfig {
    /// Read `ROSTER_API_BASE_URL`, `ROSTER_API_KEY`, `ROSTER_PAGE_SIZE` and
    /// `ROSTER_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("ROSTER_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            api_key: lookup("ROSTER_API_KEY").filter(|key| !key.trim().is_empty()),
            per_page: parse_var(&lookup, "ROSTER_PAGE_SIZE")
                .filter(|&n: &u32| n > 0)
                .unwrap_or(defaults.per_page),
            timeout: parse_var(&lookup, "ROSTER_HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// Snapshot storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl StorageConfig {
    /// Read `ROSTER_STORAGE_PATH`, else use the platform config directory.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup("ROSTER_STORAGE_PATH").filter(|p| !p.trim().is_empty()) {
            Some(path) => Self {
                path: PathBuf::from(path),
            },
            None => Self::default(),
        }
    }
}

/// `<config dir>/roster.json`, e.g. `~/.config/roster-state/roster.json` on Linux.
fn default_storage_path() -> PathBuf {
    match ProjectDirs::from("io", "roster", "roster-state") {
        Some(dirs) => dirs.config_dir().join("roster.json"),
        None => PathBuf::from("roster_state.json"),
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparsable config value");
            None
        }
    }
}
