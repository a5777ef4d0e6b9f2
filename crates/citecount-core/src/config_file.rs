use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api: Option<ApiConfig>,
    pub pacing: Option<PacingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PacingConfig {
    pub min_interval_ms: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub retry_rate_limited: Option<bool>,
}

/// Platform config directory path: `<config_dir>/citecount/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("citecount").join("config.toml"))
}

/// Load config by cascading CWD `.citecount.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(&PathBuf::from(".citecount.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &PathBuf) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        api: Some(ApiConfig {
            api_key: overlay
                .api
                .as_ref()
                .and_then(|a| a.api_key.clone())
                .or_else(|| base.api.as_ref().and_then(|a| a.api_key.clone())),
            base_url: overlay
                .api
                .as_ref()
                .and_then(|a| a.base_url.clone())
                .or_else(|| base.api.as_ref().and_then(|a| a.base_url.clone())),
        }),
        pacing: Some(PacingConfig {
            min_interval_ms: overlay
                .pacing
                .as_ref()
                .and_then(|p| p.min_interval_ms)
                .or_else(|| base.pacing.as_ref().and_then(|p| p.min_interval_ms)),
            request_timeout_secs: overlay
                .pacing
                .as_ref()
                .and_then(|p| p.request_timeout_secs)
                .or_else(|| base.pacing.as_ref().and_then(|p| p.request_timeout_secs)),
            retry_rate_limited: overlay
                .pacing
                .as_ref()
                .and_then(|p| p.retry_rate_limited)
                .or_else(|| base.pacing.as_ref().and_then(|p| p.retry_rate_limited)),
        }),
    }
}

impl ConfigFile {
    /// Fill a runtime [`Config`], applying defaults for anything unset.
    pub fn into_config(self) -> Config {
        let defaults = Config::default();
        Config {
            api_key: self.api.as_ref().and_then(|a| a.api_key.clone()),
            base_url: self
                .api
                .as_ref()
                .and_then(|a| a.base_url.clone())
                .unwrap_or(defaults.base_url),
            request_timeout: self
                .pacing
                .as_ref()
                .and_then(|p| p.request_timeout_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            min_request_interval: self
                .pacing
                .as_ref()
                .and_then(|p| p.min_interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(defaults.min_request_interval),
            retry_rate_limited: self
                .pacing
                .as_ref()
                .and_then(|p| p.retry_rate_limited)
                .unwrap_or(defaults.retry_rate_limited),
        }
    }
}
