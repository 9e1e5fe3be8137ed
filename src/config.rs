use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::request::{RequestDefaults, RequestFactory};
use crate::retry::{BackoffPolicy, RetryLimit};

/// Retry policy parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt; negative = unlimited.
    pub max_retries: i64,
    /// Delay in seconds before the first retry (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

impl RetryConfig {
    pub fn to_policy(&self) -> BackoffPolicy {
        let max_retries = match u32::try_from(self.max_retries) {
            Ok(n) => RetryLimit::Limited(n),
            Err(_) if self.max_retries < 0 => RetryLimit::Unlimited,
            Err(_) => RetryLimit::Limited(u32::MAX),
        };
        BackoffPolicy {
            max_retries,
            base_delay: Duration::try_from_secs_f64(self.base_delay_secs).unwrap_or(Duration::ZERO),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Connection timeouts (`[network]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 45,
            read_timeout_secs: 45,
        }
    }
}

/// Global configuration loaded from `~/.config/httpdq/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpdqConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl HttpdqConfig {
    pub fn retry_policy(&self) -> BackoffPolicy {
        self.retry
            .as_ref()
            .map(RetryConfig::to_policy)
            .unwrap_or_default()
    }

    /// Request defaults (timeouts, retry policy) derived from this config.
    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            connect_timeout: Duration::from_secs(self.network.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.network.read_timeout_secs),
            retry_policy: Arc::new(self.retry_policy()),
            ..RequestDefaults::default()
        }
    }

    pub fn request_factory(&self) -> RequestFactory {
        RequestFactory::new(self.request_defaults())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("httpdq")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HttpdqConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HttpdqConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(&path)
}

/// Load configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<HttpdqConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: HttpdqConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
