use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;

pub const CONFIG_FILE_NAME: &str = "gstlink.json";
pub const DEFAULT_BASE_URL: &str = "https://sandbox.vlinknow.com/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;
const SUPPORTED_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub strict_aggregation: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub base_url: String,
    /// Deadline applied to each registry call on its own.
    pub timeout: Duration,
    /// All-or-nothing fan-in when true; keep partial results when false.
    pub strict_aggregation: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: SUPPORTED_SCHEMA_VERSION,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            strict_aggregation: true,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist. Without one, `./gstlink.json` and then the
    /// per-user config directory are tried before falling back to defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, LookupError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };

        let Some(config_path) = config_path else {
            return Self::resolve_config(Config::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| LookupError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| LookupError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, LookupError> {
        let schema_version = config.schema_version.unwrap_or(SUPPORTED_SCHEMA_VERSION);
        if schema_version != SUPPORTED_SCHEMA_VERSION {
            return Err(LookupError::InvalidConfig(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let base_url = config
            .base_url
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(LookupError::InvalidConfig(format!(
                "base_url must be an http(s) URL: {base_url}"
            )));
        }

        let timeout_secs = config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(LookupError::InvalidConfig(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            schema_version,
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            strict_aggregation: config.strict_aggregation.unwrap_or(true),
        })
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("", "", "gstlink")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }
}
