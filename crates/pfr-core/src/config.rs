use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use pfr_util::errors::PfrError;

use crate::DEFAULT_FORGE_URL;

/// Global user configuration loaded from `~/.pfr/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default = "default_forge_url", rename = "forge-url")]
    pub forge_url: String,

    /// Enables the persistent cache tier when set.
    #[serde(default, rename = "cache-dir")]
    pub cache_dir: Option<String>,

    /// Local module roots consulted before any other origin.
    #[serde(default, rename = "module-paths")]
    pub module_paths: Vec<String>,

    /// Disable the missing-module relaxation.
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            forge_url: default_forge_url(),
            cache_dir: None,
            module_paths: Vec::new(),
            strict: false,
            http: HttpConfig::default(),
        }
    }
}

fn default_forge_url() -> String {
    DEFAULT_FORGE_URL.to_string()
}

/// HTTP client settings from `[http]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs", rename = "timeout-secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay_ms", rename = "retry-delay-ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_user_agent", rename = "user-agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_user_agent() -> String {
    format!("puppetfile-resolver/{}", env!("CARGO_PKG_VERSION"))
}

impl GlobalConfig {
    /// Load the global configuration from `~/.pfr/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> Result<Self, PfrError> {
        let path = Self::default_path();
        if path.is_file() {
            Self::from_path(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load an explicit configuration file. A missing file is an error.
    pub fn from_path(path: &Path) -> Result<Self, PfrError> {
        let content = std::fs::read_to_string(path).map_err(|e| PfrError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse_toml(&content).map_err(|e| PfrError::Config {
            message: format!("Failed to parse {}: {e}", path.display()),
        })
    }

    pub fn parse_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the resolver data directory (`~/.pfr/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".pfr")
}
