use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::version::registries::packagist::DEFAULT_BASE_URL;

// =============================================================================
// Time-related constants
// =============================================================================

/// Timeout for registry and feed requests in milliseconds (30 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 30_000;

/// A check lock older than this is treated as abandoned (10 minutes)
pub const CHECK_LOCK_STALE_MS: i64 = 10 * 60 * 1000;

// =============================================================================
// Registry constants
// =============================================================================

/// Default number of package detail requests in flight
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Upper bound for configured concurrency
pub const MAX_CONCURRENCY: usize = 8;

/// Environment variable overriding `crypt.key`
pub const CRYPT_KEY_ENV: &str = "UPDATE_WATCH_CRYPT_KEY";

const APP_DIR: &str = "update-watch";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Watcher configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchConfig {
    /// Registry vendor whose packages are watched
    pub vendor: String,
    /// Module name prefix of the vendor's installed modules
    pub module_prefix: String,
    /// Prefix of the vendor's package names after `vendor/`
    pub package_prefix: String,
    pub registry: RegistryConfig,
    pub feed: FeedConfig,
    pub modules: ModulesConfig,
    pub crypt: CryptConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            vendor: "infrangible".to_string(),
            module_prefix: "Infrangible".to_string(),
            package_prefix: "m2-".to_string(),
            registry: RegistryConfig::default(),
            feed: FeedConfig::default(),
            modules: ModulesConfig::default(),
            crypt: CryptConfig::default(),
        }
    }
}

impl WatchConfig {
    /// Load the config file at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Capitalized vendor name used in notice titles
    pub fn vendor_label(&self) -> String {
        let mut chars = self.vendor.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Decryption key; the environment wins over the file
    pub fn crypt_key(&self) -> Option<String> {
        crypt_key_with_env(std::env::var(CRYPT_KEY_ENV).ok(), self.crypt.key.clone())
    }
}

/// Package registry configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistryConfig {
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    pub concurrency: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: FETCH_TIMEOUT_MS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }

    /// Configured concurrency clamped to 1..=8
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(1, MAX_CONCURRENCY)
    }
}

/// Release feed configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedConfig {
    pub enabled: bool,
    pub base_url: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Local module discovery configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ModulesConfig {
    /// Directories searched for `etc/module.xml`
    pub roots: Vec<PathBuf>,
    /// Module name suffixes that are not published packages
    pub excluded: Vec<String>,
    /// Path fragments marking a source checkout
    pub dev_path_markers: Vec<String>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            excluded: Vec::new(),
            dev_path_markers: vec!["app/code".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct CryptConfig {
    pub key: Option<String>,
}

fn crypt_key_with_env(env_key: Option<String>, file_key: Option<String>) -> Option<String> {
    env_key
        .filter(|k| !k.is_empty())
        .or(file_key)
        .filter(|k| !k.is_empty())
}

/// Returns the path to the data directory for update-watch.
/// Uses $XDG_DATA_HOME/update-watch if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/update-watch,
/// or ./update-watch if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("watch.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("update-watch.log")
}

/// Returns the default config file path.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join(APP_DIR)
}
