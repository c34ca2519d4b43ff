//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Route lists and the seed set are read once at startup. The controller
//! never mutates them afterwards.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to SQLite store database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the application shell is served from. Relative paths in the
    /// seed set, the offline document and intercepted requests resolve
    /// against it.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Store name prefix, joined with `cache_version` to form the store name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployment version identifier. Stores carrying any other version are
    /// deleted on activation.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Document served when a navigation can be satisfied by neither the
    /// network nor the store.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Documents fetched and stored at install time.
    #[serde(default = "default_seed_assets")]
    pub seed_assets: Vec<String>,

    /// Prefixes routed network-first. Entries starting with `/` match the
    /// request path, anything else matches the start of the full URL.
    #[serde(default = "default_network_first")]
    pub network_first: Vec<String>,

    /// Path suffixes (file extensions) routed cache-first.
    #[serde(default = "default_cache_first")]
    pub cache_first: Vec<String>,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via SWCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via SWCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Upper bound on a single network attempt, in milliseconds.
    ///
    /// Set via SWCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Icon shown with push notifications.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    /// Badge shown with push notifications.
    #[serde(default = "default_notification_badge")]
    pub notification_badge: String,

    /// Vibration pattern in milliseconds.
    #[serde(default = "default_notification_vibrate")]
    pub notification_vibrate: Vec<u32>,

    /// Install and activate at startup. When off, the lifecycle is driven
    /// through the `sw_install` and `sw_activate` tools.
    ///
    /// Set via SWCACHE_AUTO_REGISTER environment variable.
    #[serde(default = "default_auto_register")]
    pub auto_register: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_prefix() -> String {
    "authflow".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_offline_url() -> String {
    "/offline.html".into()
}

fn default_seed_assets() -> Vec<String> {
    ["/", "/login", "/register", "/offline.html"].into_iter().map(String::from).collect()
}

fn default_network_first() -> Vec<String> {
    [
        "https://identitytoolkit.googleapis.com",
        "https://firestore.googleapis.com",
        "https://securetoken.googleapis.com",
        "/api/",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_cache_first() -> Vec<String> {
    [".js", ".css", ".png", ".jpg", ".jpeg", ".svg", ".gif", ".woff", ".woff2"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/icon-72x72.png".into()
}

fn default_notification_vibrate() -> Vec<u32> {
    vec![200, 100, 200]
}

fn default_auto_register() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            offline_url: default_offline_url(),
            seed_assets: default_seed_assets(),
            network_first: default_network_first(),
            cache_first: default_cache_first(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_badge(),
            notification_vibrate: default_notification_vibrate(),
            auto_register: default_auto_register(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the store owned by this deployment, e.g. `authflow-v1`.
    pub fn store_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SWCACHE_`
    /// 2. TOML file from `SWCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
