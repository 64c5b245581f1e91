//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BLOGSPHERE_*)
//! 2. TOML config file (if BLOGSPHERE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// App-shell resources seeded into the static partition at install time.
pub const DEFAULT_APP_SHELL: &[&str] =
    &["/", "/index.html", "/manifest.json", "/icon-192.png", "/icon-512.png", "/vite.svg"];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BLOGSPHERE_*)
/// 2. TOML config file (if BLOGSPHERE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache store.
    ///
    /// Set via BLOGSPHERE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Prefix shared by every partition name.
    ///
    /// Set via BLOGSPHERE_APP_NAME environment variable.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Deployment version tag appended to partition names.
    ///
    /// Bumping it is what makes the next activation drop old partitions.
    /// Set via BLOGSPHERE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin the worker is registered for, e.g. `http://localhost:5173`.
    ///
    /// Set via BLOGSPHERE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for network requests.
    ///
    /// Set via BLOGSPHERE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Optional transport timeout in milliseconds. Unset means no timeout.
    ///
    /// Set via BLOGSPHERE_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Maximum number of redirects the network client follows.
    ///
    /// Set via BLOGSPHERE_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Paths seeded into the static partition on install.
    #[serde(default = "default_app_shell")]
    pub app_shell: Vec<String>,

    /// Whether a freshly installed version activates without waiting for
    /// a `SKIP_WAITING` message.
    ///
    /// Set via BLOGSPHERE_SKIP_WAITING_ON_INSTALL environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Title used for push notifications.
    ///
    /// Set via BLOGSPHERE_NOTIFICATION_TITLE environment variable.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./blogsphere-cache.sqlite")
}

fn default_app_name() -> String {
    "blogsphere".into()
}

fn default_cache_version() -> String {
    "v2".into()
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_user_agent() -> String {
    "blogsphere-sw/0.1".into()
}

fn default_max_redirects() -> usize {
    5
}

fn default_app_shell() -> Vec<String> {
    DEFAULT_APP_SHELL.iter().map(|p| p.to_string()).collect()
}

fn default_true() -> bool {
    true
}

fn default_notification_title() -> String {
    "BlogSphere".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            app_name: default_app_name(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            timeout_ms: None,
            max_redirects: default_max_redirects(),
            app_shell: default_app_shell(),
            skip_waiting_on_install: true,
            notification_title: default_notification_title(),
        }
    }
}

impl AppConfig {
    /// Transport timeout as Duration, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Name of the static partition for the configured version.
    pub fn static_partition(&self) -> String {
        format!("{}-static-{}", self.app_name, self.cache_version)
    }

    /// Name of the dynamic partition for the configured version.
    pub fn dynamic_partition(&self) -> String {
        format!("{}-dynamic-{}", self.app_name, self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BLOGSPHERE_`
    /// 2. TOML file from `BLOGSPHERE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment()
            .extract()
            .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BLOGSPHERE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("BLOGSPHERE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./blogsphere-cache.sqlite"));
        assert_eq!(config.app_name, "blogsphere");
        assert_eq!(config.cache_version, "v2");
        assert_eq!(config.origin, "http://localhost:5173");
        assert_eq!(config.user_agent, "blogsphere-sw/0.1");
        assert!(config.timeout_ms.is_none());
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.app_shell.len(), 6);
        assert!(config.skip_waiting_on_install);
        assert_eq!(config.notification_title, "BlogSphere");
    }

    #[test]
    fn test_partition_names() {
        let config = AppConfig::default();
        assert_eq!(config.static_partition(), "blogsphere-static-v2");
        assert_eq!(config.dynamic_partition(), "blogsphere-dynamic-v2");
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig { timeout_ms: Some(2_500), ..Default::default() };
        assert_eq!(config.timeout(), Some(Duration::from_millis(2_500)));
        assert_eq!(AppConfig::default().timeout(), None);
    }

    #[test]
    fn test_load_env_overrides() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BLOGSPHERE_CACHE_VERSION", "v3");
            jail.set_env("BLOGSPHERE_ORIGIN", "https://blog.example.com");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.cache_version, "v3");
            assert_eq!(config.origin, "https://blog.example.com");
            assert_eq!(config.static_partition(), "blogsphere-static-v3");
            Ok(())
        });
    }

    #[test]
    fn test_load_toml_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "sw.toml",
                r#"
                app_name = "notes"
                app_shell = ["/", "/index.html"]
                "#,
            )?;
            jail.set_env("BLOGSPHERE_CONFIG_FILE", "sw.toml");

            let config = AppConfig::load().expect("config should load");
            assert_eq!(config.app_name, "notes");
            assert_eq!(config.app_shell, vec!["/".to_string(), "/index.html".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_origin() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BLOGSPHERE_ORIGIN", "ftp://blog.example.com");
            assert!(matches!(AppConfig::load(), Err(ConfigError::Invalid { .. })));
            Ok(())
        });
    }
}
