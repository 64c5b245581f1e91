//! Per-version deployment settings derived from configuration.

use blogsphere_client::parse_origin;
use blogsphere_core::{AppConfig, Error};
use url::Url;

/// Logical role of a partition within one deployment version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionRole {
    Static,
    Dynamic,
}

/// The two live partition names for one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionNames {
    pub static_name: String,
    pub dynamic_name: String,
}

impl PartitionNames {
    pub fn new(app: &str, version: &str) -> Self {
        Self { static_name: format!("{app}-static-{version}"), dynamic_name: format!("{app}-dynamic-{version}") }
    }

    pub fn name(&self, role: PartitionRole) -> &str {
        match role {
            PartitionRole::Static => &self.static_name,
            PartitionRole::Dynamic => &self.dynamic_name,
        }
    }

    /// True for the current version's static or dynamic partition.
    pub fn is_current(&self, name: &str) -> bool {
        name == self.static_name || name == self.dynamic_name
    }
}

/// Everything one worker version needs to know about where it runs.
#[derive(Debug, Clone)]
pub struct Deployment {
    /// Origin root, e.g. `https://blog.example.com/`.
    pub origin: Url,
    /// Prefix of the partition names.
    pub app_name: String,
    pub version: String,
    pub partitions: PartitionNames,
    /// App-shell paths, each starting with `/`.
    pub app_shell: Vec<String>,
    pub skip_waiting_on_install: bool,
    pub notification_title: String,
}

impl Deployment {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = parse_origin(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            app_name: config.app_name.clone(),
            version: config.cache_version.clone(),
            partitions: PartitionNames::new(&config.app_name, &config.cache_version),
            app_shell: config.app_shell.clone(),
            skip_waiting_on_install: config.skip_waiting_on_install,
            notification_title: config.notification_title.clone(),
        })
    }

    /// The same deployment at another version, with that version's partitions.
    pub fn for_version(&self, version: &str) -> Self {
        Self {
            version: version.to_string(),
            partitions: PartitionNames::new(&self.app_name, version),
            ..self.clone()
        }
    }

    /// Registration scope recorded in the store.
    pub fn scope(&self) -> &str {
        self.origin.as_str()
    }

    /// Absolute URL of a path on this origin.
    pub fn url_for(&self, path: &str) -> Result<Url, Error> {
        self.origin
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    pub fn is_app_shell_path(&self, path: &str) -> bool {
        self.app_shell.iter().any(|p| p == path)
    }
}
