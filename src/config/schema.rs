//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::query::Reconstruction;
use crate::store::PurgeMatch;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Namespace namespaced kinds are listed in
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Pause between refresh cycles
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Declarative composition document; when set it is the only schema source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition_file: Option<PathBuf>,

    /// Operator registry endpoint (etcd v2 keys API)
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Seed the schema with the core Kubernetes kinds
    #[serde(default = "default_true")]
    pub builtin_kinds: bool,

    /// List resources from `<dir>/<plural>.json` instead of the cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixtures_dir: Option<PathBuf>,

    /// How stored trees are nested again at query time
    #[serde(default)]
    pub reconstruction: Reconstruction,

    /// How vanished top-level resources are detected
    #[serde(default)]
    pub purge_match: PurgeMatch,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            refresh_interval_secs: default_refresh_interval_secs(),
            composition_file: None,
            registry_url: default_registry_url(),
            builtin_kinds: default_true(),
            fixtures_dir: None,
            reconstruction: Reconstruction::default(),
            purge_match: PurgeMatch::default(),
        }
    }
}

impl Config {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Check values serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.refresh_interval_secs == 0 {
            bail!("refreshIntervalSecs must be greater than 0");
        }
        if let Err(e) = Url::parse(&self.registry_url) {
            bail!("registryUrl '{}' is not a valid URL: {}", self.registry_url, e);
        }
        Ok(())
    }
}

// Default value functions
fn default_namespace() -> String {
    "default".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    10
}

fn default_registry_url() -> String {
    "http://localhost:2379".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.namespace, "default");
        assert_eq!(config.refresh_interval(), Duration::from_secs(10));
        assert!(config.builtin_kinds);
        assert_eq!(config.reconstruction, Reconstruction::Linked);
        assert_eq!(config.purge_match, PurgeMatch::Name);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_yaml::from_str(
            "namespace: shop\ncompositionFile: /etc/kubeprov/composition.yaml\nreconstruction: levelHeuristic\npurgeMatch: identity\n",
        )
        .unwrap();
        assert_eq!(config.namespace, "shop");
        assert_eq!(
            config.composition_file,
            Some(PathBuf::from("/etc/kubeprov/composition.yaml"))
        );
        assert_eq!(config.refresh_interval_secs, 10);
        assert_eq!(config.reconstruction, Reconstruction::LevelHeuristic);
        assert_eq!(config.purge_match, PurgeMatch::Identity);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let zero = Config {
            refresh_interval_secs: 0,
            ..Config::default()
        };
        assert!(zero.validate().is_err());

        let bad_url = Config {
            registry_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(bad_url.validate().is_err());
    }
}
