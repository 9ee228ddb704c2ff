//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{paths, schema::Config};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Config file (`explicit`, or the root config when it exists)
    /// 3. Built-in defaults
    ///
    /// An explicitly given file must exist; the root config is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Config> {
        let mut config = Self::load_defaults();

        match explicit {
            Some(path) => {
                let file_config = Self::load_file(path)?;
                config = Self::merge_config(config, file_config);
            }
            None => {
                let root = paths::root_config_path();
                if root.exists() {
                    let file_config = Self::load_file(&root)?;
                    config = Self::merge_config(config, file_config);
                }
            }
        }

        config = Self::apply_env_overrides(config);
        Ok(config)
    }

    /// Path of the file [`ConfigLoader::load`] would read
    pub fn config_path(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(paths::root_config_path)
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration by loading and checking for errors
    ///
    /// Fails on invalid YAML syntax, invalid value types, file read errors
    /// and values out of range.
    pub fn validate(explicit: Option<&Path>) -> Result<Config> {
        let config = Self::load(explicit).context("Failed to load merged configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        Config::default()
    }

    /// Merge two configurations, with `other` taking precedence
    fn merge_config(base: Config, other: Config) -> Config {
        Config {
            namespace: other.namespace,
            refresh_interval_secs: other.refresh_interval_secs,
            composition_file: other.composition_file.or(base.composition_file),
            registry_url: other.registry_url,
            builtin_kinds: other.builtin_kinds,
            fixtures_dir: other.fixtures_dir.or(base.fixtures_dir),
            reconstruction: other.reconstruction,
            purge_match: other.purge_match,
        }
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(mut config: Config) -> Config {
        if let Ok(namespace) = std::env::var("KUBEPROV_NAMESPACE") {
            config.namespace = namespace;
        }

        if let Ok(interval) = std::env::var("KUBEPROV_REFRESH_INTERVAL") {
            match interval.parse::<u64>() {
                Ok(secs) => config.refresh_interval_secs = secs,
                Err(e) => tracing::warn!(
                    "Ignoring KUBEPROV_REFRESH_INTERVAL '{}': {}",
                    interval,
                    e
                ),
            }
        }

        if let Ok(file) = std::env::var("KIND_COMPOSITION_FILE") {
            if !file.is_empty() {
                config.composition_file = Some(PathBuf::from(file));
            }
        }

        if let Ok(url) = std::env::var("KUBEPROV_REGISTRY_URL") {
            config.registry_url = url;
        }

        if let Ok(dir) = std::env::var("KUBEPROV_FIXTURES_DIR") {
            if !dir.is_empty() {
                config.fixtures_dir = Some(PathBuf::from(dir));
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PurgeMatch;

    #[test]
    fn test_merge_config() {
        let base = Config {
            fixtures_dir: Some(PathBuf::from("/fixtures")),
            ..Config::default()
        };
        let other = Config {
            namespace: "test-ns".to_string(),
            ..Default::default()
        };

        let merged = ConfigLoader::merge_config(base, other);
        assert_eq!(merged.namespace, "test-ns");
        assert_eq!(merged.fixtures_dir, Some(PathBuf::from("/fixtures")));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "registryUrl: http://etcd.kube-system:2379\ncompositionFile: /srv/composition.yaml\npurgeMatch: identity\n",
        )
        .unwrap();

        let config = ConfigLoader::load(Some(path.as_path())).unwrap();
        assert_eq!(config.registry_url, "http://etcd.kube-system:2379");
        assert_eq!(
            config.composition_file,
            Some(PathBuf::from("/srv/composition.yaml"))
        );
        assert_eq!(config.purge_match, PurgeMatch::Identity);
        assert_eq!(ConfigLoader::config_path(Some(path.as_path())), path);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigLoader::load(Some(dir.path().join("absent.yaml").as_path())).is_err());
    }

    #[test]
    fn test_validate_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "refreshIntervalSecs: soon\n").unwrap();
        assert!(ConfigLoader::validate(Some(path.as_path())).is_err());
    }

    #[test]
    fn test_env_overrides() {
        // SAFETY: set_var is unsafe in Rust 2024 due to potential data races.
        // Other tests do not assert on the overridden fields.
        unsafe {
            std::env::set_var("KUBEPROV_NAMESPACE", "env-ns");
            std::env::set_var("KUBEPROV_REFRESH_INTERVAL", "30");
            std::env::set_var("KUBEPROV_FIXTURES_DIR", "/tmp/fixtures");
        }

        let config = ConfigLoader::apply_env_overrides(Config::default());

        assert_eq!(config.namespace, "env-ns");
        assert_eq!(config.refresh_interval_secs, 30);
        assert_eq!(config.fixtures_dir, Some(PathBuf::from("/tmp/fixtures")));

        // SAFETY: see above
        unsafe {
            std::env::remove_var("KUBEPROV_NAMESPACE");
            std::env::remove_var("KUBEPROV_REFRESH_INTERVAL");
            std::env::remove_var("KUBEPROV_FIXTURES_DIR");
        }
    }
}
