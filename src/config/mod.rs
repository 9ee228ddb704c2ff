//! Configuration system for kubeprov
//!
//! Layered configuration: built-in defaults, then a YAML file, then
//! environment variable overrides.

pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::Config;

/// Get a configuration value by key
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    let path_or_empty = |path: &Option<std::path::PathBuf>| {
        path.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    };

    match key {
        "namespace" => Ok(config.namespace.clone()),
        "refreshIntervalSecs" => Ok(config.refresh_interval_secs.to_string()),
        "compositionFile" => Ok(path_or_empty(&config.composition_file)),
        "registryUrl" => Ok(config.registry_url.clone()),
        "builtinKinds" => Ok(config.builtin_kinds.to_string()),
        "fixturesDir" => Ok(path_or_empty(&config.fixtures_dir)),
        "reconstruction" | "purgeMatch" => {
            // Unit variants serialize to their bare YAML name
            let value = if key == "reconstruction" {
                serde_yaml::to_string(&config.reconstruction)
            } else {
                serde_yaml::to_string(&config.purge_match)
            };
            value
                .map(|s| s.trim().to_string())
                .map_err(|e| anyhow::anyhow!("Failed to serialize {}: {}", key, e))
        }
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}
