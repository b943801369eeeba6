//! Config file discovery and parsing.

use std::path::Path;

use super::{Config, ConfigError};

/// Application name used for config file discovery.
const APP_NAME: &str = "fsbo";

impl Config {
    /// Load configuration.
    ///
    /// Uses `explicit` when given, otherwise discovers an `fsbo` config file in
    /// the standard locations via prefer. Falls back to defaults when nothing
    /// is found. Environment overrides are applied last.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::load_from_path(path).await?,
            None => Self::discover().await,
        };
        Ok(config.with_env_overrides())
    }

    /// Discover a config file with prefer; defaults if none is found or it
    /// cannot be parsed.
    async fn discover() -> Self {
        match prefer::load(APP_NAME).await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Format is chosen by extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ConfigError::Load(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| ConfigError::Load(format!("failed to parse TOML config: {}", e))),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| ConfigError::Load(format!("failed to parse YAML config: {}", e))),
            _ => serde_json::from_str(contents)
                .map_err(|e| ConfigError::Load(format!("failed to parse JSON config: {}", e))),
        }
    }
}
