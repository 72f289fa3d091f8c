use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::OutputMode;

/// Slide studio configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideConfig {
    /// Simulated latency of the demo generation backend.
    pub build_delay_ms: u64,
    /// Delay before the agent acknowledges a revision request.
    pub revision_ack_delay_ms: u64,
    /// Budget for one generation call before the job is failed.
    pub build_timeout_ms: u64,
    pub default_mode: OutputMode,
    pub log_path: PathBuf,
}

impl Default for SlideConfig {
    fn default() -> Self {
        Self {
            build_delay_ms: 3000,
            revision_ack_delay_ms: 1000,
            build_timeout_ms: 30_000,
            default_mode: OutputMode::Deck,
            log_path: PathBuf::from("/tmp/slide.log"),
        }
    }
}

impl SlideConfig {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find config directory"))?
            .join("slide");
        Ok(config_dir.join("config.json"))
    }

    /// Load configuration from the default location
    pub async fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path).await
    }

    /// Load configuration from `path`, falling back to defaults when it is absent.
    pub async fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: SlideConfig = serde_json::from_str(&content)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to `path`
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Save configuration to the default location
    pub async fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path).await
    }

    /// Overlay `SLIDE_*` environment variables.
    pub fn apply_env(mut self) -> Result<Self> {
        self.apply_vars(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_vars<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |key: &str| -> Result<Option<u64>> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .with_context(|| format!("{key} must be a number of milliseconds"))
                })
                .transpose()
        };

        if let Some(ms) = millis("SLIDE_BUILD_DELAY_MS")? {
            self.build_delay_ms = ms;
        }
        if let Some(ms) = millis("SLIDE_REVISION_ACK_DELAY_MS")? {
            self.revision_ack_delay_ms = ms;
        }
        if let Some(ms) = millis("SLIDE_BUILD_TIMEOUT_MS")? {
            self.build_timeout_ms = ms;
        }
        if let Some(mode) = lookup("SLIDE_DEFAULT_MODE") {
            self.default_mode = mode.parse()?;
        }
        if let Some(path) = lookup("SLIDE_LOG_PATH") {
            self.log_path = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn build_delay(&self) -> Duration {
        Duration::from_millis(self.build_delay_ms)
    }

    pub fn revision_ack_delay(&self) -> Duration {
        Duration::from_millis(self.revision_ack_delay_ms)
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_millis(self.build_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = SlideConfig::load_from(&dir.path().join("config.json"))
            .await
            .unwrap();
        assert_eq!(config, SlideConfig::default());
        assert_eq!(config.build_delay(), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn saved_config_loads_back_with_partial_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = SlideConfig {
            build_delay_ms: 50,
            default_mode: OutputMode::Poster,
            ..SlideConfig::default()
        };
        config.save_to(&path).await.unwrap();
        assert_eq!(SlideConfig::load_from(&path).await.unwrap(), config);

        tokio::fs::write(&path, r#"{ "revision_ack_delay_ms": 5 }"#)
            .await
            .unwrap();
        let partial = SlideConfig::load_from(&path).await.unwrap();
        assert_eq!(partial.revision_ack_delay_ms, 5);
        assert_eq!(partial.build_timeout_ms, 30_000);
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();
        assert!(SlideConfig::load_from(&path).await.is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SLIDE_BUILD_DELAY_MS", "10"),
            ("SLIDE_DEFAULT_MODE", "poster"),
            ("SLIDE_LOG_PATH", "/var/log/slide.log"),
        ]);
        let mut config = SlideConfig::default();
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.build_delay_ms, 10);
        assert_eq!(config.default_mode, OutputMode::Poster);
        assert_eq!(config.log_path, PathBuf::from("/var/log/slide.log"));
        assert_eq!(config.revision_ack_delay_ms, 1000);
    }

    #[test]
    fn non_numeric_delay_is_rejected() {
        let mut config = SlideConfig::default();
        let result = config.apply_vars(|key| {
            (key == "SLIDE_BUILD_TIMEOUT_MS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }
}
