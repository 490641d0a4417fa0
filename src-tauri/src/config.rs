//! Application configuration: built-in defaults, then an optional TOML file,
//! then environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analysis::client::normalize_base_url;
use crate::analysis::{AnalysisSource, PostureApiClient};
use crate::error::PostureProError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const ENV_API_URL: &str = "POSTUREPRO_API_URL";
pub const ENV_OFFLINE: &str = "POSTUREPRO_OFFLINE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    /// Skip the network entirely and always simulate
    pub offline: bool,
    pub frame_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            offline: false,
            frame_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// `<config dir>/posturepro/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("posturepro").join("config.toml"))
    }

    /// Load from the default path and the process environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path().as_deref(), |key| std::env::var(key).ok())
    }

    pub fn load_from<F>(path: Option<&Path>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {:?}", path))?;
                let parsed: AppConfig = toml::from_str(&content)
                    .with_context(|| format!("Invalid TOML in {:?}", path))?;
                info!("Loaded config from {:?}", path);
                parsed
            }
            _ => {
                debug!("No config file, using defaults");
                AppConfig::default()
            }
        };

        if let Some(url) = env(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            config.api_base_url = url.trim().to_string();
        }
        if let Some(flag) = env(ENV_OFFLINE) {
            config.offline = parse_flag(&flag);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Apply a base URL stored in user preferences.
    pub fn with_base_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        self
    }

    pub fn validate(&self) -> Result<(), PostureProError> {
        normalize_base_url(&self.api_base_url)?;
        if self.frame_timeout_secs == 0 {
            return Err(PostureProError::Config(
                "frame_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn analysis_source(&self) -> Result<AnalysisSource, PostureProError> {
        if self.offline {
            return Ok(AnalysisSource::Simulated);
        }
        let client = PostureApiClient::new(&self.api_base_url)?
            .with_frame_timeout(Duration::from_secs(self.frame_timeout_secs));
        Ok(AnalysisSource::Remote(client))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let config = AppConfig::load_from(None, no_env).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.api_base_url, "http://localhost:8000");
    }

    #[test]
    fn test_file_then_env_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_base_url = \"http://10.0.0.5:9000\"\nframe_timeout_secs = 12\n").unwrap();

        let config = AppConfig::load_from(Some(&path), no_env).unwrap();
        assert_eq!(config.api_base_url, "http://10.0.0.5:9000");
        assert_eq!(config.frame_timeout_secs, 12);
        assert!(!config.offline);

        let env: HashMap<&str, &str> =
            [(ENV_API_URL, "https://posture.example.com"), (ENV_OFFLINE, "true")].into();
        let config =
            AppConfig::load_from(Some(&path), |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.api_base_url, "https://posture.example.com");
        assert_eq!(config.frame_timeout_secs, 12);
        assert!(config.offline);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_base_url = [").unwrap();
        assert!(AppConfig::load_from(Some(&path), no_env).is_err());

        std::fs::write(&path, "api_base_url = \"not a url\"").unwrap();
        assert!(AppConfig::load_from(Some(&path), no_env).is_err());
    }

    #[test]
    fn test_offline_selects_simulated_source() {
        let config = AppConfig {
            offline: true,
            ..AppConfig::default()
        };
        assert!(config.analysis_source().unwrap().is_offline());
        assert!(!AppConfig::default().analysis_source().unwrap().is_offline());
    }

    #[test]
    fn test_preference_override() {
        let config = AppConfig::default().with_base_url_override(Some("http://gpu-box:8000".to_string()));
        assert_eq!(config.api_base_url, "http://gpu-box:8000");

        let config = AppConfig::default().with_base_url_override(Some("  ".to_string()));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" TRUE "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("nope"));
    }
}
