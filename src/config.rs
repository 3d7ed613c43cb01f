//! Configuration Management
//!
//! Persistent defaults for the CLI, stored as JSON under the user's config
//! directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::gcp::auth;
use crate::gcp::transport::COMPUTE_ENDPOINT;

/// Region used when nothing else names one
pub const FALLBACK_REGION: &str = "us-central1";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Last used project ID
    #[serde(default)]
    pub project_id: Option<String>,
    /// Last used region
    #[serde(default)]
    pub region: Option<String>,
    /// Compute API base URL override
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcp-interconnect").join("config.json"))
    }

    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file {:?}: {:#}", path, e);
                Self::default()
            },
        }
    }

    /// Load configuration from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }

    /// Get effective project (config > environment > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id.clone().or_else(auth::get_default_project)
    }

    /// Get effective region (config > environment > gcloud default > fallback)
    pub fn effective_region(&self) -> String {
        self.region
            .clone()
            .or_else(auth::get_default_region)
            .unwrap_or_else(|| FALLBACK_REGION.to_string())
    }

    pub fn effective_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| COMPUTE_ENDPOINT.to_string())
    }

    /// Set project and region, then save
    pub fn remember(&mut self, project_id: &str, region: &str) -> Result<()> {
        self.project_id = Some(project_id.to_string());
        self.region = Some(region.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("gcp-interconnect-{}", uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn test_missing_fields_default() {
        let config: Config = serde_json::from_str(r#"{"region": "europe-north1"}"#).unwrap();
        assert_eq!(config.region.as_deref(), Some("europe-north1"));
        assert!(config.project_id.is_none());
        assert_eq!(config.effective_region(), "europe-north1");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = scratch_path();
        let config = Config {
            project_id: Some("net-prod-123".to_string()),
            region: Some("europe-north1".to_string()),
            endpoint: None,
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let config = Config::load_from(&scratch_path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_corrupt_file_errors() {
        let path = scratch_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        assert!(Config::load_from(&path).is_err());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_endpoint_override() {
        let config = Config {
            endpoint: Some("http://localhost:9000/compute/v1/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.effective_endpoint(), "http://localhost:9000/compute/v1/");
        assert_eq!(Config::default().effective_endpoint(), COMPUTE_ENDPOINT);
    }
}
