//! Controller configuration
//!
//! Stored in `~/.config/edgectl/config.yaml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ControlError, Result};
use crate::poller::PollSettings;
use crate::retry::RetryWindow;

/// Environment variable consulted when no token is configured
pub const TOKEN_ENV: &str = "EDGECTL_TOKEN";

/// Hosted zone every distribution domain name resolves in
pub const DEFAULT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// Controller configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    /// Base URL of the control-plane API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Timeout for a single HTTP request
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Hosted zone id reported on every handle
    #[serde(default = "default_hosted_zone_id")]
    pub hosted_zone_id: String,

    /// Retry budget while a viewer certificate propagates
    #[serde(default = "default_certificate_retry")]
    pub certificate_retry: RetryWindow,

    /// Budget for the disable-then-delete detour
    #[serde(default = "default_delete_detour")]
    pub delete_detour: RetryWindow,

    /// Deployment poll schedule
    #[serde(default)]
    pub polling: PollSettings,
}

fn default_endpoint() -> String {
    "https://cloudfront.amazonaws.com/2020-05-31".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_hosted_zone_id() -> String {
    DEFAULT_HOSTED_ZONE_ID.to_string()
}

fn default_certificate_retry() -> RetryWindow {
    RetryWindow::new(Duration::from_secs(60), Duration::from_secs(2))
}

fn default_delete_detour() -> RetryWindow {
    RetryWindow::new(Duration::from_secs(120), Duration::from_secs(5))
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            request_timeout: default_request_timeout(),
            hosted_zone_id: default_hosted_zone_id(),
            certificate_retry: default_certificate_retry(),
            delete_detour: default_delete_detour(),
            polling: PollSettings::default(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from default location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default configuration path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            ControlError::InvalidConfig("could not determine config directory".to_string())
        })?;
        Ok(config_dir.join("edgectl").join("config.yaml"))
    }

    /// Token from the file, or from the environment
    pub fn resolved_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
    }

    fn check(&self) -> Result<()> {
        if self.polling.interval.is_zero() {
            return Err(ControlError::InvalidConfig(
                "polling.interval must be greater than zero".to_string(),
            ));
        }
        url::Url::parse(&self.endpoint).map_err(|e| {
            ControlError::InvalidConfig(format!("endpoint '{}': {e}", self.endpoint))
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.certificate_retry.window, Duration::from_secs(60));
        assert_eq!(config.delete_detour.window, Duration::from_secs(120));
        assert_eq!(config.polling.timeout, Duration::from_secs(90 * 60));
        assert_eq!(config.hosted_zone_id, "Z2FDTNDATAQYW2");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "endpoint: http://localhost:9000\ncertificateRetry:\n  window: 5m\n  pause: 10s\npolling:\n  interval: 1m\n",
        )
        .unwrap();

        let config = ControllerConfig::load_from(&path).unwrap();
        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.certificate_retry.window, Duration::from_secs(300));
        assert_eq!(config.polling.interval, Duration::from_secs(60));
        assert_eq!(config.polling.delay, Duration::from_secs(30));
        assert_eq!(config.delete_detour.pause, Duration::from_secs(5));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = ControllerConfig {
            token: Some("secret".to_string()),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        assert_eq!(ControllerConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "endpoint: not a url\n").unwrap();

        let err = ControllerConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ControlError::InvalidConfig(_)));
    }
}
