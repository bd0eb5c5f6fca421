//! CLI commands

pub mod apply;
pub mod delete;
pub mod expand;
pub mod flatten;
pub mod status;
pub mod validate;

use edgectl_control::{ControllerConfig, HttpControlPlane, LifecycleController};
use edgectl_core::DistributionConfig;
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// Where to find the control plane
pub struct Connection {
    pub config: Option<PathBuf>,
    pub endpoint: Option<String>,
}

impl Connection {
    fn controller_config(&self) -> Result<ControllerConfig> {
        let mut config = match &self.config {
            Some(path) => ControllerConfig::load_from(path)?,
            None => ControllerConfig::load()?,
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        Ok(config)
    }

    /// Build a controller talking HTTP to the configured endpoint
    pub fn controller(&self) -> Result<LifecycleController<HttpControlPlane>> {
        let config = self.controller_config()?;
        let plane = HttpControlPlane::from_config(&config)?;
        tracing::debug!(endpoint = %config.endpoint, "connecting to control plane");
        Ok(LifecycleController::new(plane, config))
    }
}

/// Load a distribution configuration file
pub fn load_config(path: &Path) -> Result<DistributionConfig> {
    DistributionConfig::load(path).map_err(|e| match e {
        edgectl_core::MapperError::Io(io) => CliError::Io {
            message: format!("{}: {io}", path.display()),
        },
        other => CliError::from(other),
    })
}
