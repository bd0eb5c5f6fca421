//! Error types for edgectl-control

use edgectl_core::{DistributionStatus, MapperError};
use std::time::Duration;
use thiserror::Error;

use crate::api::ApiError;
use crate::state::LifecycleState;

/// Result type for edgectl-control operations
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur while reconciling a distribution
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControlError {
    /// The configuration could not be mapped to a record; never retried
    #[error(transparent)]
    Validation(#[from] MapperError),

    /// Upstream failure, including transient errors whose retry budget ran out
    #[error("{operation} distribution{}: {source}", id_suffix(.id))]
    Api {
        operation: &'static str,
        id: Option<String>,
        #[source]
        source: ApiError,
    },

    /// The distribution no longer exists
    #[error("distribution '{id}' not found\nHint: it was removed outside edgectl and needs to be recreated")]
    NotFound { id: String },

    /// Deployment did not complete within the allowed time
    #[error("distribution '{id}' did not finish deploying after {} (last status: {})", format_waited(.waited), format_status(.last_status))]
    DeploymentTimeout {
        id: String,
        last_status: Option<DistributionStatus>,
        waited: Duration,
    },

    /// A state change the lifecycle does not allow
    #[error("illegal lifecycle transition from {from} to {to}")]
    IllegalTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// Invalid controller configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ControlError {
    fn from(e: serde_json::Error) -> Self {
        ControlError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for ControlError {
    fn from(e: serde_yaml::Error) -> Self {
        ControlError::Serialization(e.to_string())
    }
}

impl ControlError {
    /// Wrap an upstream error with the operation and resource it concerns
    ///
    /// A not-found error becomes [`ControlError::NotFound`] when the id is known.
    pub fn api(operation: &'static str, id: Option<&str>, source: ApiError) -> Self {
        match id {
            Some(id) if source.is_not_found() => ControlError::NotFound { id: id.to_string() },
            _ => ControlError::Api {
                operation,
                id: id.map(str::to_string),
                source,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ControlError::NotFound { .. } => true,
            ControlError::Api { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ControlError::DeploymentTimeout { .. })
    }
}

fn id_suffix(id: &Option<String>) -> String {
    id.as_ref().map(|id| format!(" '{id}'")).unwrap_or_default()
}

fn format_waited(waited: &Duration) -> String {
    humantime_serde::re::humantime::format_duration(Duration::from_secs(waited.as_secs()))
        .to_string()
}

fn format_status(status: &Option<DistributionStatus>) -> String {
    status.map_or_else(|| "unknown".to_string(), |s| s.to_string())
}
