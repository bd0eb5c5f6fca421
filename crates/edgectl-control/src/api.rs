//! The remote control-plane contract
//!
//! The lifecycle controller only talks to the control plane through
//! [`ControlPlane`], which makes the in-memory mock and the HTTP client
//! interchangeable.

use async_trait::async_trait;
use edgectl_core::{DistributionOutput, DistributionRecord, Tags};
use std::fmt;
use thiserror::Error;

/// Result of a single control-plane call
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Upstream error condition, as reported by the control plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The viewer certificate is not yet visible to the control plane
    InvalidViewerCertificate,
    /// The If-Match token is stale
    PreconditionFailed,
    /// The If-Match token is malformed or missing
    InvalidIfMatchVersion,
    /// Deletion refused because the distribution is still enabled
    DistributionNotDisabled,
    NoSuchDistribution,
    /// The request did not complete in time at the transport layer
    Timeout,
    Other,
}

impl ApiErrorKind {
    /// Classify an upstream error code
    pub fn from_code(code: &str) -> Self {
        match code {
            "InvalidViewerCertificate" => Self::InvalidViewerCertificate,
            "PreconditionFailed" => Self::PreconditionFailed,
            "InvalidIfMatchVersion" => Self::InvalidIfMatchVersion,
            "DistributionNotDisabled" => Self::DistributionNotDisabled,
            "NoSuchDistribution" | "NoSuchResource" => Self::NoSuchDistribution,
            "RequestTimeout" => Self::Timeout,
            _ => Self::Other,
        }
    }

    /// Classify by HTTP status when the body carries no code at all
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NoSuchDistribution,
            409 => Self::DistributionNotDisabled,
            412 => Self::PreconditionFailed,
            408 | 504 => Self::Timeout,
            _ => Self::Other,
        }
    }

    /// Canonical upstream code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidViewerCertificate => "InvalidViewerCertificate",
            Self::PreconditionFailed => "PreconditionFailed",
            Self::InvalidIfMatchVersion => "InvalidIfMatchVersion",
            Self::DistributionNotDisabled => "DistributionNotDisabled",
            Self::NoSuchDistribution => "NoSuchDistribution",
            Self::Timeout => "RequestTimeout",
            Self::Other => "InternalError",
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An error returned by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,

    /// Code exactly as the control plane sent it
    pub code: String,

    pub message: String,

    /// HTTP status, when the error came over HTTP
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: kind.code().to_string(),
            message: message.into(),
            status: None,
        }
    }

    /// Build from a wire error body
    ///
    /// A code the controller does not handle stays `Other` whatever the
    /// status; the status is only consulted when the body has no code.
    pub fn from_wire(code: Option<&str>, message: impl Into<String>, status: u16) -> Self {
        let code = code.filter(|c| !c.is_empty());
        let kind = match code {
            Some(code) => ApiErrorKind::from_code(code),
            None => ApiErrorKind::from_status(status),
        };
        Self {
            kind,
            code: code.map_or_else(|| kind.code().to_string(), str::to_string),
            message: message.into(),
            status: Some(status),
        }
    }

    pub fn not_found(id: &str) -> Self {
        Self::new(
            ApiErrorKind::NoSuchDistribution,
            format!("distribution {id} does not exist"),
        )
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ApiErrorKind::NoSuchDistribution
    }
}

/// Distribution operations consumed from the control plane
///
/// Implementations must be Send + Sync; the controller holds one and calls
/// it sequentially.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create a distribution with its initial tags
    async fn create_distribution(
        &self,
        record: &DistributionRecord,
        tags: &Tags,
    ) -> ApiResult<DistributionOutput>;

    /// Fetch the current distribution and its ETag
    async fn get_distribution(&self, id: &str) -> ApiResult<DistributionOutput>;

    /// Replace the configuration; `if_match` must be the current ETag
    async fn update_distribution(
        &self,
        id: &str,
        record: &DistributionRecord,
        if_match: &str,
    ) -> ApiResult<DistributionOutput>;

    /// Delete a disabled distribution; `if_match` must be the current ETag
    async fn delete_distribution(&self, id: &str, if_match: &str) -> ApiResult<()>;

    async fn list_tags(&self, arn: &str) -> ApiResult<Tags>;

    /// Add or overwrite tags
    async fn tag_resource(&self, arn: &str, tags: &Tags) -> ApiResult<()>;

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> ApiResult<()>;

    /// Check if a distribution exists
    async fn exists(&self, id: &str) -> ApiResult<bool> {
        match self.get_distribution(id).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_prefers_code() {
        let err = ApiError::from_wire(Some("InvalidIfMatchVersion"), "bad token", 400);
        assert_eq!(err.kind, ApiErrorKind::InvalidIfMatchVersion);
        assert_eq!(err.status, Some(400));
    }

    #[test]
    fn test_classification_falls_back_to_status() {
        assert_eq!(
            ApiError::from_wire(None, "gone", 404).kind,
            ApiErrorKind::NoSuchDistribution
        );
        assert_eq!(
            ApiError::from_wire(None, "enabled", 409).kind,
            ApiErrorKind::DistributionNotDisabled
        );
        assert_eq!(
            ApiError::from_wire(Some(""), "enabled", 409).kind,
            ApiErrorKind::DistributionNotDisabled
        );
        assert_eq!(
            ApiError::from_wire(None, "stale", 412).kind,
            ApiErrorKind::PreconditionFailed
        );
        assert_eq!(ApiError::from_wire(None, "boom", 500).kind, ApiErrorKind::Other);
    }

    #[test]
    fn test_unhandled_code_is_not_reclassified_by_status() {
        for code in ["ResourceInUse", "CNAMEAlreadyExists", "Conflict"] {
            let err = ApiError::from_wire(Some(code), "conflict", 409);
            assert_eq!(err.kind, ApiErrorKind::Other, "{code}");
            assert_eq!(err.code, code);
        }
        assert_eq!(
            ApiError::from_wire(Some("AccessDenied"), "nope", 404).kind,
            ApiErrorKind::Other
        );
    }

    #[test]
    fn test_display_keeps_upstream_code() {
        let err = ApiError::from_wire(Some("Conflict"), "still enabled", 409);
        assert_eq!(err.to_string(), "Conflict: still enabled");
    }
}
