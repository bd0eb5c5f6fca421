//! edgectl control - reconciling distributions against the control plane
//!
//! This crate provides:
//! - **Control plane contract**: the async [`ControlPlane`] trait, with an HTTP client and an in-memory mock
//! - **Lifecycle controller**: create, read, update and delete with ETag concurrency
//! - **Retry table**: certificate propagation, stale tokens, the disable-then-delete detour
//! - **Deployment poller**: waits for `Deployed` or for removal, bounded by a timeout
//! - **Tag reconciliation**: tags are written beside the record, after the primary update

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod mock;
pub mod options;
pub mod poller;
pub mod retry;
pub mod state;
pub mod tags;

pub use api::{ApiError, ApiErrorKind, ApiResult, ControlPlane};
pub use config::ControllerConfig;
pub use error::{ControlError, Result};
pub use http::HttpControlPlane;
pub use lifecycle::{DeleteOutcome, DeleteResult, DistributionHandle, LifecycleController};
pub use mock::{MockCall, MockControlPlane, OperationCounts};
pub use options::{CreateOptions, DeleteOptions, UpdateOptions};
pub use poller::{DeploymentPoller, PollSettings};
pub use retry::{ErrorClass, RetryWindow};
pub use state::{LifecycleState, Transitions};
pub use tags::TagDiff;
