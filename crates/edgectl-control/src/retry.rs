//! Retry table keyed by upstream error class
//!
//! | class                  | create          | update          | delete        |
//! |------------------------|-----------------|-----------------|---------------|
//! | CertificatePropagation | retry in window | retry in window | fail          |
//! | StaleToken             | fail            | refresh once    | refresh once  |
//! | NotDisabled            | fail            | fail            | detour        |
//! | NotFound               | fail            | fail            | success       |
//! | TransportTimeout       | final retry     | final retry     | final retry   |
//! | Fatal                  | fail            | fail            | fail          |
//!
//! [`call`] carries out the two actions that need nothing but the request
//! itself. Refresh, detour and success need resource context and are left to
//! the lifecycle controller.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::api::{ApiError, ApiErrorKind, ApiResult};

/// Upstream errors grouped by how they are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    CertificatePropagation,
    StaleToken,
    NotDisabled,
    NotFound,
    TransportTimeout,
    Fatal,
}

impl ErrorClass {
    pub fn of(err: &ApiError) -> Self {
        match err.kind {
            ApiErrorKind::InvalidViewerCertificate => Self::CertificatePropagation,
            ApiErrorKind::PreconditionFailed | ApiErrorKind::InvalidIfMatchVersion => {
                Self::StaleToken
            }
            ApiErrorKind::DistributionNotDisabled => Self::NotDisabled,
            ApiErrorKind::NoSuchDistribution => Self::NotFound,
            ApiErrorKind::Timeout => Self::TransportTimeout,
            ApiErrorKind::Other => Self::Fatal,
        }
    }
}

/// Mutating operation a failed call belonged to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// What to do about a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Repeat the identical request until the retry window closes
    RetryInWindow,
    /// Refetch the ETag once and repeat with the fresh token
    RefreshOnce,
    /// Disable, wait for deployment, then delete again
    Detour,
    /// The error means the goal is already reached
    Succeed,
    /// Repeat the identical request once more
    FinalRetry,
    Fail,
}

/// Look up the handling for an error class during an operation
pub fn action(operation: Operation, class: ErrorClass) -> Action {
    use Action::*;
    use ErrorClass::*;
    use Operation::*;

    match (class, operation) {
        (CertificatePropagation, Create | Update) => RetryInWindow,
        (StaleToken, Update | Delete) => RefreshOnce,
        (NotDisabled, Delete) => Detour,
        (NotFound, Delete) => Succeed,
        (TransportTimeout, _) => FinalRetry,
        _ => Fail,
    }
}

/// Retry budget for errors handled by repeating the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryWindow {
    /// Total time spent repeating a request
    #[serde(with = "humantime_serde")]
    pub window: Duration,

    /// Pause between two attempts
    #[serde(with = "humantime_serde")]
    pub pause: Duration,
}

impl RetryWindow {
    pub fn new(window: Duration, pause: Duration) -> Self {
        Self { window, pause }
    }
}

/// Issue a request, applying the in-window and final retries from the table
///
/// Any other error is returned for the caller to handle.
pub async fn call<T, F, Fut>(operation: Operation, window: RetryWindow, mut request: F) -> ApiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let deadline = Instant::now() + window.window;
    let mut window_closed = false;
    let mut final_retry_used = false;
    let mut attempt = 1u32;

    loop {
        let err = match request().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        match action(operation, ErrorClass::of(&err)) {
            Action::RetryInWindow if !window_closed => {
                if Instant::now() + window.pause < deadline {
                    tracing::warn!(
                        operation = operation.name(),
                        attempt,
                        error = %err,
                        "transient error, retrying"
                    );
                    tokio::time::sleep(window.pause).await;
                } else {
                    // one unconditional attempt after the window closes
                    tracing::warn!(
                        operation = operation.name(),
                        attempt,
                        "retry window exhausted, making a final attempt"
                    );
                    window_closed = true;
                }
            }
            Action::FinalRetry if !final_retry_used => {
                tracing::warn!(
                    operation = operation.name(),
                    error = %err,
                    "transport timeout, retrying once"
                );
                final_retry_used = true;
            }
            _ => return Err(err),
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn window() -> RetryWindow {
        RetryWindow::new(Duration::from_secs(60), Duration::from_secs(2))
    }

    #[test]
    fn test_table() {
        use ErrorClass::*;
        use Operation::*;

        assert_eq!(action(Create, CertificatePropagation), Action::RetryInWindow);
        assert_eq!(action(Delete, CertificatePropagation), Action::Fail);
        assert_eq!(action(Create, StaleToken), Action::Fail);
        assert_eq!(action(Update, StaleToken), Action::RefreshOnce);
        assert_eq!(action(Delete, NotDisabled), Action::Detour);
        assert_eq!(action(Update, NotDisabled), Action::Fail);
        assert_eq!(action(Delete, NotFound), Action::Succeed);
        assert_eq!(action(Update, NotFound), Action::Fail);
        for op in [Create, Update, Delete] {
            assert_eq!(action(op, TransportTimeout), Action::FinalRetry);
            assert_eq!(action(op, Fatal), Action::Fail);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_certificate_error_retried_until_success() {
        let calls = &AtomicU32::new(0);
        let result = call(Operation::Create, window(), move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 3 {
                Err(ApiError::new(ApiErrorKind::InvalidViewerCertificate, "not yet"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expiry_allows_one_final_attempt() {
        let calls = &AtomicU32::new(0);
        let started = Instant::now();
        let result: ApiResult<()> = call(Operation::Update, window(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::new(ApiErrorKind::InvalidViewerCertificate, "never"))
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::InvalidViewerCertificate);
        // 30 attempts inside the window, then the final one
        assert_eq!(calls.load(Ordering::SeqCst), 31);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_timeout_gets_one_retry() {
        let calls = &AtomicU32::new(0);
        let result: ApiResult<()> = call(Operation::Delete, window(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::timeout("read timed out"))
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ApiErrorKind::Timeout);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_errors_are_returned_immediately() {
        let calls = &AtomicU32::new(0);
        let result: ApiResult<()> = call(Operation::Delete, window(), move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::new(ApiErrorKind::DistributionNotDisabled, "enabled"))
        })
        .await;

        assert_eq!(result.unwrap_err().kind, ApiErrorKind::DistributionNotDisabled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
