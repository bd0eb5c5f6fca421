//! Deployment poller
//!
//! Blocks the calling flow until a distribution reaches `Deployed` (or
//! disappears, for deletes). The schedule is an initial delay followed by
//! fixed-interval polls, bounded by a total timeout and by the caller's
//! deadline when that is earlier. Transient fetch failures consume budget
//! and polling continues.

use edgectl_core::{DistributionOutput, DistributionStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::api::ControlPlane;
use crate::error::{ControlError, Result};

/// Default upper bound for a deployment wait (90 minutes)
pub const DEFAULT_DEPLOY_TIMEOUT: Duration = Duration::from_secs(90 * 60);

/// Poll schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    /// Total time allowed for one wait
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Pause before the first poll when waiting for deployment
    #[serde(default = "default_delay", with = "humantime_serde")]
    pub delay: Duration,

    /// Pause before the first poll when waiting for removal
    #[serde(default = "default_deletion_delay", with = "humantime_serde")]
    pub deletion_delay: Duration,

    /// Pause between polls
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_DEPLOY_TIMEOUT
}

fn default_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_deletion_delay() -> Duration {
    Duration::from_secs(15)
}

fn default_interval() -> Duration {
    Duration::from_secs(15)
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            delay: default_delay(),
            deletion_delay: default_deletion_delay(),
            interval: default_interval(),
        }
    }
}

/// Waits on one control plane
pub struct DeploymentPoller<'a, C: ?Sized> {
    plane: &'a C,
    settings: PollSettings,
}

impl<'a, C: ControlPlane + ?Sized> DeploymentPoller<'a, C> {
    pub fn new(plane: &'a C, settings: PollSettings) -> Self {
        Self { plane, settings }
    }

    /// Effective budget: the configured timeout, shortened by the caller's deadline
    fn budget(&self, deadline: Option<Duration>) -> Duration {
        match deadline {
            Some(d) => d.min(self.settings.timeout),
            None => self.settings.timeout,
        }
    }

    /// Wait until the distribution reports `Deployed`
    ///
    /// A distribution that disappears while waiting surfaces as
    /// [`ControlError::NotFound`].
    pub async fn wait_deployed(
        &self,
        id: &str,
        deadline: Option<Duration>,
    ) -> Result<DistributionOutput> {
        let budget = self.budget(deadline);
        let started = Instant::now();
        let mut last_status: Option<DistributionStatus> = None;

        tracing::info!(id, budget = ?budget, "waiting for deployment");
        tokio::time::sleep(self.settings.delay.min(budget)).await;

        loop {
            match self.plane.get_distribution(id).await {
                Ok(output) if output.distribution.is_deployed() => {
                    tracing::info!(id, waited = ?started.elapsed(), "distribution deployed");
                    return Ok(output);
                }
                Ok(output) => {
                    tracing::debug!(id, status = %output.distribution.status, "still deploying");
                    last_status = Some(output.distribution.status);
                }
                Err(e) if e.is_not_found() => {
                    return Err(ControlError::NotFound { id: id.to_string() });
                }
                Err(e) => {
                    tracing::warn!(id, error = %e, "poll failed, will retry");
                }
            }

            if started.elapsed() + self.settings.interval > budget {
                return Err(ControlError::DeploymentTimeout {
                    id: id.to_string(),
                    last_status,
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(self.settings.interval).await;
        }
    }

    /// Wait until the distribution can no longer be found
    pub async fn wait_absent(&self, id: &str, deadline: Option<Duration>) -> Result<()> {
        let budget = self.budget(deadline);
        let started = Instant::now();
        let mut last_status: Option<DistributionStatus> = None;

        tracing::info!(id, budget = ?budget, "waiting for removal");
        tokio::time::sleep(self.settings.deletion_delay.min(budget)).await;

        loop {
            match self.plane.get_distribution(id).await {
                Err(e) if e.is_not_found() => {
                    tracing::info!(id, waited = ?started.elapsed(), "distribution removed");
                    return Ok(());
                }
                Ok(output) => {
                    tracing::debug!(id, status = %output.distribution.status, "still present");
                    last_status = Some(output.distribution.status);
                }
                Err(e) => {
                    tracing::warn!(id, error = %e, "poll failed, will retry");
                }
            }

            if started.elapsed() + self.settings.interval > budget {
                return Err(ControlError::DeploymentTimeout {
                    id: id.to_string(),
                    last_status,
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(self.settings.interval).await;
        }
    }
}
