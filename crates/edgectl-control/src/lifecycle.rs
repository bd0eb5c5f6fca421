//! Lifecycle controller
//!
//! Drives create, read, update and delete of one distribution against a
//! [`ControlPlane`], applying the retry table from [`crate::retry`] and
//! blocking on the [`DeploymentPoller`] where asked to.

use chrono::{DateTime, Utc};
use edgectl_core::record::{ActiveKeyGroup, ActiveSigner};
use edgectl_core::{
    DistributionConfig, DistributionOutput, DistributionRecord, DistributionStatus, Tags,
    Toggled, expand, flatten,
};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

use crate::api::{ApiResult, ControlPlane};
use crate::config::ControllerConfig;
use crate::error::{ControlError, Result};
use crate::options::{CreateOptions, DeleteOptions, UpdateOptions};
use crate::poller::DeploymentPoller;
use crate::retry::{self, Action, ErrorClass, Operation};
use crate::state::{LifecycleState, Transitions};
use crate::tags;

/// What the caller holds on to between operations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionHandle {
    pub id: String,
    pub arn: String,

    /// Concurrency token of the last observed version
    pub etag: String,

    pub domain_name: String,
    pub status: DistributionStatus,
    pub hosted_zone_id: String,
    pub caller_reference: String,
    pub last_modified_time: DateTime<Utc>,
    pub in_progress_invalidation_batches: u32,
    pub active_trusted_signers: Toggled<ActiveSigner>,
    pub active_trusted_key_groups: Toggled<ActiveKeyGroup>,
    pub tags: Tags,

    /// State the last operation left the distribution in
    pub state: LifecycleState,

    /// States the last operation passed through
    pub transitions: Transitions,

    /// Declarative view reconstructed from the remote record
    pub config: DistributionConfig,
}

/// How a delete ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteResult {
    Deleted,
    /// Disabled and left in place
    Retained,
    /// Nothing to delete
    AlreadyAbsent,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub result: DeleteResult,
    pub transitions: Transitions,
}

/// Reconciles distributions against one control plane
pub struct LifecycleController<C: ControlPlane> {
    plane: C,
    config: ControllerConfig,
}

impl<C: ControlPlane> LifecycleController<C> {
    pub fn new(plane: C, config: ControllerConfig) -> Self {
        Self { plane, config }
    }

    /// Create with default retry windows and poll schedule
    pub fn with_defaults(plane: C) -> Self {
        Self::new(plane, ControllerConfig::default())
    }

    /// Get the control plane
    pub fn plane(&self) -> &C {
        &self.plane
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn poller(&self) -> DeploymentPoller<'_, C> {
        DeploymentPoller::new(&self.plane, self.config.polling)
    }

    fn handle(
        &self,
        output: DistributionOutput,
        tags: Tags,
        transitions: Transitions,
    ) -> DistributionHandle {
        let DistributionOutput { distribution, etag } = output;
        let mut config = flatten(&distribution.distribution_config);
        config.tags = tags.clone();

        DistributionHandle {
            id: distribution.id,
            arn: distribution.arn,
            etag,
            domain_name: distribution.domain_name,
            status: distribution.status,
            hosted_zone_id: self.config.hosted_zone_id.clone(),
            caller_reference: distribution.distribution_config.caller_reference,
            last_modified_time: distribution.last_modified_time,
            in_progress_invalidation_batches: distribution.in_progress_invalidation_batches,
            active_trusted_signers: distribution.active_trusted_signers,
            active_trusted_key_groups: distribution.active_trusted_key_groups,
            tags,
            state: transitions.current(),
            transitions,
            config,
        }
    }

    // ========== Create ==========

    /// Create a distribution from a declarative configuration
    pub async fn create(
        &self,
        config: &DistributionConfig,
        options: &CreateOptions,
    ) -> Result<DistributionHandle> {
        let mut transitions = Transitions::starting_at(LifecycleState::Absent);
        let mut record = expand(config)?;
        if record.caller_reference.is_empty() {
            record.caller_reference = fresh_caller_reference();
        }

        transitions.advance(LifecycleState::Creating)?;
        tracing::info!(caller_reference = %record.caller_reference, "creating distribution");

        let record = &record;
        let tags = &config.tags;
        let output = retry::call(Operation::Create, self.config.certificate_retry, move || {
            self.plane.create_distribution(record, tags)
        })
        .await
        .map_err(|e| ControlError::api("create", None, e))?;

        transitions.advance(LifecycleState::InProgress)?;
        let id = output.distribution.id.clone();
        tracing::info!(id = %id, etag = %output.etag, "distribution created");

        let output = if options.wait {
            let deployed = self.poller().wait_deployed(&id, options.timeout).await?;
            transitions.advance(LifecycleState::Deployed)?;
            deployed
        } else {
            output
        };

        Ok(self.handle(output, config.tags.clone(), transitions))
    }

    // ========== Read ==========

    /// Read the current state of a distribution
    ///
    /// Returns `None` when it no longer exists and has to be recreated.
    pub async fn read(&self, id: &str) -> Result<Option<DistributionHandle>> {
        let output = match self.plane.get_distribution(id).await {
            Ok(output) => output,
            Err(e) if e.is_not_found() => {
                tracing::warn!(id, "distribution not found, it needs to be recreated");
                return Ok(None);
            }
            Err(e) => return Err(ControlError::api("read", Some(id), e)),
        };

        let tags = self
            .plane
            .list_tags(&output.distribution.arn)
            .await
            .map_err(|e| ControlError::api("read tags of", Some(id), e))?;
        let transitions =
            Transitions::starting_at(LifecycleState::from_status(output.distribution.status));

        Ok(Some(self.handle(output, tags, transitions)))
    }

    // ========== Update ==========

    /// Bring a distribution in line with `config`
    ///
    /// The primary update is skipped when only tags differ.
    pub async fn update(
        &self,
        handle: &DistributionHandle,
        config: &DistributionConfig,
        options: &UpdateOptions,
    ) -> Result<DistributionHandle> {
        let id = handle.id.as_str();
        let mut transitions =
            Transitions::starting_at(LifecycleState::from_status(handle.status));

        let mut desired = config.clone();
        desired.caller_reference = Some(handle.caller_reference.clone());
        let changed = desired.normalized() != handle.config.normalized();

        let updated = if changed {
            let record = expand(&desired)?;
            tracing::info!(id, etag = %handle.etag, "updating distribution");
            let output = self.update_with_refresh(id, &record, &handle.etag).await?;
            transitions.advance(LifecycleState::InProgress)?;
            Some(output)
        } else {
            tracing::debug!(id, "configuration unchanged, skipping update");
            None
        };

        let diff = tags::reconcile(&self.plane, &handle.arn, &handle.tags, &config.tags)
            .await
            .map_err(|e| ControlError::api("tag", Some(id), e))?;
        if !diff.is_empty() {
            tracing::info!(id, set = diff.set.len(), removed = diff.remove.len(), "tags reconciled");
        }

        let output = match updated {
            Some(_) if options.wait => {
                let deployed = self.poller().wait_deployed(id, options.timeout).await?;
                transitions.advance(LifecycleState::Deployed)?;
                deployed
            }
            Some(output) => output,
            None => self
                .plane
                .get_distribution(id)
                .await
                .map_err(|e| ControlError::api("read", Some(id), e))?,
        };

        Ok(self.handle(output, config.tags.clone(), transitions))
    }

    /// Update with the certificate retry window, refetching a stale ETag once
    async fn update_with_refresh(
        &self,
        id: &str,
        record: &DistributionRecord,
        etag: &str,
    ) -> Result<DistributionOutput> {
        let window = self.config.certificate_retry;
        let first = retry::call(Operation::Update, window, move || {
            self.plane.update_distribution(id, record, etag)
        })
        .await;

        let err = match first {
            Ok(output) => return Ok(output),
            Err(err) => err,
        };
        if retry::action(Operation::Update, ErrorClass::of(&err)) != Action::RefreshOnce {
            return Err(ControlError::api("update", Some(id), err));
        }

        tracing::warn!(id, error = %err, "stale ETag, refetching once");
        let fresh = self
            .plane
            .get_distribution(id)
            .await
            .map_err(|e| ControlError::api("update", Some(id), e))?;
        let etag = fresh.etag.as_str();

        retry::call(Operation::Update, window, move || {
            self.plane.update_distribution(id, record, etag)
        })
        .await
        .map_err(|e| ControlError::api("update", Some(id), e))
    }

    // ========== Delete ==========

    /// Delete a distribution, or disable it when `options.retain` is set
    ///
    /// Safe to repeat: a distribution that is already gone counts as deleted.
    pub async fn delete(
        &self,
        handle: &DistributionHandle,
        options: &DeleteOptions,
    ) -> Result<DeleteOutcome> {
        if options.retain {
            return self.retain(handle, options).await;
        }

        let id = handle.id.as_str();
        let mut transitions =
            Transitions::starting_at(LifecycleState::from_status(handle.status));
        transitions.advance(LifecycleState::Deleting)?;
        tracing::info!(id, "deleting distribution");

        let result = match self.delete_once(id, &handle.etag).await {
            Err(e) if ErrorClass::of(&e) == ErrorClass::StaleToken => {
                tracing::warn!(id, error = %e, "stale ETag, refetching once");
                match self.plane.get_distribution(id).await {
                    Ok(fresh) => self.delete_once(id, &fresh.etag).await,
                    Err(e) => Err(e),
                }
            }
            other => other,
        };

        let result = match result {
            Ok(()) => DeleteResult::Deleted,
            Err(e) => match retry::action(Operation::Delete, ErrorClass::of(&e)) {
                Action::Succeed => DeleteResult::AlreadyAbsent,
                Action::Detour => {
                    tracing::info!(id, "distribution still enabled, disabling before delete");
                    self.detour(id, options.timeout, &mut transitions).await?
                }
                _ => return Err(ControlError::api("delete", Some(id), e)),
            },
        };

        if result == DeleteResult::Deleted && options.wait {
            self.poller().wait_absent(id, options.timeout).await?;
        }
        transitions.advance(LifecycleState::Absent)?;
        tracing::info!(id, result = ?result, "delete finished");

        Ok(DeleteOutcome {
            result,
            transitions,
        })
    }

    async fn delete_once(&self, id: &str, etag: &str) -> ApiResult<()> {
        retry::call(Operation::Delete, self.config.delete_detour, move || {
            self.plane.delete_distribution(id, etag)
        })
        .await
    }

    /// Disable, wait for the deployment, and delete with a fresh ETag
    ///
    /// Refused deletes and stale tokens restart the detour until the detour
    /// window closes.
    async fn detour(
        &self,
        id: &str,
        deadline: Option<Duration>,
        transitions: &mut Transitions,
    ) -> Result<DeleteResult> {
        let window = self.config.delete_detour;
        let closes = Instant::now() + window.window;
        let poller = self.poller();
        transitions.advance(LifecycleState::Disabling)?;

        loop {
            let current = match self.plane.get_distribution(id).await {
                Ok(output) => output,
                Err(e) if e.is_not_found() => return Ok(DeleteResult::AlreadyAbsent),
                Err(e) => return Err(ControlError::api("delete", Some(id), e)),
            };

            let current = if current.distribution.is_deployed() {
                current
            } else {
                match poller.wait_deployed(id, deadline).await {
                    Err(e) if e.is_not_found() => return Ok(DeleteResult::AlreadyAbsent),
                    other => other?,
                }
            };

            let current = if current.distribution.is_enabled() {
                let mut record = current.distribution.distribution_config.clone();
                record.enabled = false;
                match self
                    .plane
                    .update_distribution(id, &record, &current.etag)
                    .await
                {
                    Ok(_) => {}
                    Err(e) if e.is_not_found() => return Ok(DeleteResult::AlreadyAbsent),
                    Err(e)
                        if ErrorClass::of(&e) == ErrorClass::StaleToken
                            && Instant::now() + window.pause < closes =>
                    {
                        tracing::warn!(id, error = %e, "disable raced another change, retrying");
                        tokio::time::sleep(window.pause).await;
                        continue;
                    }
                    Err(e) => return Err(ControlError::api("disable", Some(id), e)),
                }
                transitions.advance(LifecycleState::InProgress)?;

                let deployed = match poller.wait_deployed(id, deadline).await {
                    Err(e) if e.is_not_found() => return Ok(DeleteResult::AlreadyAbsent),
                    other => other?,
                };
                transitions.advance(LifecycleState::Deployed)?;
                deployed
            } else {
                transitions.advance(LifecycleState::Deployed)?;
                current
            };

            transitions.advance(LifecycleState::Deleting)?;
            match self.plane.delete_distribution(id, &current.etag).await {
                Ok(()) => return Ok(DeleteResult::Deleted),
                Err(e) if e.is_not_found() => return Ok(DeleteResult::AlreadyAbsent),
                Err(e)
                    if matches!(
                        ErrorClass::of(&e),
                        ErrorClass::NotDisabled | ErrorClass::StaleToken
                    ) && Instant::now() + window.pause < closes =>
                {
                    tracing::warn!(id, error = %e, "delete refused, restarting detour");
                    tokio::time::sleep(window.pause).await;
                    transitions.advance(LifecycleState::Disabling)?;
                }
                Err(e) => return Err(ControlError::api("delete", Some(id), e)),
            }
        }
    }

    /// Disable the distribution and leave it in place
    async fn retain(
        &self,
        handle: &DistributionHandle,
        options: &DeleteOptions,
    ) -> Result<DeleteOutcome> {
        let id = handle.id.as_str();
        let mut transitions =
            Transitions::starting_at(LifecycleState::from_status(handle.status));
        transitions.advance(LifecycleState::Disabling)?;

        let current = match self.plane.get_distribution(id).await {
            Ok(output) => output,
            Err(e) if e.is_not_found() => {
                transitions.advance(LifecycleState::Absent)?;
                return Ok(DeleteOutcome {
                    result: DeleteResult::AlreadyAbsent,
                    transitions,
                });
            }
            Err(e) => return Err(ControlError::api("disable", Some(id), e)),
        };

        if current.distribution.is_enabled() {
            let mut record = current.distribution.distribution_config.clone();
            record.enabled = false;
            tracing::info!(id, "disabling distribution, it will be retained");
            self.update_with_refresh(id, &record, &current.etag).await?;
            self.poller().wait_deployed(id, options.timeout).await?;
        } else if !current.distribution.is_deployed() {
            self.poller().wait_deployed(id, options.timeout).await?;
        }

        transitions.advance(LifecycleState::Deployed)?;
        tracing::warn!(id, "distribution retained, delete it manually when no longer needed");

        Ok(DeleteOutcome {
            result: DeleteResult::Retained,
            transitions,
        })
    }
}

/// Idempotency token for a create without an explicit caller reference
fn fresh_caller_reference() -> String {
    format!(
        "edgectl-{}-{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        hex::encode(rand::random::<[u8; 4]>())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ApiErrorKind};
    use crate::mock::{MockCall, MockControlPlane, sample_record};

    fn controller() -> LifecycleController<MockControlPlane> {
        LifecycleController::with_defaults(MockControlPlane::new())
    }

    fn sample_config() -> DistributionConfig {
        let mut config = flatten(&sample_record());
        config.tags.insert("team".to_string(), "edge".to_string());
        config
    }

    async fn seeded(
        ctl: &LifecycleController<MockControlPlane>,
        enabled: bool,
    ) -> DistributionHandle {
        let mut record = sample_record();
        record.caller_reference = "seed-1".to_string();
        record.enabled = enabled;
        let output = ctl.plane().seed(record, DistributionStatus::Deployed);
        let handle = ctl.read(&output.distribution.id).await.unwrap().unwrap();
        ctl.plane().reset_counts();
        handle
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_waits_for_deployment() {
        let ctl = controller();
        let config = sample_config();

        let handle = ctl
            .create(&config, &CreateOptions::new().with_wait())
            .await
            .unwrap();

        assert!(handle.caller_reference.starts_with("edgectl-"));
        assert_eq!(handle.status, DistributionStatus::Deployed);
        assert_eq!(handle.hosted_zone_id, "Z2FDTNDATAQYW2");
        assert_eq!(
            handle.transitions.states(),
            [
                LifecycleState::Absent,
                LifecycleState::Creating,
                LifecycleState::InProgress,
                LifecycleState::Deployed
            ]
        );

        let mut expected = config.normalized();
        expected.caller_reference = Some(handle.caller_reference.clone());
        expected.tags = config.tags.clone();
        assert_eq!(handle.config, expected);
        assert_eq!(ctl.plane().tags_of(&handle.arn), config.tags);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_keeps_explicit_caller_reference() {
        let ctl = controller();
        let mut config = sample_config();
        config.caller_reference = Some("my-ref".to_string());

        let handle = ctl.create(&config, &CreateOptions::new()).await.unwrap();
        assert_eq!(handle.caller_reference, "my-ref");
        assert_eq!(handle.state, LifecycleState::InProgress);
        assert_eq!(ctl.plane().operation_counts().gets, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_retries_certificate_propagation() {
        let ctl = controller();
        for _ in 0..2 {
            ctl.plane().fail_next(
                MockCall::Create,
                ApiError::new(ApiErrorKind::InvalidViewerCertificate, "certificate not found"),
            );
        }

        ctl.create(&sample_config(), &CreateOptions::new())
            .await
            .unwrap();
        assert_eq!(ctl.plane().operation_counts().creates, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_makes_no_calls() {
        let ctl = controller();
        let mut config = sample_config();
        config.origins.clear();

        let err = ctl
            .create(&config, &CreateOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Validation(_)));
        assert_eq!(ctl.plane().operation_counts(), Default::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_missing_returns_none() {
        let ctl = controller();
        assert!(ctl.read("EMISSING").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_refreshes_stale_etag_once() {
        let ctl = controller();
        let handle = seeded(&ctl, true).await;
        ctl.plane().bump_etag(&handle.id);

        let mut config = handle.config.clone();
        config.comment = Some("updated".to_string());
        let updated = ctl
            .update(&handle, &config, &UpdateOptions::new())
            .await
            .unwrap();

        let counts = ctl.plane().operation_counts();
        assert_eq!((counts.updates, counts.gets), (2, 1));
        assert_eq!(updated.config.comment.as_deref(), Some("updated"));
        assert_ne!(updated.etag, handle.etag);
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_gives_up_after_second_stale_etag() {
        let ctl = controller();
        let handle = seeded(&ctl, true).await;
        for _ in 0..2 {
            ctl.plane().fail_next(
                MockCall::Update,
                ApiError::new(ApiErrorKind::PreconditionFailed, "stale"),
            );
        }

        let mut config = handle.config.clone();
        config.comment = Some("updated".to_string());
        let err = ctl
            .update(&handle, &config, &UpdateOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ControlError::Api { operation: "update", .. }));
        let counts = ctl.plane().operation_counts();
        assert_eq!((counts.updates, counts.gets), (2, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tag_only_change_skips_update() {
        let ctl = controller();
        let handle = seeded(&ctl, true).await;

        let mut config = handle.config.clone();
        config.tags.insert("env".to_string(), "prod".to_string());
        let updated = ctl
            .update(&handle, &config, &UpdateOptions::new().with_wait())
            .await
            .unwrap();

        let counts = ctl.plane().operation_counts();
        assert_eq!((counts.updates, counts.tag_writes), (0, 1));
        assert_eq!(updated.tags, config.tags);
        assert_eq!(updated.transitions.states(), [LifecycleState::Deployed]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retain_disabled_makes_no_changes() {
        let ctl = controller();
        let handle = seeded(&ctl, false).await;

        let outcome = ctl
            .delete(&handle, &DeleteOptions::new().retain())
            .await
            .unwrap();

        assert_eq!(outcome.result, DeleteResult::Retained);
        let counts = ctl.plane().operation_counts();
        assert_eq!((counts.updates, counts.deletes), (0, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retain_enabled_disables_once() {
        let ctl = controller();
        let handle = seeded(&ctl, true).await;

        let outcome = ctl
            .delete(&handle, &DeleteOptions::new().retain())
            .await
            .unwrap();

        assert_eq!(outcome.result, DeleteResult::Retained);
        assert_eq!(
            outcome.transitions.states(),
            [
                LifecycleState::Deployed,
                LifecycleState::Disabling,
                LifecycleState::Deployed
            ]
        );
        let counts = ctl.plane().operation_counts();
        assert_eq!((counts.updates, counts.deletes), (1, 0));
        let stored = ctl.plane().distribution(&handle.id).unwrap();
        assert!(!stored.is_enabled());
        // waited on even though the options did not ask for it
        assert!(stored.is_deployed());
        assert!(counts.gets >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_detours_through_disable() {
        let ctl = controller();
        let handle = seeded(&ctl, true).await;

        let outcome = ctl.delete(&handle, &DeleteOptions::new()).await.unwrap();

        assert_eq!(outcome.result, DeleteResult::Deleted);
        assert_eq!(
            outcome.transitions.to_string(),
            "deployed -> deleting -> disabling -> in-progress -> deployed -> deleting -> absent"
        );
        let counts = ctl.plane().operation_counts();
        assert_eq!((counts.updates, counts.deletes), (1, 2));
        assert_eq!(ctl.plane().distribution_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_disabled_directly() {
        let ctl = controller();
        let handle = seeded(&ctl, false).await;

        let outcome = ctl
            .delete(&handle, &DeleteOptions::new().with_wait())
            .await
            .unwrap();

        assert_eq!(outcome.result, DeleteResult::Deleted);
        let counts = ctl.plane().operation_counts();
        assert_eq!((counts.updates, counts.deletes), (0, 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_missing_is_success() {
        let ctl = controller();
        let handle = seeded(&ctl, false).await;
        ctl.delete(&handle, &DeleteOptions::new()).await.unwrap();

        let again = ctl.delete(&handle, &DeleteOptions::new()).await.unwrap();
        assert_eq!(again.result, DeleteResult::AlreadyAbsent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrelated_conflict_does_not_disable() {
        let ctl = controller();
        let handle = seeded(&ctl, true).await;
        ctl.plane().fail_next(
            MockCall::Delete,
            ApiError::from_wire(Some("ResourceInUse"), "in use", 409),
        );

        let err = ctl.delete(&handle, &DeleteOptions::new()).await.unwrap_err();

        assert!(matches!(err, ControlError::Api { operation: "delete", .. }));
        let counts = ctl.plane().operation_counts();
        assert_eq!((counts.deletes, counts.updates), (1, 0));
        let stored = ctl.plane().distribution(&handle.id).unwrap();
        assert!(stored.distribution_config.enabled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_refreshes_stale_etag_once() {
        let ctl = controller();
        let handle = seeded(&ctl, false).await;
        ctl.plane().bump_etag(&handle.id);

        let outcome = ctl.delete(&handle, &DeleteOptions::new()).await.unwrap();

        assert_eq!(outcome.result, DeleteResult::Deleted);
        let counts = ctl.plane().operation_counts();
        assert_eq!((counts.deletes, counts.gets), (2, 1));
    }
}
