//! Mock control plane for testing
//!
//! Keeps distributions in memory and enforces the same contract the real
//! control plane does: If-Match must carry the current ETag, and only a
//! disabled, deployed distribution can be deleted. Deployment latency, fault
//! injection and out-of-band modifications are configurable.

use async_trait::async_trait;
use chrono::Utc;
use edgectl_core::{
    Distribution, DistributionOutput, DistributionRecord, DistributionStatus, Tags, Toggled,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::{ApiError, ApiErrorKind, ApiResult, ControlPlane};

/// In-memory control plane for testing
#[derive(Clone)]
pub struct MockControlPlane {
    state: Arc<Mutex<MockState>>,
}

/// Counts of calls received, for assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub creates: usize,
    pub gets: usize,
    pub updates: usize,
    pub deletes: usize,
    pub tag_lists: usize,
    pub tag_writes: usize,
    pub untags: usize,
}

/// Control-plane call a fault can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    Create,
    Get,
    Update,
    Delete,
    ListTags,
    TagResource,
    UntagResource,
}

struct Stored {
    distribution: Distribution,
    etag: String,
    /// Polls left before `InProgress` turns into `Deployed`; `None` never deploys
    polls_remaining: Option<u32>,
}

struct MockState {
    distributions: HashMap<String, Stored>,
    tags: HashMap<String, Tags>,
    counts: OperationCounts,
    faults: HashMap<MockCall, VecDeque<ApiError>>,
    removals: HashMap<String, u32>,
    deploy_after: Option<u32>,
    next_id: u64,
    next_etag: u64,
}

impl MockState {
    fn fault(&mut self, call: MockCall) -> ApiResult<()> {
        match self.faults.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn etag(&mut self) -> String {
        self.next_etag += 1;
        format!("E{:04}", self.next_etag)
    }

    fn output(&self, id: &str) -> ApiResult<DistributionOutput> {
        self.distributions
            .get(id)
            .map(|s| DistributionOutput {
                distribution: s.distribution.clone(),
                etag: s.etag.clone(),
            })
            .ok_or_else(|| ApiError::not_found(id))
    }

    fn check_if_match(&self, id: &str, if_match: &str) -> ApiResult<()> {
        let stored = self
            .distributions
            .get(id)
            .ok_or_else(|| ApiError::not_found(id))?;
        if stored.etag != if_match {
            return Err(ApiError::new(
                ApiErrorKind::PreconditionFailed,
                format!("If-Match {if_match} does not match current ETag {}", stored.etag),
            ));
        }
        Ok(())
    }
}

impl MockControlPlane {
    /// Create an empty mock; distributions deploy on the first poll
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                distributions: HashMap::new(),
                tags: HashMap::new(),
                counts: OperationCounts::default(),
                faults: HashMap::new(),
                removals: HashMap::new(),
                deploy_after: Some(1),
                next_id: 0,
                next_etag: 0,
            })),
        }
    }

    /// Report `Deployed` on the n-th poll after each change
    pub fn with_deploy_after(self, polls: u32) -> Self {
        self.lock().deploy_after = Some(polls.max(1));
        self
    }

    /// Keep every change `InProgress` forever
    pub fn never_deploy(self) -> Self {
        self.lock().deploy_after = None;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.lock().counts.clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        self.lock().counts = OperationCounts::default();
    }

    /// Make the next call of this kind fail with `err`
    pub fn fail_next(&self, call: MockCall, err: ApiError) {
        self.lock().faults.entry(call).or_default().push_back(err);
    }

    /// Make the next gets fail, in order
    pub fn fail_next_gets(&self, errors: Vec<ApiError>) {
        for err in errors {
            self.fail_next(MockCall::Get, err);
        }
    }

    /// Remove a distribution after it has been read `gets` more times
    pub fn remove_after_gets(&self, id: &str, gets: u32) {
        self.lock().removals.insert(id.to_string(), gets);
    }

    /// Simulate an out-of-band modification: the stored ETag changes
    pub fn bump_etag(&self, id: &str) -> Option<String> {
        let mut state = self.lock();
        let etag = state.etag();
        let stored = state.distributions.get_mut(id)?;
        stored.etag = etag.clone();
        stored.distribution.last_modified_time = Utc::now();
        Some(etag)
    }

    /// Insert a distribution directly, without counting a call
    pub fn seed(&self, record: DistributionRecord, status: DistributionStatus) -> DistributionOutput {
        let mut state = self.lock();
        let (id, stored) = new_distribution(&mut state, record, status);
        let output = DistributionOutput {
            distribution: stored.distribution.clone(),
            etag: stored.etag.clone(),
        };
        state.distributions.insert(id, stored);
        output
    }

    /// Current state of a distribution, without counting a call
    pub fn distribution(&self, id: &str) -> Option<Distribution> {
        self.lock()
            .distributions
            .get(id)
            .map(|s| s.distribution.clone())
    }

    pub fn current_etag(&self, id: &str) -> Option<String> {
        self.lock().distributions.get(id).map(|s| s.etag.clone())
    }

    /// Tags attached to a resource, without counting a call
    pub fn tags_of(&self, arn: &str) -> Tags {
        self.lock().tags.get(arn).cloned().unwrap_or_default()
    }

    pub fn distribution_count(&self) -> usize {
        self.lock().distributions.len()
    }
}

impl Default for MockControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

fn new_distribution(
    state: &mut MockState,
    record: DistributionRecord,
    status: DistributionStatus,
) -> (String, Stored) {
    state.next_id += 1;
    let id = format!("EMOCK{:08}", state.next_id);
    let etag = state.etag();
    let polls_remaining = match status {
        DistributionStatus::InProgress => state.deploy_after,
        DistributionStatus::Deployed => None,
    };

    let distribution = Distribution {
        id: id.clone(),
        arn: format!("arn:aws:cloudfront::123456789012:distribution/{id}"),
        domain_name: format!("{}.cloudfront.net", id.to_lowercase()),
        status,
        last_modified_time: Utc::now(),
        in_progress_invalidation_batches: 0,
        active_trusted_signers: Toggled::default(),
        active_trusted_key_groups: Toggled::default(),
        distribution_config: record,
    };

    (
        id,
        Stored {
            distribution,
            etag,
            polls_remaining,
        },
    )
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn create_distribution(
        &self,
        record: &DistributionRecord,
        tags: &Tags,
    ) -> ApiResult<DistributionOutput> {
        let mut state = self.lock();
        state.counts.creates += 1;
        state.fault(MockCall::Create)?;

        let duplicate = !record.caller_reference.is_empty()
            && state
                .distributions
                .values()
                .any(|s| s.distribution.distribution_config.caller_reference == record.caller_reference);
        if duplicate {
            return Err(ApiError::new(
                ApiErrorKind::Other,
                format!("caller reference {} already used", record.caller_reference),
            ));
        }

        let (id, stored) = new_distribution(&mut state, record.clone(), DistributionStatus::InProgress);
        let arn = stored.distribution.arn.clone();
        state.distributions.insert(id.clone(), stored);
        if !tags.is_empty() {
            state.tags.insert(arn, tags.clone());
        }
        state.output(&id)
    }

    async fn get_distribution(&self, id: &str) -> ApiResult<DistributionOutput> {
        let mut state = self.lock();
        state.counts.gets += 1;
        state.fault(MockCall::Get)?;

        if let Some(remaining) = state.removals.get_mut(id) {
            if *remaining == 0 {
                state.removals.remove(id);
                state.distributions.remove(id);
            } else {
                *remaining -= 1;
            }
        }

        let stored = state
            .distributions
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(id))?;
        if let Some(polls) = stored.polls_remaining {
            let polls = polls.saturating_sub(1);
            if polls == 0 {
                stored.distribution.status = DistributionStatus::Deployed;
                stored.polls_remaining = None;
            } else {
                stored.polls_remaining = Some(polls);
            }
        }
        state.output(id)
    }

    async fn update_distribution(
        &self,
        id: &str,
        record: &DistributionRecord,
        if_match: &str,
    ) -> ApiResult<DistributionOutput> {
        let mut state = self.lock();
        state.counts.updates += 1;
        state.fault(MockCall::Update)?;
        state.check_if_match(id, if_match)?;

        let etag = state.etag();
        let deploy_after = state.deploy_after;
        if let Some(stored) = state.distributions.get_mut(id) {
            stored.distribution.distribution_config = record.clone();
            stored.distribution.status = DistributionStatus::InProgress;
            stored.distribution.last_modified_time = Utc::now();
            stored.polls_remaining = deploy_after;
            stored.etag = etag;
        }
        state.output(id)
    }

    async fn delete_distribution(&self, id: &str, if_match: &str) -> ApiResult<()> {
        let mut state = self.lock();
        state.counts.deletes += 1;
        state.fault(MockCall::Delete)?;
        state.check_if_match(id, if_match)?;

        let ready = state
            .distributions
            .get(id)
            .is_some_and(|s| !s.distribution.is_enabled() && s.distribution.is_deployed());
        if !ready {
            return Err(ApiError::new(
                ApiErrorKind::DistributionNotDisabled,
                format!("distribution {id} must be disabled and deployed before deletion"),
            ));
        }

        if let Some(stored) = state.distributions.remove(id) {
            state.tags.remove(&stored.distribution.arn);
        }
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> ApiResult<Tags> {
        let mut state = self.lock();
        state.counts.tag_lists += 1;
        state.fault(MockCall::ListTags)?;
        Ok(state.tags.get(arn).cloned().unwrap_or_default())
    }

    async fn tag_resource(&self, arn: &str, tags: &Tags) -> ApiResult<()> {
        let mut state = self.lock();
        state.counts.tag_writes += 1;
        state.fault(MockCall::TagResource)?;
        let entry = state.tags.entry(arn.to_string()).or_default();
        entry.extend(tags.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> ApiResult<()> {
        let mut state = self.lock();
        state.counts.untags += 1;
        state.fault(MockCall::UntagResource)?;
        if let Some(tags) = state.tags.get_mut(arn) {
            for key in keys {
                tags.remove(key);
            }
        }
        Ok(())
    }
}

/// A small valid record for unit tests
#[cfg(test)]
pub(crate) fn sample_record() -> DistributionRecord {
    let config = edgectl_core::DistributionConfig::from_yaml_str(
        r#"
enabled: true
origins:
  - origin_id: site
    domain_name: site.s3.amazonaws.com
default_cache_behavior:
  target_origin_id: site
  viewer_protocol_policy: redirect-to-https
  allowed_methods: [GET, HEAD]
  cached_methods: [GET, HEAD]
  cache_policy_id: 658327ea-f89d-4fab-a63d-7e88639e58f6
viewer_certificate:
  cloudfront_default_certificate: true
"#,
    )
    .expect("sample config parses");
    edgectl_core::expand(&config).expect("sample config expands")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_create_and_get() {
        let plane = MockControlPlane::new();
        let created = plane
            .create_distribution(&sample_record(), &Tags::new())
            .await
            .unwrap();
        assert_eq!(created.distribution.status, DistributionStatus::InProgress);

        let fetched = plane.get_distribution(&created.distribution.id).await.unwrap();
        assert!(fetched.distribution.is_deployed());
        assert_eq!(fetched.etag, created.etag);

        let counts = plane.operation_counts();
        assert_eq!((counts.creates, counts.gets), (1, 1));
    }

    #[tokio::test]
    async fn test_mock_update_enforces_if_match() {
        let plane = MockControlPlane::new();
        let created = plane.seed(sample_record(), DistributionStatus::Deployed);
        let id = &created.distribution.id;

        let err = plane
            .update_distribution(id, &sample_record(), "stale")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::PreconditionFailed);

        let updated = plane
            .update_distribution(id, &sample_record(), &created.etag)
            .await
            .unwrap();
        assert_ne!(updated.etag, created.etag);
        assert_eq!(updated.distribution.status, DistributionStatus::InProgress);
    }

    #[tokio::test]
    async fn test_mock_delete_requires_disabled() {
        let plane = MockControlPlane::new();
        let created = plane.seed(sample_record(), DistributionStatus::Deployed);
        let id = &created.distribution.id;

        let err = plane.delete_distribution(id, &created.etag).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::DistributionNotDisabled);

        let mut disabled = sample_record();
        disabled.enabled = false;
        let updated = plane
            .update_distribution(id, &disabled, &created.etag)
            .await
            .unwrap();
        // still in progress
        let err = plane.delete_distribution(id, &updated.etag).await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::DistributionNotDisabled);

        plane.get_distribution(id).await.unwrap();
        plane.delete_distribution(id, &updated.etag).await.unwrap();
        assert_eq!(plane.distribution_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_fault_injection() {
        let plane = MockControlPlane::new();
        plane.fail_next(
            MockCall::Create,
            ApiError::new(ApiErrorKind::InvalidViewerCertificate, "not yet"),
        );

        let err = plane
            .create_distribution(&sample_record(), &Tags::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::InvalidViewerCertificate);
        assert!(plane
            .create_distribution(&sample_record(), &Tags::new())
            .await
            .is_ok());
        assert_eq!(plane.operation_counts().creates, 2);
    }

    #[tokio::test]
    async fn test_mock_bump_etag() {
        let plane = MockControlPlane::new();
        let created = plane.seed(sample_record(), DistributionStatus::Deployed);
        let bumped = plane.bump_etag(&created.distribution.id).unwrap();
        assert_ne!(bumped, created.etag);
        assert_eq!(plane.current_etag(&created.distribution.id), Some(bumped));
    }

    #[tokio::test]
    async fn test_mock_tags() {
        let plane = MockControlPlane::new();
        let tags: Tags = [("team".to_string(), "web".to_string())].into();
        let created = plane.create_distribution(&sample_record(), &tags).await.unwrap();
        let arn = &created.distribution.arn;

        assert_eq!(plane.list_tags(arn).await.unwrap(), tags);
        plane
            .untag_resource(arn, &["team".to_string()])
            .await
            .unwrap();
        assert!(plane.tags_of(arn).is_empty());
    }
}
