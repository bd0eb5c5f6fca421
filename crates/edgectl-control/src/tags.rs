//! Tag reconciliation
//!
//! Tags live beside the distribution record rather than inside it, so they
//! are compared and written with their own calls after the primary update.

use edgectl_core::Tags;

use crate::api::{ApiResult, ControlPlane};

/// Changes needed to turn one tag set into another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    /// Tags to add or overwrite
    pub set: Tags,

    /// Keys to remove
    pub remove: Vec<String>,
}

impl TagDiff {
    pub fn between(current: &Tags, desired: &Tags) -> Self {
        let set = desired
            .iter()
            .filter(|(k, v)| current.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let remove = current
            .keys()
            .filter(|k| !desired.contains_key(*k))
            .cloned()
            .collect();
        Self { set, remove }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.remove.is_empty()
    }
}

/// Bring the tags on `arn` from `current` to `desired`
///
/// Returns the diff that was applied. Removals are sent before additions.
pub async fn reconcile<C: ControlPlane + ?Sized>(
    plane: &C,
    arn: &str,
    current: &Tags,
    desired: &Tags,
) -> ApiResult<TagDiff> {
    let diff = TagDiff::between(current, desired);
    if diff.is_empty() {
        return Ok(diff);
    }

    if !diff.remove.is_empty() {
        tracing::debug!(arn, keys = ?diff.remove, "removing tags");
        plane.untag_resource(arn, &diff.remove).await?;
    }
    if !diff.set.is_empty() {
        tracing::debug!(arn, count = diff.set.len(), "writing tags");
        plane.tag_resource(arn, &diff.set).await?;
    }
    Ok(diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockControlPlane, sample_record};

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_diff() {
        let current = tags(&[("env", "prod"), ("team", "web"), ("old", "x")]);
        let desired = tags(&[("env", "prod"), ("team", "edge"), ("new", "y")]);

        let diff = TagDiff::between(&current, &desired);
        assert_eq!(diff.set, tags(&[("team", "edge"), ("new", "y")]));
        assert_eq!(diff.remove, vec!["old".to_string()]);
    }

    #[test]
    fn test_identical_tags_need_nothing() {
        let current = tags(&[("env", "prod")]);
        assert!(TagDiff::between(&current, &current.clone()).is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_calls() {
        let plane = MockControlPlane::new();
        let initial = tags(&[("env", "dev"), ("old", "x")]);
        let created = plane
            .create_distribution(&sample_record(), &initial)
            .await
            .unwrap();
        let arn = created.distribution.arn;

        let desired = tags(&[("env", "prod")]);
        reconcile(&plane, &arn, &initial, &desired).await.unwrap();
        assert_eq!(plane.tags_of(&arn), desired);

        let counts = plane.operation_counts();
        assert_eq!((counts.untags, counts.tag_writes), (1, 1));

        reconcile(&plane, &arn, &desired, &desired).await.unwrap();
        assert_eq!(plane.operation_counts().tag_writes, 1);
    }
}
