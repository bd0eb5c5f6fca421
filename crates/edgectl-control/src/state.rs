//! Lifecycle state machine for a single distribution

use edgectl_core::DistributionStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ControlError, Result};

/// Where a distribution is in its lifecycle, as seen by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    Absent,
    Creating,
    InProgress,
    Deployed,
    Disabling,
    Deleting,
}

impl LifecycleState {
    /// State implied by a deployment status reported by the control plane
    pub fn from_status(status: DistributionStatus) -> Self {
        match status {
            DistributionStatus::InProgress => Self::InProgress,
            DistributionStatus::Deployed => Self::Deployed,
        }
    }

    /// Whether `next` may follow this state
    pub fn can_transition_to(&self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Absent, Creating)
                | (Creating, InProgress)
                | (InProgress, Deployed)
                | (InProgress, InProgress)
                | (Deployed, InProgress)
                | (InProgress | Deployed, Disabling)
                | (InProgress | Deployed, Deleting)
                | (Disabling, InProgress)
                | (Disabling, Deployed)
                | (Disabling, Absent)
                | (Deleting, Disabling)
                | (Deleting, Absent)
        )
    }

    /// Check if this state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Absent | Self::Deployed)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Absent => "absent",
            Self::Creating => "creating",
            Self::InProgress => "in-progress",
            Self::Deployed => "deployed",
            Self::Disabling => "disabling",
            Self::Deleting => "deleting",
        };
        f.write_str(name)
    }
}

/// The ordered states one operation passed through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transitions {
    states: Vec<LifecycleState>,
}

impl Transitions {
    pub fn starting_at(state: LifecycleState) -> Self {
        Self {
            states: vec![state],
        }
    }

    pub fn current(&self) -> LifecycleState {
        self.states.last().copied().unwrap_or(LifecycleState::Absent)
    }

    /// Move to `next`, rejecting transitions the lifecycle does not allow
    pub fn advance(&mut self, next: LifecycleState) -> Result<()> {
        let from = self.current();
        if !from.can_transition_to(next) {
            return Err(ControlError::IllegalTransition { from, to: next });
        }
        tracing::debug!(%from, to = %next, "lifecycle transition");
        self.states.push(next);
        Ok(())
    }

    pub fn states(&self) -> &[LifecycleState] {
        &self.states
    }
}

impl fmt::Display for Transitions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.states.iter().map(ToString::to_string).collect();
        f.write_str(&names.join(" -> "))
    }
}
