// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The incident: the central stateful record of a fault from detection
//! through resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::anomaly::AnomalyVerdict;
use crate::container::ContainerId;
use crate::error::ErrorKind;

/// Monotonically increasing incident id, assigned
/// by the store rather than generated client-side like [`crate::id`]'s
/// nanoid-backed ids, so consumers can sort by detection order without a
/// timestamp tiebreak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(pub u64);

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inc-{}", self.0)
    }
}

/// Process-wide monotonic counter minting [`IncidentId`]s. Owned by the
/// incident store; not `Clone` so there is exactly one source of truth per
/// process.
#[derive(Debug, Default)]
pub struct IncidentIdGen(AtomicU64);

impl IncidentIdGen {
    pub const fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub fn next(&self) -> IncidentId {
        IncidentId(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

/// The incident's state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentState {
    New,
    Analyzing,
    Remediating,
    Verifying,
    Resolved,
    Failed,
    Unresolved,
}

crate::simple_display! {
    IncidentState {
        New => "new",
        Analyzing => "analyzing",
        Remediating => "remediating",
        Verifying => "verifying",
        Resolved => "resolved",
        Failed => "failed",
        Unresolved => "unresolved",
    }
}

impl IncidentState {
    /// Terminal states are never mutated further.
    pub fn is_terminal(self) -> bool {
        matches!(self, IncidentState::Resolved | IncidentState::Failed | IncidentState::Unresolved)
    }

    /// Whether `self -> next` is an edge in the state machine's transition diagram.
    pub fn can_transition_to(self, next: IncidentState) -> bool {
        use IncidentState::*;
        matches!(
            (self, next),
            (New, Analyzing)
                | (Analyzing, Remediating)
                | (Analyzing, Unresolved)
                | (Remediating, Verifying)
                | (Remediating, Failed)
                | (Verifying, Resolved)
                | (Verifying, Failed)
        )
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum IncidentError {
    #[error("incident {id} is in terminal state {state} and cannot be mutated")]
    Terminal { id: IncidentId, state: IncidentState },
    #[error("invalid transition for incident {id}: {from} -> {to}")]
    InvalidTransition { id: IncidentId, from: IncidentState, to: IncidentState },
    #[error("incident {id} does not exist")]
    NotFound { id: IncidentId },
}

/// A single action in a [`RemediationPlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAction {
    pub tool: String,
    pub target_container: ContainerId,
    pub params: serde_json::Map<String, serde_json::Value>,
    /// 1 (highest) .. 5 (lowest).
    pub priority: u8,
    pub rationale: String,
}

/// An ordered, immutable-once-produced list of remediation actions
/// Produced by the root-cause engine from the deep analyzer's response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub actions: Vec<PlannedAction>,
}

impl RemediationPlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions in execution order: priority ascending (lower number first),
    /// ties broken by original insertion order (a stable sort preserves this).
    pub fn in_execution_order(&self) -> Vec<&PlannedAction> {
        let mut ordered: Vec<&PlannedAction> = self.actions.iter().collect();
        ordered.sort_by_key(|a| a.priority);
        ordered
    }
}

/// The deep analyzer's translated response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseAnalysis {
    pub root_cause: String,
    pub explanation: String,
    pub affected_components: Vec<String>,
    /// Tool names from the analyzer's recommendation that were absent from
    /// the gateway's catalog and were dropped, retained for dashboard
    /// visibility.
    #[serde(default)]
    pub dropped_actions: Vec<String>,
}

/// The outcome of executing one [`PlannedAction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutcomeRecord {
    pub incident_id: IncidentId,
    pub action: PlannedAction,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    pub duration_ms: u64,
    pub attempt: u32,
}

/// A stateful record of a fault from detection through resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub container_id: ContainerId,
    pub service: String,
    pub detected_at_ms: u64,
    pub state: IncidentState,
    pub verdict: AnomalyVerdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<RootCauseAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<RemediationPlan>,
    #[serde(default)]
    pub outcomes: Vec<ActionOutcomeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorKind>,
}

impl Incident {
    pub fn new(id: IncidentId, service: impl Into<String>, verdict: AnomalyVerdict, now_ms: u64) -> Self {
        Self {
            id,
            container_id: verdict.container_id.clone(),
            service: service.into(),
            detected_at_ms: now_ms,
            state: IncidentState::New,
            verdict,
            root_cause: None,
            plan: None,
            outcomes: Vec::new(),
            resolved_at_ms: None,
            explanation: None,
            last_error: None,
        }
    }

    /// Move to `next`, enforcing the state machine's transition diagram and
    /// the "terminal states are never mutated" invariant. On success,
    /// terminal target states stamp `resolved_at_ms`.
    pub fn transition(&mut self, next: IncidentState, now_ms: u64) -> Result<(), IncidentError> {
        if self.state.is_terminal() {
            return Err(IncidentError::Terminal { id: self.id, state: self.state });
        }
        if !self.state.can_transition_to(next) {
            return Err(IncidentError::InvalidTransition { id: self.id, from: self.state, to: next });
        }
        self.state = next;
        if next.is_terminal() {
            self.resolved_at_ms = Some(now_ms);
        }
        Ok(())
    }

    pub fn record_error(&mut self, error: ErrorKind) {
        self.last_error = Some(error);
    }

    pub fn push_outcome(&mut self, outcome: ActionOutcomeRecord) {
        self.outcomes.push(outcome);
    }
}

#[cfg(test)]
#[path = "incident_tests.rs"]
mod tests;
