// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::anomaly::{AnomalyVerdict, Severity};
use crate::container::{ContainerDescriptor, ContainerId};
use crate::incident::{Incident, IncidentId, PlannedAction, RemediationPlan};
use crate::log::{LogLevel, LogLine, LogStream};

/// Proptest strategies for core state machine types.
pub mod strategies {
    use crate::incident::IncidentState;
    use proptest::prelude::*;

    pub fn arb_incident_state() -> impl Strategy<Value = IncidentState> {
        prop_oneof![
            Just(IncidentState::New),
            Just(IncidentState::Analyzing),
            Just(IncidentState::Remediating),
            Just(IncidentState::Verifying),
            Just(IncidentState::Resolved),
            Just(IncidentState::Failed),
            Just(IncidentState::Unresolved),
        ]
    }

    pub fn arb_confidence() -> impl Strategy<Value = f64> {
        0.0f64..=1.0
    }
}

pub fn anomaly_verdict(container_id: &str, confidence: f64) -> AnomalyVerdict {
    AnomalyVerdict {
        container_id: ContainerId::new(container_id),
        window_sequence: 0,
        is_anomaly: true,
        severity: Severity::High,
        confidence,
        pattern_label: "connection_refused".to_string(),
        detected_at_ms: 0,
    }
}

pub fn container_descriptor(id: &str, service: &str) -> ContainerDescriptor {
    ContainerDescriptor::new(ContainerId::new(id), id, service, 0)
}

pub fn log_line(container_id: &str, text: &str) -> LogLine {
    LogLine {
        container_id: ContainerId::new(container_id),
        stream: LogStream::Stdout,
        level: LogLevel::infer(text),
        text: text.to_string(),
        timestamp_ms: 0,
    }
}

pub fn open_incident(id: u64, container_id: &str, service: &str) -> Incident {
    Incident::new(IncidentId(id), service, anomaly_verdict(container_id, 0.9), 0)
}

pub fn single_action_plan(tool: &str, container_id: &str) -> RemediationPlan {
    RemediationPlan {
        actions: vec![PlannedAction {
            tool: tool.to_string(),
            target_container: ContainerId::new(container_id),
            params: serde_json::Map::new(),
            priority: 3,
            rationale: "test".to_string(),
        }],
    }
}
