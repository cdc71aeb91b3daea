// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::anomaly::Severity;
use yare::parameterized;

fn verdict() -> AnomalyVerdict {
    AnomalyVerdict {
        container_id: ContainerId::new("c1"),
        window_sequence: 0,
        is_anomaly: true,
        severity: Severity::High,
        confidence: 0.9,
        pattern_label: "connection_refused".into(),
        detected_at_ms: 0,
    }
}

fn new_incident() -> Incident {
    Incident::new(IncidentId(1), "demo-api", verdict(), 0)
}

#[test]
fn id_gen_is_monotonic_and_starts_at_one() {
    let gen = IncidentIdGen::new();
    assert_eq!(gen.next(), IncidentId(1));
    assert_eq!(gen.next(), IncidentId(2));
    assert_eq!(gen.next(), IncidentId(3));
}

#[test]
fn display_formats_as_inc_prefixed() {
    assert_eq!(IncidentId(42).to_string(), "inc-42");
}

#[parameterized(
    new_to_analyzing = { IncidentState::New, IncidentState::Analyzing, true },
    analyzing_to_remediating = { IncidentState::Analyzing, IncidentState::Remediating, true },
    analyzing_to_unresolved = { IncidentState::Analyzing, IncidentState::Unresolved, true },
    remediating_to_verifying = { IncidentState::Remediating, IncidentState::Verifying, true },
    remediating_to_failed = { IncidentState::Remediating, IncidentState::Failed, true },
    verifying_to_resolved = { IncidentState::Verifying, IncidentState::Resolved, true },
    verifying_to_failed = { IncidentState::Verifying, IncidentState::Failed, true },
    new_to_remediating_skips_analyzing = { IncidentState::New, IncidentState::Remediating, false },
    new_to_resolved_skips_everything = { IncidentState::New, IncidentState::Resolved, false },
    resolved_to_anything = { IncidentState::Resolved, IncidentState::Analyzing, false },
)]
fn transition_table_matches_spec_diagram(from: IncidentState, to: IncidentState, allowed: bool) {
    assert_eq!(from.can_transition_to(to), allowed);
}

#[test]
fn full_happy_path_reaches_resolved() {
    let mut inc = new_incident();
    inc.transition(IncidentState::Analyzing, 1).unwrap();
    inc.transition(IncidentState::Remediating, 2).unwrap();
    inc.transition(IncidentState::Verifying, 3).unwrap();
    inc.transition(IncidentState::Resolved, 4).unwrap();
    assert_eq!(inc.state, IncidentState::Resolved);
    assert_eq!(inc.resolved_at_ms, Some(4));
}

#[test]
fn terminal_incident_rejects_further_mutation() {
    let mut inc = new_incident();
    inc.transition(IncidentState::Analyzing, 1).unwrap();
    inc.transition(IncidentState::Unresolved, 2).unwrap();
    let err = inc.transition(IncidentState::Analyzing, 3).unwrap_err();
    assert_eq!(err, IncidentError::Terminal { id: inc.id, state: IncidentState::Unresolved });
}

#[test]
fn invalid_transition_is_rejected_without_mutating_state() {
    let mut inc = new_incident();
    let err = inc.transition(IncidentState::Remediating, 1).unwrap_err();
    assert_eq!(
        err,
        IncidentError::InvalidTransition {
            id: inc.id,
            from: IncidentState::New,
            to: IncidentState::Remediating
        }
    );
    assert_eq!(inc.state, IncidentState::New);
}

#[test]
fn plan_executes_in_priority_order_with_stable_ties() {
    let mk = |tool: &str, priority: u8| PlannedAction {
        tool: tool.into(),
        target_container: ContainerId::new("c1"),
        params: serde_json::Map::new(),
        priority,
        rationale: String::new(),
    };
    let plan = RemediationPlan {
        actions: vec![mk("b", 2), mk("a", 1), mk("c", 2), mk("d", 1)],
    };
    let order: Vec<&str> = plan.in_execution_order().iter().map(|a| a.tool.as_str()).collect();
    assert_eq!(order, vec!["a", "d", "b", "c"]);
}

#[test]
fn empty_plan_reports_empty() {
    assert!(RemediationPlan::default().is_empty());
}
