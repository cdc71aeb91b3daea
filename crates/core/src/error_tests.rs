// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    tool_not_found = { ErrorKind::ToolNotFound { tool: "x".into() }, true },
    schema_violation = { ErrorKind::SchemaViolation { tool: "x".into(), detail: "d".into() }, true },
    config_error = { ErrorKind::ConfigError { detail: "d".into() }, true },
    gateway_unavailable = { ErrorKind::GatewayUnavailable { tool: "x".into(), attempts: 3 }, false },
    verifier_timeout = { ErrorKind::VerifierTimeout { waited_secs: 60 }, false },
)]
fn structural_errors_are_never_retried(kind: ErrorKind, expected: bool) {
    assert_eq!(kind.is_structural(), expected);
}

#[test]
fn gateway_unavailable_and_tool_not_found_are_fatal_for_plan() {
    assert!(ErrorKind::GatewayUnavailable { tool: "x".into(), attempts: 3 }.is_fatal_for_plan());
    assert!(ErrorKind::ToolNotFound { tool: "x".into() }.is_fatal_for_plan());
}

#[test]
fn schema_violation_is_not_fatal_for_plan_on_its_own() {
    assert!(!ErrorKind::SchemaViolation { tool: "x".into(), detail: "d".into() }
        .is_fatal_for_plan());
}

#[test]
fn tag_roundtrips_through_serde() {
    let kind = ErrorKind::ToolNotFound { tool: "restart_container".into() };
    let json = serde_json::to_value(&kind).unwrap();
    assert_eq!(json["kind"], "tool_not_found");
    assert_eq!(json["tool"], "restart_container");
}
