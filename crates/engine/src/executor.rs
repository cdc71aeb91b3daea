// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remediation executor. Drives the plan's actions through the
//! gateway session in priority order, validating each action against the
//! gateway's discovered schema, retrying transient transport failures with
//! the shared [`sentinel_core::retry`] combinator, and stopping the plan
//! early when a `priority <= 2` action fails fatally.

use std::time::{Duration, Instant};

use sentinel_adapters::gateway::{GatewayError, GatewaySession, ToolCallResult, ToolSchema, DEFAULT_CALL_TIMEOUT, RECREATE_CALL_TIMEOUT};
use sentinel_core::{retry, ActionOutcomeRecord, Backoff, ErrorKind, IncidentId, PlannedAction, RemediationPlan};

/// Tools that recreate the target container (an open question resolved: the
/// `update_env_vars` recreate path — commit image, destroy, recreate with
/// merged environment) get the longer call timeout.
pub const RECREATE_TOOLS: &[&str] = &["update_env_vars", "recreate_container"];

pub const GATEWAY_CALL_ATTEMPTS: u32 = 3;

pub struct ExecutionReport {
    pub outcomes: Vec<ActionOutcomeRecord>,
    /// Set when an action with `priority <= 2` failed fatally; the caller
    /// should transition the incident straight to FAILED instead of
    /// proceeding to verification.
    pub fatal: bool,
}

fn timeout_for(tool: &str) -> Duration {
    if RECREATE_TOOLS.contains(&tool) {
        RECREATE_CALL_TIMEOUT
    } else {
        DEFAULT_CALL_TIMEOUT
    }
}

/// Best-effort JSON-schema validation: only checks that every name in the
/// schema's top-level `required` array is present in `params`. The gateway
/// only publishes coarse JSON-schema parameter specs,
/// so this is deliberately not a full schema validator.
fn validate_params(schema: &serde_json::Value, params: &serde_json::Map<String, serde_json::Value>) -> Result<(), String> {
    let Some(required) = schema.get("required").and_then(|v| v.as_array()) else {
        return Ok(());
    };
    let missing: Vec<&str> = required
        .iter()
        .filter_map(|v| v.as_str())
        .filter(|name| !params.contains_key(*name))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("missing required parameters: {}", missing.join(", ")))
    }
}

async fn call_with_retry(
    gateway: &GatewaySession,
    tool: &str,
    arguments: serde_json::Value,
    timeout: Duration,
) -> Result<ToolCallResult, (GatewayError, u32)> {
    let mut attempts_made = 0u32;
    let result = retry(GATEWAY_CALL_ATTEMPTS, Backoff::GATEWAY_RETRY, |attempt| {
        attempts_made = attempt;
        gateway.call(tool, arguments.clone(), timeout)
    })
    .await;
    result.map_err(|e| (e, attempts_made))
}

fn gateway_error_kind(tool: &str, error: &GatewayError, attempts: u32) -> ErrorKind {
    match error {
        GatewayError::Timeout | GatewayError::Transport(_) | GatewayError::SessionExpired => {
            ErrorKind::GatewayUnavailable { tool: tool.to_string(), attempts }
        }
        GatewayError::Malformed(detail) => {
            ErrorKind::ToolExecutionError { tool: tool.to_string(), detail: detail.clone() }
        }
    }
}

fn record(
    incident_id: IncidentId,
    action: &PlannedAction,
    success: bool,
    output: Option<serde_json::Value>,
    error: Option<ErrorKind>,
    started: Instant,
    attempt: u32,
) -> ActionOutcomeRecord {
    ActionOutcomeRecord {
        incident_id,
        action: action.clone(),
        success,
        output,
        error,
        duration_ms: started.elapsed().as_millis() as u64,
        attempt,
    }
}

/// Execute every action in `plan` against `gateway`, calling `on_outcome`
/// as each completes so the caller can append it to the incident and
/// publish `action_outcome` immediately.
pub async fn execute_plan(
    incident_id: IncidentId,
    plan: &RemediationPlan,
    gateway: &GatewaySession,
    mut on_outcome: impl FnMut(ActionOutcomeRecord),
) -> ExecutionReport {
    let mut outcomes = Vec::new();

    let catalog: Vec<ToolSchema> = match gateway.tools().await {
        Ok(tools) => tools,
        Err(e) => {
            // No catalog at all: every action fails gateway_unavailable.
            let mut fatal = false;
            for action in plan.in_execution_order() {
                let started = Instant::now();
                let kind = gateway_error_kind(&action.tool, &e, 1);
                let outcome = record(incident_id, action, false, None, Some(kind.clone()), started, 1);
                on_outcome(outcome.clone());
                outcomes.push(outcome);
                if kind.is_fatal_for_plan() && action.priority <= 2 {
                    fatal = true;
                    break;
                }
            }
            return ExecutionReport { outcomes, fatal };
        }
    };

    let mut fatal = false;
    for action in plan.in_execution_order() {
        let started = Instant::now();

        let schema = catalog.iter().find(|t| t.name == action.tool);
        let Some(schema) = schema else {
            let kind = ErrorKind::ToolNotFound { tool: action.tool.clone() };
            let outcome = record(incident_id, action, false, None, Some(kind.clone()), started, 1);
            on_outcome(outcome.clone());
            outcomes.push(outcome);
            if kind.is_fatal_for_plan() && action.priority <= 2 {
                fatal = true;
                break;
            }
            continue;
        };

        if let Err(detail) = validate_params(&schema.parameters, &action.params) {
            let kind = ErrorKind::SchemaViolation { tool: action.tool.clone(), detail };
            let outcome = record(incident_id, action, false, None, Some(kind), started, 1);
            on_outcome(outcome.clone());
            outcomes.push(outcome);
            // Schema violations are structural and fatal for the action
            // only, never the plan.
            continue;
        }

        let timeout = timeout_for(&action.tool);
        let arguments = serde_json::Value::Object(action.params.clone());
        match call_with_retry(gateway, &action.tool, arguments, timeout).await {
            Ok(result) if result.success => {
                let outcome = record(incident_id, action, true, Some(result.payload), None, started, 1);
                on_outcome(outcome.clone());
                outcomes.push(outcome);
            }
            Ok(result) => {
                let kind = ErrorKind::ToolExecutionError {
                    tool: action.tool.clone(),
                    detail: result.payload.to_string(),
                };
                let outcome = record(incident_id, action, false, Some(result.payload), Some(kind), started, 1);
                on_outcome(outcome.clone());
                outcomes.push(outcome);
            }
            Err((error, attempts)) => {
                let kind = gateway_error_kind(&action.tool, &error, attempts);
                let outcome = record(incident_id, action, false, None, Some(kind.clone()), started, attempts);
                on_outcome(outcome.clone());
                outcomes.push(outcome);
                if kind.is_fatal_for_plan() && action.priority <= 2 {
                    fatal = true;
                    break;
                }
            }
        }
    }

    ExecutionReport { outcomes, fatal }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
