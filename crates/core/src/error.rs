// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The error taxonomy, reified as a single tagged enum so it
//! can be carried on [`crate::incident::Incident`] and
//! [`crate::incident::ActionOutcome`] and published verbatim on the event
//! bus. Each subsystem keeps its own `thiserror` enum for local matching and
//! exposes a `kind()` method mapping into this type; this is the only type
//! that crosses the wire to the dashboard.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    /// Cannot reach the container engine. Ingesters/samplers retry with
    /// backoff; does not fail incidents already in progress.
    EngineUnavailable { detail: String },
    /// The fast classifier call failed transport-level or returned
    /// malformed output. The triggering window is skipped.
    ClassifierError { detail: String },
    /// The deep analyzer call failed transport-level or returned malformed
    /// output. The incident is left UNRESOLVED.
    AnalyzerError { detail: String },
    /// An action referenced a tool absent from the gateway's catalog.
    /// Fatal for the action, not necessarily the plan.
    ToolNotFound { tool: String },
    /// Action parameters did not validate against the tool's schema.
    SchemaViolation { tool: String, detail: String },
    /// Transport failure to the tool gateway persisted across retries.
    /// Fatal for the action; fatal for the plan if priority <= 2.
    GatewayUnavailable { tool: String, attempts: u32 },
    /// The tool executed but reported `isError=true`.
    ToolExecutionError { tool: String, detail: String },
    /// Health did not converge within the verifier's deadline.
    VerifierTimeout { waited_secs: u64 },
    /// Missing required configuration at startup. Process exits with code 1.
    ConfigError { detail: String },
}

impl ErrorKind {
    /// Stable string tag, used for log fields and dashboard filtering.
    pub fn tag(&self) -> &'static str {
        match self {
            ErrorKind::EngineUnavailable { .. } => "engine_unavailable",
            ErrorKind::ClassifierError { .. } => "classifier_error",
            ErrorKind::AnalyzerError { .. } => "analyzer_error",
            ErrorKind::ToolNotFound { .. } => "tool_not_found",
            ErrorKind::SchemaViolation { .. } => "schema_violation",
            ErrorKind::GatewayUnavailable { .. } => "gateway_unavailable",
            ErrorKind::ToolExecutionError { .. } => "tool_execution_error",
            ErrorKind::VerifierTimeout { .. } => "verifier_timeout",
            ErrorKind::ConfigError { .. } => "config_error",
        }
    }

    /// Structural errors are never retried locally; transient ones already
    /// were, by the time they reach here.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ErrorKind::ToolNotFound { .. }
                | ErrorKind::SchemaViolation { .. }
                | ErrorKind::ConfigError { .. }
        )
    }

    /// Whether this error, surfacing on a plan action with `priority <= 2`,
    /// is fatal for the whole remediation plan.
    pub fn is_fatal_for_plan(&self) -> bool {
        matches!(self, ErrorKind::GatewayUnavailable { .. } | ErrorKind::ToolNotFound { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
