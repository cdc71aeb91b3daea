// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root-cause engine. Gathers cross-container context for the
//! incident's triggering container, calls the deep analyzer, and translates
//! its recommendations into a [`RemediationPlan`] — dropping any action that
//! names a tool absent from the gateway's discovered catalog.

use sentinel_adapters::analyzer::{AnalyzeInput, DeepAnalyzerClient};
use sentinel_adapters::engine::ContainerEngine;
use sentinel_adapters::gateway::GatewaySession;
use sentinel_core::{
    redact, ContainerId, ErrorKind, Incident, PlannedAction, RemediationPlan, RootCauseAnalysis,
};
use tracing::warn;

use crate::history::RecentLogs;
use crate::registry::ContainerRegistry;

pub struct RootCauseDeps<'a> {
    pub analyzer: &'a DeepAnalyzerClient,
    pub engine: &'a dyn ContainerEngine,
    pub gateway: &'a GatewaySession,
    pub registry: &'a ContainerRegistry,
    pub recent_logs: &'a RecentLogs,
}

pub enum RootCauseOutcome {
    /// The analyzer produced a plan (possibly empty after dropping unknown
    /// tools; the resulting plan may end up empty).
    Analyzed { analysis: RootCauseAnalysis, plan: RemediationPlan },
    /// The analyzer call failed transport-level or returned malformed
    /// output; the caller records this on the incident and moves it to
    /// UNRESOLVED.
    Failed(ErrorKind),
}

/// `window_lines` are the redacted lines of the log window that triggered
/// this incident; the caller (the orchestrator) holds these only for the
/// duration of this call, since incidents themselves don't retain raw log
/// text (`Incident` stays lean by design).
pub async fn run(incident: &Incident, window_lines: &[String], deps: RootCauseDeps<'_>) -> RootCauseOutcome {
    let recent_lines = deps.recent_logs.last(&incident.container_id);
    let descriptors_json = serde_json::to_value(deps.registry.snapshot()).unwrap_or(serde_json::Value::Null);

    let raw_env = deps.engine.inspect_env(&incident.container_id).await.unwrap_or_default();
    let redacted_env = redact::redact_env(&raw_env);

    let available_tools: Vec<String> = match deps.gateway.tools().await {
        Ok(tools) => tools.into_iter().map(|t| t.name).collect(),
        Err(e) => {
            warn!(incident_id = %incident.id, error = %e, "could not fetch tool catalog before analysis");
            Vec::new()
        }
    };

    let verdict_summary = format!(
        "severity={} confidence={:.2} pattern={}",
        incident.verdict.severity, incident.verdict.confidence, incident.verdict.pattern_label
    );

    let input = AnalyzeInput {
        service: &incident.service,
        verdict_summary,
        window_lines,
        recent_lines: &recent_lines,
        descriptors_json,
        redacted_env: &redacted_env,
        available_tools: &available_tools,
    };

    let raw = match deps.analyzer.analyze(input).await {
        Ok(raw) => raw,
        Err(e) => return RootCauseOutcome::Failed(e.into_kind()),
    };

    let mut dropped_actions = Vec::new();
    let mut actions = Vec::new();
    for recommended in raw.recommended_actions {
        if !available_tools.iter().any(|t| t == &recommended.tool) {
            warn!(
                incident_id = %incident.id,
                tool = %recommended.tool,
                "analyzer recommended unknown tool, dropping"
            );
            dropped_actions.push(recommended.tool);
            continue;
        }
        actions.push(PlannedAction {
            tool: recommended.tool,
            target_container: ContainerId::new(recommended.container_id),
            params: recommended.params,
            priority: recommended.priority.clamp(1, 5),
            rationale: recommended.rationale,
        });
    }

    let analysis = RootCauseAnalysis {
        root_cause: raw.root_cause,
        explanation: raw.explanation,
        affected_components: raw.affected_components,
        dropped_actions,
    };

    RootCauseOutcome::Analyzed { analysis, plan: RemediationPlan { actions } }
}

#[cfg(test)]
#[path = "root_cause_tests.rs"]
mod tests;
