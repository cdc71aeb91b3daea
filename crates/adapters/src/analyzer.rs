// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deep analyzer client — the root-cause engine's
//! collaborator. Same request shape as the classifier (model/system/user
//! prompt), a much longer timeout, and a richer response: a root cause, an
//! explanation, affected components, and an ordered list of recommended
//! remediation actions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("analyzer request timed out")]
    Timeout,
    #[error("analyzer transport error: {0}")]
    Transport(String),
    #[error("analyzer returned malformed analysis: {0}")]
    Malformed(String),
}

impl AnalyzerError {
    pub fn into_kind(self) -> sentinel_core::ErrorKind {
        sentinel_core::ErrorKind::AnalyzerError { detail: self.to_string() }
    }
}

pub const ANALYZER_TIMEOUT: Duration = Duration::from_secs(45);

const SYSTEM_PROMPT: &str = "You are a root-cause analysis engine for containerized services. \
Given an anomaly, recent logs, the state of every monitored container, and redacted environment \
variables, determine the root cause and recommend remediation actions drawn from the available \
tool catalog. Respond with a JSON object: {\"root_cause\": string, \"explanation\": string, \
\"affected_components\": [string], \"recommended_actions\": [{\"tool\": string, \"container_id\": \
string, \"params\": object, \"priority\": 1-5, \"rationale\": string}]}. Respond with JSON only.";

/// Everything the root-cause engine gathers before calling the analyzer.
pub struct AnalyzeInput<'a> {
    pub service: &'a str,
    pub verdict_summary: String,
    pub window_lines: &'a [String],
    pub recent_lines: &'a [String],
    pub descriptors_json: serde_json::Value,
    pub redacted_env: &'a [(String, String)],
    pub available_tools: &'a [String],
}

impl AnalyzeInput<'_> {
    fn user_prompt(&self) -> String {
        let env_lines: Vec<String> =
            self.redacted_env.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!(
            "service: {}\nverdict: {}\nwindow_lines:\n{}\nrecent_lines (last 500):\n{}\n\
descriptors: {}\nenvironment:\n{}\navailable_tools: {}\n",
            self.service,
            self.verdict_summary,
            self.window_lines.join("\n"),
            self.recent_lines.join("\n"),
            self.descriptors_json,
            env_lines.join("\n"),
            self.available_tools.join(", "),
        )
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    model: &'a str,
    system_prompt: &'a str,
    user_prompt: String,
}

#[derive(Debug, Deserialize)]
struct InferenceEnvelope {
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawRecommendedAction {
    pub tool: String,
    pub container_id: String,
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    pub priority: u8,
    pub rationale: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawAnalysis {
    pub root_cause: String,
    pub explanation: String,
    #[serde(default)]
    pub affected_components: Vec<String>,
    #[serde(default)]
    pub recommended_actions: Vec<RawRecommendedAction>,
}

pub struct DeepAnalyzerClient {
    http: reqwest::Client,
    url: String,
    key: String,
    model: String,
}

impl DeepAnalyzerClient {
    pub fn new(url: impl Into<String>, key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), url: url.into(), key: key.into(), model: model.into() }
    }

    pub async fn analyze(&self, input: AnalyzeInput<'_>) -> Result<RawAnalysis, AnalyzerError> {
        let request =
            AnalyzeRequest { model: &self.model, system_prompt: SYSTEM_PROMPT, user_prompt: input.user_prompt() };

        let send = self.http.post(&self.url).bearer_auth(&self.key).json(&request).send();
        let response = tokio::time::timeout(ANALYZER_TIMEOUT, send)
            .await
            .map_err(|_| AnalyzerError::Timeout)?
            .map_err(|e| AnalyzerError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AnalyzerError::Transport(format!("HTTP {}", response.status())));
        }

        let envelope: InferenceEnvelope = tokio::time::timeout(ANALYZER_TIMEOUT, response.json())
            .await
            .map_err(|_| AnalyzerError::Timeout)?
            .map_err(|e| AnalyzerError::Malformed(e.to_string()))?;

        serde_json::from_str(&envelope.content).map_err(|e| AnalyzerError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod tests;
