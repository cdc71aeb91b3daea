// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fast classifier client — the anomaly gate's collaborator.
//!
//! Consumed purely as a request/response endpoint: a JSON body carrying a
//! model name, a system prompt, and a user prompt; a JSON response whose
//! `content` field is itself a JSON document we decode into
//! [`sentinel_core::AnomalyVerdict`]'s raw fields. Unknown `severity`
//! strings are rejected rather than defaulted.

use sentinel_core::{ContainerId, Severity};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier request timed out")]
    Timeout,
    #[error("classifier transport error: {0}")]
    Transport(String),
    #[error("classifier returned malformed verdict: {0}")]
    Malformed(String),
}

impl ClassifierError {
    pub fn into_kind(self) -> sentinel_core::ErrorKind {
        sentinel_core::ErrorKind::ClassifierError { detail: self.to_string() }
    }
}

pub const CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(3);

const SYSTEM_PROMPT: &str = "You are a log anomaly classifier. Given recent log lines from a \
monitored service, decide whether they indicate an anomaly. Respond with a JSON object: \
{\"is_anomaly\": bool, \"severity\": \"low\"|\"medium\"|\"high\"|\"critical\", \
\"confidence\": number between 0 and 1, \"pattern_label\": short string}. Respond with JSON only.";

/// Everything the gate knows about the window and container, serialized
/// into the request's user prompt.
pub struct ClassifyInput<'a> {
    pub service: &'a str,
    pub lines: &'a [String],
    pub restart_count: u32,
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
}

impl ClassifyInput<'_> {
    fn user_prompt(&self) -> String {
        let mut body = format!(
            "service: {}\nrestart_count: {}\n",
            self.service, self.restart_count
        );
        if let Some(cpu) = self.cpu_percent {
            body.push_str(&format!("cpu_percent: {cpu:.1}\n"));
        }
        if let Some(mem) = self.memory_percent {
            body.push_str(&format!("memory_percent: {mem:.1}\n"));
        }
        body.push_str("log lines:\n");
        for line in self.lines {
            body.push_str(line);
            body.push('\n');
        }
        body
    }
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    model: &'a str,
    system_prompt: &'a str,
    user_prompt: String,
}

#[derive(Debug, Deserialize)]
struct InferenceEnvelope {
    content: String,
}

/// Raw decoded verdict fields, before the gate stamps `container_id`,
/// `window_sequence`, and `detected_at_ms`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawVerdict {
    pub is_anomaly: bool,
    pub severity: Severity,
    pub confidence: f64,
    pub pattern_label: String,
}

pub struct FastClassifierClient {
    http: reqwest::Client,
    url: String,
    key: String,
    model: String,
}

impl FastClassifierClient {
    pub fn new(url: impl Into<String>, key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            key: key.into(),
            model: model.into(),
        }
    }

    pub async fn classify(
        &self,
        container_id: &ContainerId,
        window_sequence: u64,
        input: ClassifyInput<'_>,
        now_ms: u64,
    ) -> Result<sentinel_core::AnomalyVerdict, ClassifierError> {
        let request = ClassifyRequest {
            model: &self.model,
            system_prompt: SYSTEM_PROMPT,
            user_prompt: input.user_prompt(),
        };

        let send = self
            .http
            .post(&self.url)
            .bearer_auth(&self.key)
            .json(&request)
            .send();

        let response = tokio::time::timeout(CLASSIFIER_TIMEOUT, send)
            .await
            .map_err(|_| ClassifierError::Timeout)?
            .map_err(|e| ClassifierError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ClassifierError::Transport(format!("HTTP {}", response.status())));
        }

        let envelope: InferenceEnvelope = tokio::time::timeout(CLASSIFIER_TIMEOUT, response.json())
            .await
            .map_err(|_| ClassifierError::Timeout)?
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;

        let raw: RawVerdict = serde_json::from_str(&envelope.content)
            .map_err(|e| ClassifierError::Malformed(e.to_string()))?;
        if !(0.0..=1.0).contains(&raw.confidence) {
            return Err(ClassifierError::Malformed(format!(
                "confidence {} out of [0,1]",
                raw.confidence
            )));
        }

        Ok(sentinel_core::AnomalyVerdict {
            container_id: container_id.clone(),
            window_sequence,
            is_anomaly: raw.is_anomaly,
            severity: raw.severity,
            confidence: raw.confidence,
            pattern_label: raw.pattern_label,
            detected_at_ms: now_ms,
        })
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
