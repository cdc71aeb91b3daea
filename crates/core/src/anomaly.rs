// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The fast classifier's per-window verdict.

use serde::{Deserialize, Serialize};

use crate::container::ContainerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

crate::simple_display! {
    Severity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// Minimum confidence required to forward a verdict to the incident store
/// (0.7, per the gating rule).
pub const MIN_FORWARD_CONFIDENCE: f64 = 0.7;

/// Debounce window: repeat verdicts on the same container within this many
/// milliseconds of the last accepted detection are suppressed.
pub const DEBOUNCE_WINDOW_MS: u64 = 60_000;

/// The classifier's judgement on a single log window.
///
/// Decoded explicitly from the classifier's JSON response; unknown
/// `severity` values are rejected rather than defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyVerdict {
    pub container_id: ContainerId,
    pub window_sequence: u64,
    pub is_anomaly: bool,
    pub severity: Severity,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    pub pattern_label: String,
    pub detected_at_ms: u64,
}

impl AnomalyVerdict {
    /// Whether this verdict should be forwarded to the incident store
    /// (independent of debouncing, which the incident store applies separately).
    pub fn should_forward(&self) -> bool {
        self.is_anomaly && self.confidence >= MIN_FORWARD_CONFIDENCE
    }
}

#[cfg(test)]
#[path = "anomaly_tests.rs"]
mod tests;
