// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Anomaly gate. Consumes the log windows the ingester emits on
//! its internal channel, asks the fast classifier to judge each one, and
//! forwards accepted verdicts to the incident store. Gating has two
//! independent conditions: the classifier's own confidence threshold
//! ([`AnomalyVerdict::should_forward`]) and debouncing, decided by whoever
//! the gate hands verdicts to (debounce is a property of "is
//! there already an open incident for this container", which only the
//! incident store can answer).

use sentinel_adapters::classifier::{ClassifyInput, FastClassifierClient};
use sentinel_core::{ContainerId, LogWindow};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// What the gate learned about one window, passed on to whatever decides
/// incident creation.
pub struct GateOutcome {
    pub verdict: sentinel_core::AnomalyVerdict,
    /// The window's (already classifier-truncated) lines, carried through so
    /// a freshly opened incident can hand them to the root-cause engine
    /// without the incident itself retaining raw log text.
    pub lines: Vec<String>,
}

/// Per-container context the gate needs at classification time that isn't
/// carried on the window itself.
pub struct GateContext {
    pub service: String,
    pub restart_count: u32,
    pub cpu_percent: Option<f64>,
    pub memory_percent: Option<f64>,
}

pub trait ContextSource: Send + Sync {
    fn context_for(&self, container_id: &ContainerId) -> GateContext;
}

pub async fn run(
    classifier: std::sync::Arc<FastClassifierClient>,
    context: std::sync::Arc<dyn ContextSource>,
    mut window_rx: mpsc::Receiver<LogWindow>,
    outcome_tx: mpsc::Sender<GateOutcome>,
    now_ms: impl Fn() -> u64 + Send,
) {
    while let Some(window) = window_rx.recv().await {
        let ctx = context.context_for(&window.container_id);
        let lines = window.truncated_lines();
        let input = ClassifyInput {
            service: &ctx.service,
            lines: &lines,
            restart_count: ctx.restart_count,
            cpu_percent: ctx.cpu_percent,
            memory_percent: ctx.memory_percent,
        };

        match classifier.classify(&window.container_id, window.sequence, input, now_ms()).await {
            Ok(verdict) => {
                if verdict.should_forward() {
                    debug!(
                        container_id = %window.container_id,
                        severity = %verdict.severity,
                        confidence = verdict.confidence,
                        "anomaly verdict accepted"
                    );
                    if outcome_tx.send(GateOutcome { verdict, lines: lines.clone() }).await.is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                warn!(container_id = %window.container_id, error = %e, "classification failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
