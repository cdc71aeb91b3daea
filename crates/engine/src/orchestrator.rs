// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level wiring: discovery drives which
//! containers get an ingester and sampler task; the ingesters feed a
//! shared channel the anomaly gate drains; accepted verdicts open
//! incidents, each driven end-to-end (root cause → remediation →
//! verification) by its own task, matching the "each incident driver
//! task" ownership model.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use sentinel_adapters::analyzer::DeepAnalyzerClient;
use sentinel_adapters::classifier::FastClassifierClient;
use sentinel_adapters::engine::ContainerEngine;
use sentinel_adapters::gateway::GatewaySession;
use sentinel_core::{
    Clock, ContainerId, ErrorKind, EventPublisher, IncidentState, DEFAULT_WINDOW_SIZE,
};

use crate::discovery::{self, DiscoveryOutcome};
use crate::gate::{self, ContextSource, GateContext, GateOutcome};
use crate::history::RecentLogs;
use crate::incident_store::IncidentStore;
use crate::ingest::{self, IngesterConfig};
use crate::registry::ContainerRegistry;
use crate::root_cause::{self, RootCauseDeps, RootCauseOutcome};
use crate::sampler;
use crate::verifier;

pub struct OrchestratorConfig {
    pub window_size: usize,
    /// Named `LOG_CHECK_INTERVAL` in the environment table despite governing
    /// the metrics sampler's poll cadence, not log checks.
    pub sample_interval: Duration,
    pub auto_heal_enabled: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            sample_interval: Duration::from_secs(5),
            auto_heal_enabled: true,
        }
    }
}

struct RegistryContext {
    registry: Arc<ContainerRegistry>,
}

impl ContextSource for RegistryContext {
    fn context_for(&self, container_id: &ContainerId) -> GateContext {
        let descriptor = self.registry.get(container_id);
        GateContext {
            service: descriptor.as_ref().map(|d| d.service.clone()).unwrap_or_default(),
            restart_count: descriptor.as_ref().map(|d| d.restart_count).unwrap_or(0),
            cpu_percent: descriptor.as_ref().and_then(|d| d.last_sample.as_ref()).and_then(|s| s.cpu_percent),
            memory_percent: descriptor.as_ref().and_then(|d| d.last_sample.as_ref()).map(|s| s.memory_percent),
        }
    }
}

/// One running per-container task pair plus the token that cancels both.
struct ContainerTasks {
    cancel: CancellationToken,
}

pub struct Orchestrator<C: Clock> {
    pub engine: Arc<dyn ContainerEngine>,
    pub classifier: Arc<FastClassifierClient>,
    pub analyzer: Arc<DeepAnalyzerClient>,
    pub gateway: Arc<GatewaySession>,
    pub registry: Arc<ContainerRegistry>,
    pub recent_logs: Arc<RecentLogs>,
    pub incidents: Arc<IncidentStore>,
    pub bus: Arc<dyn EventPublisher>,
    pub clock: C,
    pub config: OrchestratorConfig,
    tasks: Mutex<HashMap<ContainerId, ContainerTasks>>,
}

impl<C: Clock + 'static> Orchestrator<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        engine: Arc<dyn ContainerEngine>,
        classifier: Arc<FastClassifierClient>,
        analyzer: Arc<DeepAnalyzerClient>,
        gateway: Arc<GatewaySession>,
        registry: Arc<ContainerRegistry>,
        recent_logs: Arc<RecentLogs>,
        incidents: Arc<IncidentStore>,
        bus: Arc<dyn EventPublisher>,
        clock: C,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            engine,
            classifier,
            analyzer,
            gateway,
            registry,
            recent_logs,
            incidents,
            bus,
            clock,
            config,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Runs forever until `cancel` fires: the discovery loop, the anomaly
    /// gate, and the per-incident drivers it spawns as accepted verdicts
    /// arrive.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let (window_tx, window_rx) = mpsc::channel(256);
        let (outcome_tx, mut outcome_rx) = mpsc::channel(64);

        let discovery_self = self.clone();
        let discovery_cancel = cancel.clone();
        let discovery_window_tx = window_tx.clone();
        let discovery_task = tokio::spawn(async move {
            discovery::run_loop(
                discovery_self.engine.clone(),
                discovery_self.registry.clone(),
                discovery_self.bus.clone(),
                discovery_cancel,
                move |outcome: DiscoveryOutcome| {
                    discovery_self.reconcile_container_tasks(outcome, discovery_window_tx.clone());
                },
            )
            .await;
        });

        // An immediate pass so containers present at startup get tasks
        // before the first 15s discovery tick.
        if let Ok(outcome) = discovery::run_pass(self.engine.as_ref(), self.registry.as_ref(), self.bus.as_ref()).await {
            self.reconcile_container_tasks(outcome, window_tx.clone());
        }

        let gate_context: Arc<dyn ContextSource> = Arc::new(RegistryContext { registry: self.registry.clone() });
        let gate_classifier = self.classifier.clone();
        let gate_clock = self.clock.clone();
        let gate_task = tokio::spawn(gate::run(gate_classifier, gate_context, window_rx, outcome_tx, move || gate_clock.epoch_ms()));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = outcome_rx.recv() => {
                    match outcome {
                        Some(outcome) => self.clone().handle_gate_outcome(outcome),
                        None => break,
                    }
                }
            }
        }

        discovery_task.abort();
        gate_task.abort();
        let mut tasks = self.tasks.lock();
        for (_, task) in tasks.drain() {
            task.cancel.cancel();
        }
    }

    fn reconcile_container_tasks(&self, outcome: DiscoveryOutcome, window_tx: mpsc::Sender<sentinel_core::LogWindow>) {
        for id in outcome.newly_observed {
            self.spawn_container_tasks(id, window_tx.clone());
        }
        let mut tasks = self.tasks.lock();
        for id in outcome.removed {
            if let Some(task) = tasks.remove(&id) {
                task.cancel.cancel();
            }
            self.recent_logs.remove(&id);
        }
    }

    fn spawn_container_tasks(&self, id: ContainerId, window_tx: mpsc::Sender<sentinel_core::LogWindow>) {
        let cancel = CancellationToken::new();
        self.tasks.lock().insert(id.clone(), ContainerTasks { cancel: cancel.clone() });

        let ingest_config = IngesterConfig { container_id: id.clone(), window_size: self.config.window_size };
        let ingest_engine = self.engine.clone();
        let ingest_bus = self.bus.clone();
        let ingest_recent_logs = self.recent_logs.clone();
        let ingest_cancel = cancel.clone();
        let ingest_clock = self.clock.clone();
        tokio::spawn(async move {
            ingest::run(
                ingest_config,
                ingest_engine,
                ingest_bus,
                ingest_recent_logs,
                window_tx,
                ingest_cancel,
                move || ingest_clock.epoch_ms() as i64,
            )
            .await;
        });

        let sampler_id = id.clone();
        let sampler_interval = self.config.sample_interval;
        let sampler_engine = self.engine.clone();
        let sampler_registry = self.registry.clone();
        let sampler_bus = self.bus.clone();
        let sampler_cancel = cancel;
        tokio::spawn(async move {
            sampler::run(sampler_id, sampler_interval, sampler_engine, sampler_registry, sampler_bus, sampler_cancel).await;
        });
    }

    fn handle_gate_outcome(self: Arc<Self>, outcome: GateOutcome) {
        let GateOutcome { verdict, lines } = outcome;
        let service = self
            .registry
            .get(&verdict.container_id)
            .map(|d| d.service)
            .unwrap_or_else(|| verdict.container_id.to_string());
        let now_ms = self.clock.epoch_ms();
        let Some(incident) = self.incidents.accept(verdict, service, now_ms, self.bus.as_ref()) else {
            return;
        };
        info!(incident_id = %incident.id, container_id = %incident.container_id, "incident opened");
        tokio::spawn(async move {
            self.drive_incident(incident.id, incident.container_id, lines).await;
        });
    }

    async fn drive_incident(self: Arc<Self>, id: sentinel_core::IncidentId, container_id: ContainerId, window_lines: Vec<String>) {
        let Some(incident) = self.incidents.get(id) else { return };

        let deps = RootCauseDeps {
            analyzer: self.analyzer.as_ref(),
            engine: self.engine.as_ref(),
            gateway: self.gateway.as_ref(),
            registry: self.registry.as_ref(),
            recent_logs: self.recent_logs.as_ref(),
        };
        let outcome = root_cause::run(&incident, &window_lines, deps).await;

        let plan = match outcome {
            RootCauseOutcome::Analyzed { analysis, plan } => {
                let _ = self.incidents.record_root_cause(id, analysis, self.bus.as_ref());
                let _ = self.incidents.record_plan(id, plan.clone(), self.bus.as_ref());
                plan
            }
            RootCauseOutcome::Failed(kind) => {
                let _ = self.incidents.record_error(id, kind, self.bus.as_ref());
                let now_ms = self.clock.epoch_ms();
                let _ = self.incidents.transition(id, IncidentState::Unresolved, now_ms, self.bus.as_ref());
                return;
            }
        };

        if plan.actions.is_empty() || !self.config.auto_heal_enabled {
            let now_ms = self.clock.epoch_ms();
            let _ = self.incidents.transition(id, IncidentState::Unresolved, now_ms, self.bus.as_ref());
            return;
        }

        let now_ms = self.clock.epoch_ms();
        if self.incidents.transition(id, IncidentState::Remediating, now_ms, self.bus.as_ref()).is_err() {
            return;
        }

        let incidents_for_outcomes = self.incidents.clone();
        let bus_for_outcomes = self.bus.clone();
        let report = crate::executor::execute_plan(id, &plan, self.gateway.as_ref(), move |outcome| {
            let _ = incidents_for_outcomes.push_outcome(id, outcome, bus_for_outcomes.as_ref());
        })
        .await;

        if report.fatal {
            let now_ms = self.clock.epoch_ms();
            let _ = self.incidents.transition(id, IncidentState::Failed, now_ms, self.bus.as_ref());
            return;
        }

        let now_ms = self.clock.epoch_ms();
        if self.incidents.transition(id, IncidentState::Verifying, now_ms, self.bus.as_ref()).is_err() {
            return;
        }

        let verify_outcome = verifier::run(&container_id, self.engine.as_ref(), verifier::SAMPLE_INTERVAL, verifier::MAX_WAIT).await;
        let now_ms = self.clock.epoch_ms();
        match verify_outcome {
            verifier::VerifyOutcome::Resolved => {
                let _ = self.incidents.transition(id, IncidentState::Resolved, now_ms, self.bus.as_ref());
            }
            verifier::VerifyOutcome::TimedOut => {
                let kind = ErrorKind::VerifierTimeout { waited_secs: verifier::MAX_WAIT.as_secs() };
                let _ = self.incidents.record_error(id, kind, self.bus.as_ref());
                let _ = self.incidents.transition(id, IncidentState::Failed, now_ms, self.bus.as_ref());
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
