// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incident store & state machine. Holds every incident ever created for
//! the life of the process, never deleted, retained for dashboard
//! bootstrap, plus an index of the one open incident per container, used
//! to enforce the debounce window: two anomaly verdicts accepted for the
//! same container must have detected-at timestamps at least 60s apart.
//!
//! Concurrency model: each incident is conceptually owned by its own
//! driver task once created, but the index itself — insert, debounce
//! lookup, terminal-state removal from the open set — is guarded by a
//! single mutex for insert/lookup only.

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;

use sentinel_core::{
    ActionOutcomeRecord, AnomalyVerdict, BusEvent, ContainerId, ErrorKind, EventPublisher, Incident,
    IncidentError, IncidentId, IncidentIdGen, IncidentState, RemediationPlan, RootCauseAnalysis,
    DEBOUNCE_WINDOW_MS,
};

#[derive(Default)]
struct Inner {
    /// Every incident this process has ever created, in creation order.
    incidents: IndexMap<IncidentId, Incident>,
    /// The one open (non-terminal) incident per container, for debouncing.
    open_by_container: HashMap<ContainerId, IncidentId>,
}

pub struct IncidentStore {
    id_gen: IncidentIdGen,
    inner: Mutex<Inner>,
}

impl Default for IncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IncidentStore {
    pub fn new() -> Self {
        Self { id_gen: IncidentIdGen::new(), inner: Mutex::new(Inner::default()) }
    }

    /// Accept an anomaly verdict that already passed the gate's own
    /// confidence threshold. Returns the newly
    /// created incident, already transitioned `NEW -> ANALYZING` and
    /// published on both the `incident` and `incident_update` topics, or
    /// `None` if an open incident already exists for this container within
    /// the debounce window.
    #[allow(clippy::expect_used)]
    pub fn accept(
        &self,
        verdict: AnomalyVerdict,
        service: impl Into<String>,
        now_ms: u64,
        bus: &dyn EventPublisher,
    ) -> Option<Incident> {
        let mut inner = self.inner.lock();

        if let Some(existing_id) = inner.open_by_container.get(&verdict.container_id).copied() {
            let existing = inner.incidents.get(&existing_id).expect("open index is consistent");
            if now_ms.saturating_sub(existing.detected_at_ms) < DEBOUNCE_WINDOW_MS {
                return None;
            }
            // The previous open incident is older than the debounce window
            // but has not reached a terminal state yet; the new verdict
            // still can't open a second incident for the same container —
            // only one incident per (container, open-state) tuple.
            if !existing.state.is_terminal() {
                return None;
            }
            inner.open_by_container.remove(&verdict.container_id);
        }

        let id = self.id_gen.next();
        let mut incident = Incident::new(id, service, verdict.clone(), now_ms);
        bus.publish(BusEvent::Incident(incident.clone()));

        incident.transition(IncidentState::Analyzing, now_ms).expect("New -> Analyzing is always legal");
        bus.publish(BusEvent::IncidentUpdate(incident.clone()));

        inner.open_by_container.insert(verdict.container_id, id);
        inner.incidents.insert(id, incident.clone());
        Some(incident)
    }

    /// Move `id` to `next`, publishing `incident_update` on success. Removes
    /// the incident from the debounce index once it reaches a terminal
    /// state.
    pub fn transition(
        &self,
        id: IncidentId,
        next: IncidentState,
        now_ms: u64,
        bus: &dyn EventPublisher,
    ) -> Result<Incident, IncidentError> {
        self.mutate(id, bus, |incident| incident.transition(next, now_ms))
    }

    pub fn record_root_cause(
        &self,
        id: IncidentId,
        analysis: RootCauseAnalysis,
        bus: &dyn EventPublisher,
    ) -> Result<Incident, IncidentError> {
        self.mutate(id, bus, |incident| {
            incident.root_cause = Some(analysis);
            Ok(())
        })
    }

    pub fn record_plan(
        &self,
        id: IncidentId,
        plan: RemediationPlan,
        bus: &dyn EventPublisher,
    ) -> Result<Incident, IncidentError> {
        self.mutate(id, bus, |incident| {
            incident.plan = Some(plan);
            Ok(())
        })
    }

    pub fn record_error(
        &self,
        id: IncidentId,
        error: ErrorKind,
        bus: &dyn EventPublisher,
    ) -> Result<Incident, IncidentError> {
        self.mutate(id, bus, |incident| {
            incident.record_error(error);
            Ok(())
        })
    }

    pub fn record_explanation(
        &self,
        id: IncidentId,
        explanation: impl Into<String>,
        bus: &dyn EventPublisher,
    ) -> Result<Incident, IncidentError> {
        let explanation = explanation.into();
        self.mutate(id, bus, |incident| {
            incident.explanation = Some(explanation.clone());
            Ok(())
        })
    }

    /// Append an action outcome to the incident and publish it on both the
    /// incident's own `incident_update` topic and the dedicated
    /// `action_outcome` topic.
    pub fn push_outcome(
        &self,
        id: IncidentId,
        outcome: ActionOutcomeRecord,
        bus: &dyn EventPublisher,
    ) -> Result<Incident, IncidentError> {
        bus.publish(BusEvent::ActionOutcome(outcome.clone()));
        self.mutate(id, bus, |incident| {
            incident.push_outcome(outcome.clone());
            Ok(())
        })
    }

    fn mutate(
        &self,
        id: IncidentId,
        bus: &dyn EventPublisher,
        f: impl FnOnce(&mut Incident) -> Result<(), IncidentError>,
    ) -> Result<Incident, IncidentError> {
        let mut inner = self.inner.lock();
        let incident = inner.incidents.get_mut(&id).ok_or(IncidentError::NotFound { id })?;
        if incident.state.is_terminal() {
            return Err(IncidentError::Terminal { id, state: incident.state });
        }
        f(incident)?;
        let snapshot = incident.clone();
        if snapshot.state.is_terminal() {
            inner.open_by_container.remove(&snapshot.container_id);
        }
        bus.publish(BusEvent::IncidentUpdate(snapshot.clone()));
        Ok(snapshot)
    }

    pub fn get(&self, id: IncidentId) -> Option<Incident> {
        self.inner.lock().incidents.get(&id).cloned()
    }

    /// Every incident ever created, ordered by detection order (`GET
    /// /incidents` returns them ordered by detected-at; ids are assigned
    /// monotonically so insertion order already matches).
    pub fn snapshot(&self) -> Vec<Incident> {
        self.inner.lock().incidents.values().cloned().collect()
    }

    pub fn is_open(&self, container_id: &ContainerId) -> bool {
        self.inner.lock().open_by_container.contains_key(container_id)
    }
}

#[cfg(test)]
#[path = "incident_store_tests.rs"]
mod tests;
