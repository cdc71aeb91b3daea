// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event bus's topic set and envelope.
//!
//! `BusEvent` is the payload published on exactly one topic; `Topic::of`
//! recovers the topic from a reference without needing it threaded through
//! call sites separately. The WS dashboard wraps these in `{type: <topic>,
//! ...payload}` envelopes.

use serde::{Deserialize, Serialize};

use crate::container::ContainerDescriptor;
use crate::incident::{ActionOutcomeRecord, Incident};
use crate::log::LogLine;
use crate::metrics::ResourceSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Log,
    Metrics,
    ContainerUpdate,
    Incident,
    IncidentUpdate,
    ActionOutcome,
}

crate::simple_display! {
    Topic {
        Log => "log",
        Metrics => "metrics",
        ContainerUpdate => "container_update",
        Incident => "incident",
        IncidentUpdate => "incident_update",
        ActionOutcome => "action_outcome",
    }
}

impl Topic {
    pub const ALL: [Topic; 6] = [
        Topic::Log,
        Topic::Metrics,
        Topic::ContainerUpdate,
        Topic::Incident,
        Topic::IncidentUpdate,
        Topic::ActionOutcome,
    ];
}

/// A metrics sample tagged with the container it came from, since
/// [`ResourceSample`] itself is container-agnostic (it lives inside a
/// per-container ring).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsEvent {
    pub container_id: crate::container::ContainerId,
    pub sample: ResourceSample,
}

/// One message published to the bus. Each variant corresponds to exactly
/// one [`Topic`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    Log(LogLine),
    Metrics(MetricsEvent),
    ContainerUpdate(ContainerDescriptor),
    Incident(Incident),
    IncidentUpdate(Incident),
    ActionOutcome(ActionOutcomeRecord),
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::Log(_) => Topic::Log,
            BusEvent::Metrics(_) => Topic::Metrics,
            BusEvent::ContainerUpdate(_) => Topic::ContainerUpdate,
            BusEvent::Incident(_) => Topic::Incident,
            BusEvent::IncidentUpdate(_) => Topic::IncidentUpdate,
            BusEvent::ActionOutcome(_) => Topic::ActionOutcome,
        }
    }
}

/// An event as delivered to a single subscriber: carries the per-topic,
/// per-subscriber monotonically increasing sequence number, strictly
/// increasing per topic per subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredEvent {
    pub sequence: u64,
    pub event: BusEvent,
}

/// The seam every pipeline stage publishes through. Implemented by
/// `sentinel-daemon`'s `EventBus`; kept here so `sentinel-engine` can
/// publish without depending on the daemon crate that owns the bus —
/// passed down as explicit references owned by the top-level orchestrator.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: BusEvent);
}

/// No-op publisher for tests that don't care about bus traffic.
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _event: BusEvent) {}
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
