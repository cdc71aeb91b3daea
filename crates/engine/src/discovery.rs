// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery loop: a pass at startup and every 15s, upserting
//! descriptors for every container carrying the monitor label and removing
//! ones that have been missing for more than the grace period.

use sentinel_adapters::engine::{ContainerEngine, EngineError};
use sentinel_core::{BusEvent, ContainerId, EventPublisher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::registry::ContainerRegistry;

pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(15);

/// Outcome of one discovery pass, used by the orchestrator to decide which
/// per-container tasks to spawn or cancel.
pub struct DiscoveryOutcome {
    pub newly_observed: Vec<ContainerId>,
    pub removed: Vec<ContainerId>,
}

pub async fn run_pass(
    engine: &dyn ContainerEngine,
    registry: &ContainerRegistry,
    bus: &dyn EventPublisher,
) -> Result<DiscoveryOutcome, EngineError> {
    let containers = engine.list_containers().await?;
    let seen: Vec<ContainerId> = containers.iter().map(|c| c.id.clone()).collect();

    let mut newly_observed = Vec::new();
    for descriptor in containers {
        let id = descriptor.id.clone();
        let outcome = registry.upsert(descriptor.clone());
        if outcome.changed() {
            bus.publish(BusEvent::ContainerUpdate(descriptor));
        }
        if outcome.is_new() {
            newly_observed.push(id);
        }
    }

    let removed = registry.mark_missing_except(&seen);
    for id in &removed {
        info!(container_id = %id, "container missing beyond grace period, removing");
    }

    Ok(DiscoveryOutcome { newly_observed, removed })
}

/// Runs discovery forever: an immediate pass, then one every
/// [`DISCOVERY_INTERVAL`], until `cancel` fires. `on_outcome` is invoked
/// with every pass's result so the orchestrator can spawn/cancel
/// per-container tasks.
pub async fn run_loop<F>(
    engine: Arc<dyn ContainerEngine>,
    registry: Arc<ContainerRegistry>,
    bus: Arc<dyn EventPublisher>,
    cancel: tokio_util::sync::CancellationToken,
    mut on_outcome: F,
) where
    F: FnMut(DiscoveryOutcome) + Send,
{
    let mut interval = tokio::time::interval(DISCOVERY_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {
                match run_pass(engine.as_ref(), &registry, bus.as_ref()).await {
                    Ok(outcome) => on_outcome(outcome),
                    Err(e) => warn!(error = %e, "discovery pass failed"),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
