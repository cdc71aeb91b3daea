// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics sampler: polls the engine's stats endpoint once per
//! configured interval, converting cumulative counters to rates against the
//! previous sample.

use sentinel_adapters::engine::ContainerEngine;
use sentinel_core::{BusEvent, ContainerId, CumulativeStats, EventPublisher, MetricsEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::registry::ContainerRegistry;

pub async fn run(
    container_id: ContainerId,
    interval: Duration,
    engine: Arc<dyn ContainerEngine>,
    registry: Arc<ContainerRegistry>,
    bus: Arc<dyn EventPublisher>,
    cancel: CancellationToken,
) {
    let mut previous: Option<CumulativeStats> = None;
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        match engine.fetch_stats(&container_id).await {
            Ok(stats) => {
                let sample = stats.derive(previous.as_ref());
                previous = Some(stats);
                registry.update_sample(&container_id, sample);
                bus.publish(BusEvent::Metrics(MetricsEvent {
                    container_id: container_id.clone(),
                    sample,
                }));
            }
            Err(e) => {
                warn!(container_id = %container_id, error = %e, "metrics sample failed");
            }
        }
    }
}

#[cfg(test)]
#[path = "sampler_tests.rs"]
mod tests;
