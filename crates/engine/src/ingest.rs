// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log ingester. The container engine adapter is poll-based
//! rather than a long-lived stream (see `sentinel_adapters::http` module
//! docs), so the ingester's poll cadence doubles as the window's flush
//! interval: each poll fetches everything since the last cursor, feeds it
//! through the window builder, and flushes whatever is buffered — which is
//! exactly "window full, or flush interval elapsed with >=1 buffered line"
//! since the poll period *is* the flush interval.

use sentinel_adapters::engine::ContainerEngine;
use sentinel_core::{redact, BusEvent, ContainerId, EventPublisher, LogWindow, WindowBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::history::RecentLogs;

/// Default flush interval.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(2);
/// Cap on lines fetched per poll; generous relative to the default window
/// size so a burst doesn't straddle more than a couple of polls.
const MAX_LINES_PER_POLL: usize = 500;

pub struct IngesterConfig {
    pub container_id: ContainerId,
    pub window_size: usize,
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    config: IngesterConfig,
    engine: Arc<dyn ContainerEngine>,
    bus: Arc<dyn EventPublisher>,
    recent_logs: Arc<RecentLogs>,
    window_tx: mpsc::Sender<LogWindow>,
    cancel: CancellationToken,
    now_ms: impl Fn() -> i64 + Send,
) {
    let IngesterConfig { container_id, window_size } = config;
    let mut since_ms: i64 = now_ms();
    let mut builder = WindowBuilder::new(container_id.clone(), window_size);
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            break;
        }
        match engine.fetch_logs(&container_id, since_ms, MAX_LINES_PER_POLL).await {
            Ok(batch) => {
                attempt = 0;
                since_ms = batch.next_since_ms.max(since_ms);
                for mut line in batch.lines {
                    line.text = redact::redact_text(&line.text);
                    recent_logs.push(&container_id, line.text.clone());
                    bus.publish(BusEvent::Log(line.clone()));
                    if let Some(window) = builder.push(line) {
                        let _ = window_tx.send(window).await;
                    }
                }
                if !builder.is_empty() {
                    if let Some(window) = builder.flush() {
                        let _ = window_tx.send(window).await;
                    }
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(FLUSH_INTERVAL) => {}
                }
            }
            Err(e) => {
                warn!(container_id = %container_id, error = %e, "log ingest failed, backing off");
                attempt += 1;
                let delay = sentinel_core::Backoff::INGESTER_RECONNECT.delay_for(attempt);
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    if !builder.is_empty() {
        if let Some(window) = builder.flush() {
            let _ = window_tx.send(window).await;
        }
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
