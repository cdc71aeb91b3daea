// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource samples and the bounded per-container ring that retains them.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum resource samples retained per container for snapshot queries
/// (retained in a bounded ring of up to 120 samples per container).
pub const MAX_SAMPLES_PER_CONTAINER: usize = 120;

/// A single point-in-time resource reading for a container.
///
/// Rate-dependent fields (`cpu_percent`, network, disk) require two
/// consecutive cumulative-counter samples and are `None` on the first
/// sample taken after a container is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceSample {
    pub timestamp_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    pub memory_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_rx_bytes_per_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_tx_bytes_per_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_read_bytes_per_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_write_bytes_per_sec: Option<f64>,
}

/// Raw cumulative counters read directly from the engine's stats endpoint,
/// before being converted into rates against a previous sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CumulativeStats {
    pub timestamp_ms: u64,
    pub cpu_total_usage_ns: u64,
    pub system_cpu_usage_ns: u64,
    pub online_cpus: u32,
    pub memory_used_bytes: u64,
    pub memory_limit_bytes: u64,
    pub net_rx_bytes: u64,
    pub net_tx_bytes: u64,
    pub block_read_bytes: u64,
    pub block_write_bytes: u64,
}

impl CumulativeStats {
    /// Derive a [`ResourceSample`] from this reading and the previous one.
    ///
    /// CPU percent is `(cpu_delta / system_delta) * online_cpus * 100`.
    /// Rate fields are `None` when there is no previous sample
    /// to delta against, or when the clock did not advance.
    pub fn derive(&self, previous: Option<&CumulativeStats>) -> ResourceSample {
        let memory_percent = if self.memory_limit_bytes > 0 {
            (self.memory_used_bytes as f64 / self.memory_limit_bytes as f64) * 100.0
        } else {
            0.0
        };

        let rates = previous.and_then(|prev| {
            let elapsed_ms = self.timestamp_ms.checked_sub(prev.timestamp_ms)?;
            if elapsed_ms == 0 {
                return None;
            }
            let elapsed_secs = elapsed_ms as f64 / 1000.0;

            let cpu_delta = self.cpu_total_usage_ns.saturating_sub(prev.cpu_total_usage_ns) as f64;
            let system_delta =
                self.system_cpu_usage_ns.saturating_sub(prev.system_cpu_usage_ns) as f64;
            let cpu_percent = if system_delta > 0.0 {
                (cpu_delta / system_delta) * self.online_cpus.max(1) as f64 * 100.0
            } else {
                0.0
            };

            let net_rx = self.net_rx_bytes.saturating_sub(prev.net_rx_bytes) as f64 / elapsed_secs;
            let net_tx = self.net_tx_bytes.saturating_sub(prev.net_tx_bytes) as f64 / elapsed_secs;
            let block_read =
                self.block_read_bytes.saturating_sub(prev.block_read_bytes) as f64 / elapsed_secs;
            let block_write =
                self.block_write_bytes.saturating_sub(prev.block_write_bytes) as f64 / elapsed_secs;

            Some((cpu_percent, net_rx, net_tx, block_read, block_write))
        });

        match rates {
            Some((cpu, rx, tx, br, bw)) => ResourceSample {
                timestamp_ms: self.timestamp_ms,
                cpu_percent: Some(cpu),
                memory_percent,
                net_rx_bytes_per_sec: Some(rx),
                net_tx_bytes_per_sec: Some(tx),
                block_read_bytes_per_sec: Some(br),
                block_write_bytes_per_sec: Some(bw),
            },
            None => ResourceSample {
                timestamp_ms: self.timestamp_ms,
                cpu_percent: None,
                memory_percent,
                net_rx_bytes_per_sec: None,
                net_tx_bytes_per_sec: None,
                block_read_bytes_per_sec: None,
                block_write_bytes_per_sec: None,
            },
        }
    }
}

/// Fixed-capacity ring of resource samples for one container, used to back
/// snapshot queries without unbounded memory growth.
#[derive(Debug, Clone, Default)]
pub struct SampleRing {
    samples: VecDeque<ResourceSample>,
}

impl SampleRing {
    pub fn new() -> Self {
        Self { samples: VecDeque::with_capacity(MAX_SAMPLES_PER_CONTAINER) }
    }

    pub fn push(&mut self, sample: ResourceSample) {
        if self.samples.len() >= MAX_SAMPLES_PER_CONTAINER {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn latest(&self) -> Option<&ResourceSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceSample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
