// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-remediation verifier. Polls the target container's
//! health on a fixed cadence for a bounded total wait, requiring two
//! consecutive healthy samples before declaring the incident resolved —
//! this is the fix for the open question of whether a restart-count bump
//! alone should count as healthy. It shouldn't, since a single
//! sample can't distinguish "just restarted, now fine" from "crash loop").

use std::time::Duration;

use sentinel_adapters::engine::{ContainerEngine, HealthStatus};
use sentinel_core::ContainerId;
use tracing::debug;

/// Default: sample every 5 s.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);
/// Default: give up after 60 s total.
pub const MAX_WAIT: Duration = Duration::from_secs(60);
/// Consecutive healthy samples required before declaring resolved.
const CONSECUTIVE_HEALTHY_REQUIRED: u32 = 2;

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    Resolved,
    /// The deadline elapsed (or health regressed at the last sample)
    /// without two consecutive healthy samples.
    TimedOut,
}

/// Polls `engine.health(container_id)` every `sample_interval` until either
/// two consecutive samples report [`HealthStatus::Running`] or `max_wait`
/// elapses, whichever comes first.
pub async fn run(
    container_id: &ContainerId,
    engine: &dyn ContainerEngine,
    sample_interval: Duration,
    max_wait: Duration,
) -> VerifyOutcome {
    let deadline = tokio::time::Instant::now() + max_wait;
    let mut consecutive_healthy = 0u32;

    loop {
        match engine.health(container_id).await {
            Ok(HealthStatus::Running) => {
                consecutive_healthy += 1;
                debug!(container_id = %container_id, consecutive_healthy, "healthy sample");
                if consecutive_healthy >= CONSECUTIVE_HEALTHY_REQUIRED {
                    return VerifyOutcome::Resolved;
                }
            }
            Ok(other) => {
                debug!(container_id = %container_id, status = ?other, "non-healthy sample, resetting streak");
                consecutive_healthy = 0;
            }
            Err(e) => {
                debug!(container_id = %container_id, error = %e, "health probe failed, resetting streak");
                consecutive_healthy = 0;
            }
        }

        let now = tokio::time::Instant::now();
        if now >= deadline {
            return VerifyOutcome::TimedOut;
        }
        let remaining = deadline - now;
        tokio::time::sleep(sample_interval.min(remaining)).await;
        if tokio::time::Instant::now() >= deadline {
            return VerifyOutcome::TimedOut;
        }
    }
}

#[cfg(test)]
#[path = "verifier_tests.rs"]
mod tests;
