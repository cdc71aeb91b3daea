// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sentinel_adapters::engine::fake::FakeEngine;
use sentinel_adapters::engine::HealthStatus;

#[tokio::test(start_paused = true)]
async fn resolves_after_two_consecutive_healthy_samples() {
    let engine = FakeEngine::default();
    let id = ContainerId::new("demo-api");
    engine.health.lock().insert(id.as_str().to_string(), HealthStatus::Running);

    let outcome = run(&id, &engine, Duration::from_secs(5), Duration::from_secs(60)).await;
    assert_eq!(outcome, VerifyOutcome::Resolved);
}

#[tokio::test(start_paused = true)]
async fn times_out_when_container_stays_unhealthy() {
    let engine = FakeEngine::default();
    let id = ContainerId::new("demo-api");
    engine.health.lock().insert(id.as_str().to_string(), HealthStatus::Unhealthy);

    let outcome = run(&id, &engine, Duration::from_secs(5), Duration::from_secs(60)).await;
    assert_eq!(outcome, VerifyOutcome::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn a_single_healthy_sample_is_not_enough() {
    let engine = FakeEngine::default();
    let id = ContainerId::new("demo-api");
    engine.health.lock().insert(id.as_str().to_string(), HealthStatus::Running);

    let verify = run(&id, &engine, Duration::from_secs(5), Duration::from_secs(60));
    let flip_back_down = async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        engine.health.lock().insert(id.as_str().to_string(), HealthStatus::Unhealthy);
    };

    let (outcome, _) = tokio::join!(verify, flip_back_down);
    // The streak reset after the first sample means the deadline elapses
    // without ever reaching two consecutive healthy samples.
    assert_eq!(outcome, VerifyOutcome::TimedOut);
}
