// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single parameterized retry/backoff combinator, shared by the log
//! ingester's reconnect loop, the
//! remediation executor's transient-error retry, and the container engine
//! adapter's reconnect-on-disconnect logic.

use std::time::Duration;

/// Exponential backoff schedule with an optional jitter fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub multiplier: f64,
    pub cap: Duration,
    /// Fraction of the computed delay to randomize, in `[0, 1]`.
    pub jitter: f64,
}

impl Backoff {
    pub const fn new(base: Duration, multiplier: f64, cap: Duration) -> Self {
        Self { base, multiplier, cap, jitter: 0.0 }
    }

    pub const fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before the (1-indexed) `attempt`'th retry.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let millis = (self.base.as_millis() as f64 * exp).min(self.cap.as_millis() as f64);
        let jittered = if self.jitter > 0.0 {
            let spread = millis * self.jitter;
            millis - spread / 2.0 + spread * deterministic_fraction(attempt)
        } else {
            millis
        };
        Duration::from_millis(jittered.max(0.0) as u64)
    }

    /// Ingester reconnect: 1s base, x2, capped at 30s.
    pub const INGESTER_RECONNECT: Backoff = Backoff::new(Duration::from_secs(1), 2.0, Duration::from_secs(30));

    /// Gateway transient-error retry: 1s then 3s.
    pub const GATEWAY_RETRY: Backoff = Backoff::new(Duration::from_secs(1), 3.0, Duration::from_secs(3));
}

/// Cheap, deterministic pseudo-jitter fraction in `[0, 1)` derived from the
/// attempt counter, avoiding a dependency on a random-number generator for
/// what is a cosmetic anti-thundering-herd spread.
fn deterministic_fraction(attempt: u32) -> f64 {
    let h = attempt.wrapping_mul(2_654_435_761);
    (h % 1000) as f64 / 1000.0
}

/// Run `f` until it returns `Ok`, or `attempts` total tries have been made,
/// sleeping according to `backoff` between tries. The first call is not
/// delayed. Returns the last error if all attempts are exhausted.
#[allow(clippy::expect_used)]
pub async fn retry<T, E, F, Fut>(attempts: u32, backoff: Backoff, mut f: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut last_err = None;
    for attempt in 1..=attempts.max(1) {
        match f(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                last_err = Some(e);
                if attempt < attempts {
                    tokio::time::sleep(backoff.delay_for(attempt)).await;
                }
            }
        }
    }
    Err(last_err.expect("attempts >= 1 guarantees at least one error"))
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
