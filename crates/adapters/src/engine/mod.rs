// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container engine adapters.
//!
//! [`ContainerEngine`] is the one seam the rest of the pipeline talks
//! through: discovery lists containers, the ingester and sampler poll logs
//! and stats, the root-cause engine reads redacted environment, and the
//! verifier polls health. `exec`/`commit_image`/`recreate_with_env` exist
//! for completeness — the remediation executor itself drives containers
//! indirectly, through the tool gateway's own catalog, not through this
//! trait directly.

pub mod docker;
pub mod kubernetes;

use async_trait::async_trait;
use sentinel_core::{ContainerDescriptor, ContainerId, CumulativeStats, LogLine};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Running,
    Unhealthy,
    Gone,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("container {0} not found")]
    NotFound(String),
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl EngineError {
    pub fn into_kind(self) -> sentinel_core::ErrorKind {
        sentinel_core::ErrorKind::EngineUnavailable { detail: self.to_string() }
    }
}

/// One batch of logs read since a given cursor, plus the cursor to resume
/// from on the next poll.
pub struct LogBatch {
    pub lines: Vec<LogLine>,
    pub next_since_ms: i64,
}

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// List every container bearing the monitor label, regardless of
    /// lifecycle state (discovery decides what to do with each).
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>, EngineError>;

    /// Fetch log lines emitted since `since_ms` (exclusive), capped at
    /// `max_lines`. Implementations poll rather than stream (see module
    /// docs on [`crate::http`]).
    async fn fetch_logs(
        &self,
        id: &ContainerId,
        since_ms: i64,
        max_lines: usize,
    ) -> Result<LogBatch, EngineError>;

    /// One-shot resource snapshot (CPU/memory cumulative counters, network
    /// and disk I/O totals). The caller (the metrics sampler) derives rates
    /// by calling [`CumulativeStats::derive`] against the previous sample.
    async fn fetch_stats(&self, id: &ContainerId) -> Result<CumulativeStats, EngineError>;

    /// Redacted-at-source is the caller's job; this returns raw key/value
    /// pairs as reported by the engine.
    async fn inspect_env(&self, id: &ContainerId) -> Result<Vec<(String, String)>, EngineError>;

    /// Current health as observed right now (verifier polls this).
    async fn health(&self, id: &ContainerId) -> Result<HealthStatus, EngineError>;

    async fn exec(
        &self,
        id: &ContainerId,
        command: &[String],
        timeout: Duration,
    ) -> Result<String, EngineError>;

    /// Commit the container's current filesystem state to an image,
    /// returning the image reference. Step one of the `update_env_vars`
    /// recreate path.
    async fn commit_image(&self, id: &ContainerId) -> Result<String, EngineError>;

    /// Destroy `id` and recreate it from `image` with `env` merged over its
    /// previous environment, returning the new container's id.
    async fn recreate_with_env(
        &self,
        id: &ContainerId,
        image: &str,
        env: &[(String, String)],
    ) -> Result<ContainerId, EngineError>;

    async fn restart(&self, id: &ContainerId) -> Result<(), EngineError>;
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// In-memory [`ContainerEngine`] for engine/executor tests: every
    /// method reads from or mutates a small table the test seeds up front.
    #[derive(Default)]
    pub struct FakeEngine {
        pub containers: Mutex<Vec<ContainerDescriptor>>,
        pub env: Mutex<HashMap<String, Vec<(String, String)>>>,
        pub health: Mutex<HashMap<String, HealthStatus>>,
        pub logs: Mutex<HashMap<String, Vec<LogLine>>>,
        pub stats: Mutex<HashMap<String, CumulativeStats>>,
        pub restarts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ContainerEngine for FakeEngine {
        async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>, EngineError> {
            Ok(self.containers.lock().clone())
        }

        async fn fetch_logs(
            &self,
            id: &ContainerId,
            since_ms: i64,
            max_lines: usize,
        ) -> Result<LogBatch, EngineError> {
            let lines: Vec<LogLine> = self
                .logs
                .lock()
                .get(id.as_str())
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter(|l| l.timestamp_ms as i64 > since_ms)
                .take(max_lines)
                .collect();
            let next_since_ms = lines.last().map(|l| l.timestamp_ms as i64).unwrap_or(since_ms);
            Ok(LogBatch { lines, next_since_ms })
        }

        async fn fetch_stats(&self, id: &ContainerId) -> Result<CumulativeStats, EngineError> {
            self.stats
                .lock()
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| EngineError::NotFound(id.to_string()))
        }

        async fn inspect_env(&self, id: &ContainerId) -> Result<Vec<(String, String)>, EngineError> {
            Ok(self.env.lock().get(id.as_str()).cloned().unwrap_or_default())
        }

        async fn health(&self, id: &ContainerId) -> Result<HealthStatus, EngineError> {
            Ok(*self.health.lock().get(id.as_str()).unwrap_or(&HealthStatus::Gone))
        }

        async fn exec(
            &self,
            _id: &ContainerId,
            _command: &[String],
            _timeout: Duration,
        ) -> Result<String, EngineError> {
            Ok(String::new())
        }

        async fn commit_image(&self, id: &ContainerId) -> Result<String, EngineError> {
            Ok(format!("{}:fake-commit", id.as_str()))
        }

        async fn recreate_with_env(
            &self,
            id: &ContainerId,
            _image: &str,
            env: &[(String, String)],
        ) -> Result<ContainerId, EngineError> {
            self.env.lock().insert(id.as_str().to_string(), env.to_vec());
            Ok(id.clone())
        }

        async fn restart(&self, id: &ContainerId) -> Result<(), EngineError> {
            self.restarts.lock().push(id.as_str().to_string());
            Ok(())
        }
    }
}
