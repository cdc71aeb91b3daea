// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container descriptor and lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::ResourceSample;

/// Stable, engine-assigned container identifier (Docker container id / pod UID).
///
/// Unlike the generated ids in [`crate::id`], this is never minted locally —
/// it is always copied verbatim from the container engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, the conventional short form engines print.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

impl From<String> for ContainerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContainerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ContainerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for ContainerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Lifecycle status reported by the container engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerStatus {
    Running,
    Starting,
    Exited,
    Unknown,
}

crate::simple_display! {
    ContainerStatus {
        Running => "running",
        Starting => "starting",
        Exited => "exited",
        Unknown => "unknown",
    }
}

impl Default for ContainerStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// A monitored container as tracked by the registry.
///
/// Created when discovery observes a container carrying the
/// `sre-sentinel.monitor=true` label; mutated by discovery and the metrics
/// sampler; removed once it has been missing from the engine for more than
/// the grace period (two discovery passes, ~30s).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    pub id: ContainerId,
    pub name: String,
    /// `sre-sentinel.service=<name>` label value.
    pub service: String,
    pub status: ContainerStatus,
    pub restart_count: u32,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sample: Option<ResourceSample>,
    /// Number of consecutive discovery passes this container was not seen in.
    /// Reset to 0 on every successful observation.
    #[serde(default)]
    pub missed_passes: u32,
}

impl ContainerDescriptor {
    /// Grace period for missed discovery passes (~30s / 2 passes at 15s cadence).
    pub const MAX_MISSED_PASSES: u32 = 2;

    pub fn new(
        id: ContainerId,
        name: impl Into<String>,
        service: impl Into<String>,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            service: service.into(),
            status: ContainerStatus::Unknown,
            restart_count: 0,
            created_at_ms,
            last_sample: None,
            missed_passes: 0,
        }
    }

    pub fn should_remove(&self) -> bool {
        self.missed_passes > Self::MAX_MISSED_PASSES
    }
}

#[cfg(test)]
#[path = "container_tests.rs"]
mod tests;
