// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate. Every
//! variable in the configuration table is resolved here, with typed
//! accessors and defaults; missing required variables produce
//! [`sentinel_core::ErrorKind::ConfigError`] rather than panicking deep
//! inside some adapter constructor.

use std::path::PathBuf;
use std::time::Duration;

use sentinel_core::ErrorKind;

#[derive(Debug, Clone, thiserror::Error)]
#[error("missing required configuration: {0}")]
pub struct ConfigError(pub String);

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ConfigError { detail: self.0.clone() }
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError(name.to_string()))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    optional(name).and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Which container engine adapter to construct. `SENTINEL_ENGINE=kubernetes`
/// switches to the `kube`-backed adapter; anything else (including unset)
/// uses the Docker Engine API over a Unix socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Docker,
    Kubernetes,
}

pub fn engine_kind() -> EngineKind {
    match optional("SENTINEL_ENGINE").as_deref() {
        Some("kubernetes") | Some("k8s") => EngineKind::Kubernetes,
        _ => EngineKind::Docker,
    }
}

pub struct ClassifierConfig {
    pub url: String,
    pub key: String,
    pub model: String,
}

pub fn fast_classifier_config() -> Result<ClassifierConfig, ConfigError> {
    Ok(ClassifierConfig {
        url: required("FAST_CLASSIFIER_URL")?,
        key: required("FAST_CLASSIFIER_KEY")?,
        model: required("FAST_CLASSIFIER_MODEL")?,
    })
}

pub struct AnalyzerConfig {
    pub url: String,
    pub key: String,
    pub model: String,
}

pub fn deep_analyzer_config() -> Result<AnalyzerConfig, ConfigError> {
    Ok(AnalyzerConfig {
        url: required("DEEP_ANALYZER_URL")?,
        key: required("DEEP_ANALYZER_KEY")?,
        model: required("DEEP_ANALYZER_MODEL")?,
    })
}

pub fn tool_gateway_url() -> Result<String, ConfigError> {
    required("TOOL_GATEWAY_URL")
}

/// Directory the daemon's rotated log file is written into.
/// `SENTINEL_STATE_DIR` overrides; otherwise `dirs::state_dir()` (falling
/// back to the data dir on platforms without a distinct state dir),
/// joined with `sentinel`.
pub fn log_dir() -> PathBuf {
    if let Some(dir) = optional("SENTINEL_STATE_DIR") {
        return PathBuf::from(dir).join("logs");
    }
    dirs::state_dir()
        .or_else(dirs::data_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("sentinel")
        .join("logs")
}

/// `API_PORT`, default 8000.
pub fn api_port() -> u16 {
    parsed_or("API_PORT", 8000)
}

/// `AUTO_HEAL_ENABLED`, default true. Any value other than a literal
/// `"false"` (case-insensitive) is treated as enabled.
pub fn auto_heal_enabled() -> bool {
    optional("AUTO_HEAL_ENABLED").map(|v| !v.eq_ignore_ascii_case("false")).unwrap_or(true)
}

/// `LOG_LINES_PER_CHECK`, default 20 — the log window size.
pub fn log_lines_per_check() -> usize {
    parsed_or("LOG_LINES_PER_CHECK", sentinel_core::DEFAULT_WINDOW_SIZE)
}

/// `LOG_CHECK_INTERVAL`, default 5s — despite the name, this governs the
/// metrics sampler's poll cadence (see `OrchestratorConfig::sample_interval`
/// doc note; the environment table's naming is inherited as-is).
pub fn log_check_interval() -> Duration {
    Duration::from_secs(parsed_or("LOG_CHECK_INTERVAL", 5))
}

/// Bounded queue capacity given to each event bus subscriber that doesn't
/// specify its own (the dashboard WS connection).
pub fn event_bus_subscriber_capacity() -> usize {
    parsed_or("EVENT_BUS_SUBSCRIBER_CAPACITY", 256)
}

/// `EVENT_BUS_WAL_PATH` — when set, the event bus appends every publish to
/// a durable `sentinel-wal::Wal` at this path before lossy fan-out, so a
/// reconnecting dashboard can request backlog since a sequence number.
/// Unset by default: the bus runs fan-out only, matching a fresh process
/// with no durability requirement.
pub fn event_bus_wal_path() -> Option<PathBuf> {
    optional("EVENT_BUS_WAL_PATH").map(PathBuf::from)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
