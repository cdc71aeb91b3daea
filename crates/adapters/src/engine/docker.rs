// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Docker Engine API adapter — talks to `/var/run/docker.sock` via the
//! Unix-socket HTTP client in [`crate::http`]. Unauthenticated: the Docker
//! daemon itself is the trust boundary.

use super::{ContainerEngine, EngineError, HealthStatus, LogBatch};
use crate::http::{self, HttpError};
use async_trait::async_trait;
use sentinel_core::{ContainerDescriptor, ContainerId, ContainerStatus, CumulativeStats, LogLevel, LogLine, LogStream};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// Label that opts a container into monitoring.
pub const MONITOR_LABEL: &str = "sre-sentinel.monitor";
pub const SERVICE_LABEL: &str = "sre-sentinel.service";

pub struct DockerEngine {
    socket_path: PathBuf,
}

impl DockerEngine {
    pub fn new() -> Self {
        let socket_path = std::env::var("SENTINEL_DOCKER_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/var/run/docker.sock"));
        Self { socket_path }
    }

    fn map_http(e: HttpError) -> EngineError {
        match e {
            HttpError::Status { status: 404, body } => EngineError::NotFound(body),
            other => EngineError::Unavailable(other.to_string()),
        }
    }

    async fn get(&self, path: &str) -> Result<Value, EngineError> {
        let body = http::get(&self.socket_path, path).await.map_err(Self::map_http)?;
        serde_json::from_str(&body)
            .map_err(|e| EngineError::Unavailable(format!("bad JSON from engine: {e}")))
    }
}

impl Default for DockerEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn status_from_state(state: &str) -> ContainerStatus {
    match state {
        "running" => ContainerStatus::Running,
        "created" | "restarting" => ContainerStatus::Starting,
        "exited" | "dead" | "removing" => ContainerStatus::Exited,
        _ => ContainerStatus::Unknown,
    }
}

fn descriptor_from_summary(v: &Value, now_ms: u64) -> Option<ContainerDescriptor> {
    let labels = v.get("Labels")?.as_object()?;
    if labels.get(MONITOR_LABEL).and_then(Value::as_str) != Some("true") {
        return None;
    }
    let id = v.get("Id")?.as_str()?.to_string();
    let service =
        labels.get(SERVICE_LABEL).and_then(Value::as_str).unwrap_or("unknown").to_string();
    let name = v
        .get("Names")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(Value::as_str)
        .map(|s| s.trim_start_matches('/').to_string())
        .unwrap_or_else(|| id.clone());
    let status = v.get("State").and_then(Value::as_str).map(status_from_state).unwrap_or_default();
    let created_at_ms =
        v.get("Created").and_then(Value::as_u64).map(|secs| secs.saturating_mul(1000)).unwrap_or(now_ms);

    Some(ContainerDescriptor::new(ContainerId::new(id), name, service, created_at_ms)).map(|mut d| {
        d.status = status;
        d
    })
}

/// Demultiplex Docker's 8-byte-framed combined stdout/stderr stream into
/// `(stream, raw_bytes)` pairs. Frame layout: 1 stream-type byte (1=stdout,
/// 2=stderr), 3 reserved bytes, 4-byte big-endian payload length, payload.
pub fn demux_frames(mut bytes: &[u8]) -> Vec<(LogStream, Vec<u8>)> {
    let mut out = Vec::new();
    while bytes.len() >= 8 {
        let stream = match bytes[0] {
            2 => LogStream::Stderr,
            _ => LogStream::Stdout,
        };
        let len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        if bytes.len() < 8 + len {
            break;
        }
        out.push((stream, bytes[8..8 + len].to_vec()));
        bytes = &bytes[8 + len..];
    }
    out
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>, EngineError> {
        let now_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let body = self.get("/containers/json?all=true").await?;
        let items = body.as_array().ok_or_else(|| EngineError::Unavailable("expected array".into()))?;
        Ok(items.iter().filter_map(|v| descriptor_from_summary(v, now_ms)).collect())
    }

    async fn fetch_logs(
        &self,
        id: &ContainerId,
        since_ms: i64,
        max_lines: usize,
    ) -> Result<LogBatch, EngineError> {
        let since_secs = (since_ms / 1000).max(0);
        let path = format!(
            "/containers/{}/logs?stdout=true&stderr=true&timestamps=true&since={since_secs}",
            id.as_str()
        );
        let raw = http::get(&self.socket_path, &path).await.map_err(Self::map_http)?;
        let frames = demux_frames(raw.as_bytes());
        let mut lines = Vec::new();
        let mut next_since_ms = since_ms;
        for (stream, payload) in frames {
            let text = String::from_utf8_lossy(&payload);
            for line in text.lines() {
                let (ts_ms, rest) = parse_docker_timestamp(line);
                if ts_ms <= since_ms {
                    continue;
                }
                lines.push(LogLine {
                    container_id: id.clone(),
                    stream,
                    level: LogLevel::infer(rest),
                    text: rest.to_string(),
                    timestamp_ms: ts_ms as u64,
                });
                next_since_ms = next_since_ms.max(ts_ms);
                if lines.len() >= max_lines {
                    break;
                }
            }
        }
        Ok(LogBatch { lines, next_since_ms })
    }

    async fn fetch_stats(&self, id: &ContainerId) -> Result<CumulativeStats, EngineError> {
        let path = format!("/containers/{}/stats?stream=false", id.as_str());
        let body = self.get(&path).await?;
        cumulative_from_stats_json(&body)
    }

    async fn inspect_env(&self, id: &ContainerId) -> Result<Vec<(String, String)>, EngineError> {
        let path = format!("/containers/{}/json", id.as_str());
        let body = self.get(&path).await?;
        let env = body
            .get("Config")
            .and_then(|c| c.get("Env"))
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .filter_map(|kv| kv.split_once('='))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(env)
    }

    async fn health(&self, id: &ContainerId) -> Result<HealthStatus, EngineError> {
        let path = format!("/containers/{}/json", id.as_str());
        let body = match self.get(&path).await {
            Ok(b) => b,
            Err(EngineError::NotFound(_)) => return Ok(HealthStatus::Gone),
            Err(e) => return Err(e),
        };
        let state = body.get("State").cloned().unwrap_or_default();
        let running = state.get("Running").and_then(Value::as_bool).unwrap_or(false);
        let health = state.get("Health").and_then(|h| h.get("Status")).and_then(Value::as_str);
        match (running, health) {
            (true, Some("unhealthy")) => Ok(HealthStatus::Unhealthy),
            (true, _) => Ok(HealthStatus::Running),
            (false, _) => Ok(HealthStatus::Unhealthy),
        }
    }

    async fn exec(
        &self,
        id: &ContainerId,
        command: &[String],
        timeout: Duration,
    ) -> Result<String, EngineError> {
        let create_body = serde_json::json!({
            "AttachStdout": true,
            "AttachStderr": true,
            "Cmd": command,
        })
        .to_string();
        let created = http::timed_request_with_timeout(
            &self.socket_path,
            &format!(
                "POST /containers/{}/exec HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                id.as_str(),
                create_body.len(),
                create_body
            ),
            timeout,
        )
        .await
        .map_err(Self::map_http)?;
        let exec_id: Value = serde_json::from_str(&created.body)
            .map_err(|e| EngineError::Unavailable(format!("bad exec/create response: {e}")))?;
        let exec_id = exec_id
            .get("Id")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::Unavailable("exec/create returned no Id".into()))?;

        let start_body = serde_json::json!({"Detach": false, "Tty": false}).to_string();
        let started = http::timed_request_with_timeout(
            &self.socket_path,
            &format!(
                "POST /exec/{exec_id}/start HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                start_body.len(),
                start_body
            ),
            timeout,
        )
        .await
        .map_err(Self::map_http)?;

        let frames = demux_frames(started.body.as_bytes());
        let mut out = String::new();
        for (_, payload) in frames {
            out.push_str(&String::from_utf8_lossy(&payload));
        }
        Ok(out)
    }

    async fn commit_image(&self, id: &ContainerId) -> Result<String, EngineError> {
        let path = format!("/commit?container={}", id.as_str());
        let body = http::post(&self.socket_path, &path, "").await.map_err(Self::map_http)?;
        let v: Value = serde_json::from_str(&body)
            .map_err(|e| EngineError::Unavailable(format!("bad commit response: {e}")))?;
        v.get("Id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EngineError::Unavailable("commit returned no Id".into()))
    }

    async fn recreate_with_env(
        &self,
        id: &ContainerId,
        image: &str,
        env: &[(String, String)],
    ) -> Result<ContainerId, EngineError> {
        let inspect_path = format!("/containers/{}/json", id.as_str());
        let inspect = self.get(&inspect_path).await?;
        let name = inspect
            .get("Name")
            .and_then(Value::as_str)
            .map(|s| s.trim_start_matches('/').to_string())
            .unwrap_or_else(|| id.as_str().to_string());

        let existing_env: Vec<String> = inspect
            .get("Config")
            .and_then(|c| c.get("Env"))
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        let mut merged: Vec<String> = existing_env
            .into_iter()
            .filter(|kv| {
                let key = kv.split_once('=').map(|(k, _)| k).unwrap_or(kv.as_str());
                !env.iter().any(|(k, _)| k == key)
            })
            .collect();
        merged.extend(env.iter().map(|(k, v)| format!("{k}={v}")));

        let host_config = inspect.get("HostConfig").cloned().unwrap_or_default();

        http::delete(&self.socket_path, &format!("/containers/{}?force=true", id.as_str()))
            .await
            .map_err(Self::map_http)?;

        let create_body = serde_json::json!({
            "Image": image,
            "Env": merged,
            "HostConfig": host_config,
        })
        .to_string();
        let create_path = format!("/containers/create?name={name}");
        let created =
            http::post(&self.socket_path, &create_path, &create_body).await.map_err(Self::map_http)?;
        let created: Value = serde_json::from_str(&created)
            .map_err(|e| EngineError::Unavailable(format!("bad create response: {e}")))?;
        let new_id = created
            .get("Id")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::Unavailable("create returned no Id".into()))?
            .to_string();

        http::post(&self.socket_path, &format!("/containers/{new_id}/start"), "")
            .await
            .map_err(Self::map_http)?;

        Ok(ContainerId::new(new_id))
    }

    async fn restart(&self, id: &ContainerId) -> Result<(), EngineError> {
        http::post(&self.socket_path, &format!("/containers/{}/restart", id.as_str()), "")
            .await
            .map_err(Self::map_http)?;
        Ok(())
    }
}

/// Parse a Docker timestamped log line (`2026-07-28T10:00:00.000000000Z
/// message text`) into `(millis_since_epoch, remaining_text)`. Falls back to
/// `(0, line)` if the line isn't timestamp-prefixed (defensive; Docker
/// always sends this when `timestamps=true` is set).
fn parse_docker_timestamp(line: &str) -> (i64, &str) {
    let Some((ts, rest)) = line.split_once(' ') else {
        return (0, line);
    };
    let parsed = chrono::DateTime::parse_from_rfc3339(ts).map(|dt| dt.timestamp_millis());
    match parsed {
        Ok(ms) => (ms, rest),
        Err(_) => (0, line),
    }
}

fn cumulative_from_stats_json(v: &Value) -> Result<CumulativeStats, EngineError> {
    let bad = || EngineError::Unavailable("malformed stats payload".into());
    let cpu_total_usage_ns =
        v.pointer("/cpu_stats/cpu_usage/total_usage").and_then(Value::as_u64).ok_or_else(bad)?;
    let system_cpu_usage_ns =
        v.pointer("/cpu_stats/system_cpu_usage").and_then(Value::as_u64).unwrap_or(0);
    let online_cpus = v.pointer("/cpu_stats/online_cpus").and_then(Value::as_u64).unwrap_or(1) as u32;
    let memory_used_bytes = v.pointer("/memory_stats/usage").and_then(Value::as_u64).unwrap_or(0);
    let memory_limit_bytes = v.pointer("/memory_stats/limit").and_then(Value::as_u64).unwrap_or(0);

    let (net_rx_bytes, net_tx_bytes) = v
        .get("networks")
        .and_then(Value::as_object)
        .map(|nets| {
            nets.values().fold((0u64, 0u64), |(rx, tx), n| {
                (
                    rx + n.get("rx_bytes").and_then(Value::as_u64).unwrap_or(0),
                    tx + n.get("tx_bytes").and_then(Value::as_u64).unwrap_or(0),
                )
            })
        })
        .unwrap_or((0, 0));

    let (block_read_bytes, block_write_bytes) = v
        .pointer("/blkio_stats/io_service_bytes_recursive")
        .and_then(Value::as_array)
        .map(|entries| {
            entries.iter().fold((0u64, 0u64), |(r, w), e| {
                let op = e.get("op").and_then(Value::as_str).unwrap_or("");
                let val = e.get("value").and_then(Value::as_u64).unwrap_or(0);
                match op {
                    "Read" | "read" => (r + val, w),
                    "Write" | "write" => (r, w + val),
                    _ => (r, w),
                }
            })
        })
        .unwrap_or((0, 0));

    let timestamp_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    Ok(CumulativeStats {
        timestamp_ms,
        cpu_total_usage_ns,
        system_cpu_usage_ns,
        online_cpus,
        memory_used_bytes,
        memory_limit_bytes,
        net_rx_bytes,
        net_tx_bytes,
        block_read_bytes,
        block_write_bytes,
    })
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
