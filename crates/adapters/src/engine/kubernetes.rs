// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes container engine adapter. Lists and observes pods the
//! operator already created, selected by a monitor label, rather than
//! spawning any pods of its own.

use super::{ContainerEngine, EngineError, HealthStatus, LogBatch};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams, LogParams};
use kube::Client;
use sentinel_core::{ContainerDescriptor, ContainerId, ContainerStatus, CumulativeStats, LogLevel, LogLine, LogStream};
use std::time::Duration;

pub const MONITOR_LABEL: &str = "sre-sentinel.monitor";
pub const SERVICE_LABEL: &str = "sre-sentinel.service";

pub struct KubernetesEngine {
    client: Client,
    namespace: String,
}

impl KubernetesEngine {
    pub async fn new() -> Result<Self, EngineError> {
        let client = Client::try_default()
            .await
            .map_err(|e| EngineError::Unavailable(format!("kube client init failed: {e}")))?;
        let namespace = std::env::var("SENTINEL_K8S_NAMESPACE").unwrap_or_else(|_| "default".to_string());
        Ok(Self { client, namespace })
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    async fn get_pod(&self, id: &ContainerId) -> Result<Pod, EngineError> {
        self.pods().get(id.as_str()).await.map_err(|e| match e {
            kube::Error::Api(resp) if resp.code == 404 => EngineError::NotFound(id.to_string()),
            other => EngineError::Unavailable(other.to_string()),
        })
    }
}

fn status_from_phase(phase: Option<&str>, container_statuses_running: bool) -> ContainerStatus {
    match phase {
        Some("Running") if container_statuses_running => ContainerStatus::Running,
        Some("Running") | Some("Pending") => ContainerStatus::Starting,
        Some("Succeeded") | Some("Failed") => ContainerStatus::Exited,
        _ => ContainerStatus::Unknown,
    }
}

fn descriptor_from_pod(pod: &Pod) -> Option<ContainerDescriptor> {
    let meta = &pod.metadata;
    let labels = meta.labels.as_ref()?;
    if labels.get(MONITOR_LABEL).map(String::as_str) != Some("true") {
        return None;
    }
    let id = meta.uid.clone()?;
    let name = meta.name.clone().unwrap_or_else(|| id.clone());
    let service = labels.get(SERVICE_LABEL).cloned().unwrap_or_else(|| "unknown".to_string());
    let status = pod.status.as_ref();
    let phase = status.and_then(|s| s.phase.as_deref());
    let running = status
        .and_then(|s| s.container_statuses.as_ref())
        .map(|cs| cs.iter().all(|c| c.ready))
        .unwrap_or(false);
    let created_at_ms = meta
        .creation_timestamp
        .as_ref()
        .map(|t| t.0.timestamp_millis().max(0) as u64)
        .unwrap_or(0);
    let restart_count = status
        .and_then(|s| s.container_statuses.as_ref())
        .map(|cs| cs.iter().map(|c| c.restart_count.max(0) as u32).sum())
        .unwrap_or(0);

    let mut d = ContainerDescriptor::new(ContainerId::new(id), name, service, created_at_ms);
    d.status = status_from_phase(phase, running);
    d.restart_count = restart_count;
    Some(d)
}

#[async_trait]
impl ContainerEngine for KubernetesEngine {
    async fn list_containers(&self) -> Result<Vec<ContainerDescriptor>, EngineError> {
        let pods = self.pods().list(&Default::default()).await.map_err(|e| {
            EngineError::Unavailable(format!("pod list failed: {e}"))
        })?;
        Ok(pods.items.iter().filter_map(descriptor_from_pod).collect())
    }

    async fn fetch_logs(
        &self,
        id: &ContainerId,
        since_ms: i64,
        max_lines: usize,
    ) -> Result<LogBatch, EngineError> {
        let since_seconds = ((chrono_now_ms() - since_ms).max(0) / 1000) as i64;
        let params = LogParams {
            since_seconds: Some(since_seconds.max(1)),
            timestamps: true,
            ..Default::default()
        };
        let raw = self
            .pods()
            .logs(id.as_str(), &params)
            .await
            .map_err(|e| EngineError::Unavailable(format!("log fetch failed: {e}")))?;

        let mut lines = Vec::new();
        let mut next_since_ms = since_ms;
        for line in raw.lines().take(max_lines) {
            let Some((ts, rest)) = line.split_once(' ') else { continue };
            let ts_ms = chrono::DateTime::parse_from_rfc3339(ts).map(|dt| dt.timestamp_millis()).unwrap_or(0);
            if ts_ms <= since_ms {
                continue;
            }
            lines.push(LogLine {
                container_id: id.clone(),
                stream: LogStream::Stdout,
                level: LogLevel::infer(rest),
                text: rest.to_string(),
                timestamp_ms: ts_ms as u64,
            });
            next_since_ms = next_since_ms.max(ts_ms);
        }
        Ok(LogBatch { lines, next_since_ms })
    }

    async fn fetch_stats(&self, _id: &ContainerId) -> Result<CumulativeStats, EngineError> {
        // The core Kubernetes API does not expose cgroup counters; that
        // requires the metrics-server aggregation API, which is a cluster
        // add-on this makes no assumption is installed (single-instance, no
        // distributed-coordination assumptions). Until wired to
        // metrics.k8s.io, report zeroed counters rather than fail discovery.
        Err(EngineError::Unsupported("kubernetes stats require metrics-server"))
    }

    async fn inspect_env(&self, id: &ContainerId) -> Result<Vec<(String, String)>, EngineError> {
        let pod = self.get_pod(id).await?;
        let env = pod
            .spec
            .as_ref()
            .and_then(|s| s.containers.first())
            .and_then(|c| c.env.as_ref())
            .map(|vars| {
                vars.iter()
                    .filter_map(|v| v.value.as_ref().map(|val| (v.name.clone(), val.clone())))
                    .collect()
            })
            .unwrap_or_default();
        Ok(env)
    }

    async fn health(&self, id: &ContainerId) -> Result<HealthStatus, EngineError> {
        let pod = match self.get_pod(id).await {
            Ok(p) => p,
            Err(EngineError::NotFound(_)) => return Ok(HealthStatus::Gone),
            Err(e) => return Err(e),
        };
        let Some(d) = descriptor_from_pod(&pod) else { return Ok(HealthStatus::Gone) };
        Ok(match d.status {
            ContainerStatus::Running => HealthStatus::Running,
            _ => HealthStatus::Unhealthy,
        })
    }

    async fn exec(
        &self,
        id: &ContainerId,
        command: &[String],
        timeout: Duration,
    ) -> Result<String, EngineError> {
        use futures_util::{AsyncReadExt, TryStreamExt};
        let mut attached = self
            .pods()
            .exec(id.as_str(), command, &AttachParams::default().stdout(true).stderr(true))
            .await
            .map_err(|e| EngineError::Unavailable(format!("exec failed: {e}")))?;
        let mut stdout = attached.stdout().ok_or_else(|| EngineError::Unavailable("no stdout stream".into()))?;
        let mut out = String::new();
        tokio::time::timeout(timeout, stdout.read_to_string(&mut out))
            .await
            .map_err(|_| EngineError::Unavailable("exec timed out".into()))?
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        let _ = attached.take_status().map(|s| async move { s.await });
        Ok(out)
    }

    async fn commit_image(&self, _id: &ContainerId) -> Result<String, EngineError> {
        Err(EngineError::Unsupported("kubernetes has no container-commit equivalent"))
    }

    async fn recreate_with_env(
        &self,
        _id: &ContainerId,
        _image: &str,
        _env: &[(String, String)],
    ) -> Result<ContainerId, EngineError> {
        Err(EngineError::Unsupported(
            "kubernetes recreate requires a controller (Deployment/StatefulSet) rewrite, out of scope",
        ))
    }

    async fn restart(&self, id: &ContainerId) -> Result<(), EngineError> {
        let dp = kube::api::DeleteParams::default();
        self.pods()
            .delete(id.as_str(), &dp)
            .await
            .map(|_| ())
            .map_err(|e| EngineError::Unavailable(format!("pod delete failed: {e}")))
    }
}

fn chrono_now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
#[path = "kubernetes_tests.rs"]
mod tests;
