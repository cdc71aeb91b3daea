// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup, run loop, and shutdown.

use std::sync::Arc;

use sentinel_adapters::analyzer::DeepAnalyzerClient;
use sentinel_adapters::classifier::FastClassifierClient;
use sentinel_adapters::engine::docker::DockerEngine;
use sentinel_adapters::engine::kubernetes::KubernetesEngine;
use sentinel_adapters::engine::ContainerEngine;
use sentinel_adapters::gateway::GatewaySession;
use sentinel_core::SystemClock;
use sentinel_engine::history::RecentLogs;
use sentinel_engine::incident_store::IncidentStore;
use sentinel_engine::orchestrator::{Orchestrator, OrchestratorConfig};
use sentinel_engine::registry::ContainerRegistry;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::event_bus::EventBus;
use crate::{env, http};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("configuration error: {0}")]
    Config(#[from] env::ConfigError),
    #[error("durable event bus WAL could not be opened: {0}")]
    Wal(#[from] sentinel_wal::WalError),
    #[error("container engine unreachable at startup: {0}")]
    EngineUnreachable(String),
    #[error("failed to bind HTTP listener on port {port}: {source}")]
    Bind { port: u16, source: std::io::Error },
    #[error("HTTP server error: {0}")]
    Server(std::io::Error),
}

impl LifecycleError {
    /// Process exit code per the configuration table: 1 for a config
    /// problem the operator must fix, 2 for an engine that was never
    /// reachable at startup, 1 for anything else (bind/server failures are
    /// themselves configuration problems — a port already in use, etc.).
    pub fn exit_code(&self) -> i32 {
        match self {
            LifecycleError::EngineUnreachable(_) => 2,
            _ => 1,
        }
    }
}

/// Constructs every collaborator and runs until `cancel` fires or a signal
/// is received. Returns once the HTTP server and orchestrator have both
/// shut down.
pub async fn run() -> Result<(), LifecycleError> {
    let engine: Arc<dyn ContainerEngine> = match env::engine_kind() {
        env::EngineKind::Docker => Arc::new(DockerEngine::new()),
        env::EngineKind::Kubernetes => {
            Arc::new(KubernetesEngine::new().await.map_err(|e| LifecycleError::EngineUnreachable(e.to_string()))?)
        }
    };

    // One upfront connectivity check: a container engine that cannot be
    // listed at all is treated as unrecoverable (exit code 2), distinct
    // from a transient disconnect the discovery loop already retries.
    engine.list_containers().await.map_err(|e| LifecycleError::EngineUnreachable(e.to_string()))?;

    let classifier_cfg = env::fast_classifier_config()?;
    let classifier = Arc::new(FastClassifierClient::new(classifier_cfg.url, classifier_cfg.key, classifier_cfg.model));

    let analyzer_cfg = env::deep_analyzer_config()?;
    let analyzer = Arc::new(DeepAnalyzerClient::new(analyzer_cfg.url, analyzer_cfg.key, analyzer_cfg.model));

    let gateway_url = env::tool_gateway_url()?;
    let gateway = Arc::new(GatewaySession::new(gateway_url));

    let registry = Arc::new(ContainerRegistry::new());
    let recent_logs = Arc::new(RecentLogs::new());
    let incidents = Arc::new(IncidentStore::new());

    let bus = match env::event_bus_wal_path() {
        Some(path) => {
            info!(path = %path.display(), "durable event bus enabled");
            EventBus::with_wal(&path)?
        }
        None => EventBus::new(),
    };

    let config = OrchestratorConfig {
        window_size: env::log_lines_per_check(),
        sample_interval: env::log_check_interval(),
        auto_heal_enabled: env::auto_heal_enabled(),
    };
    info!(auto_heal_enabled = config.auto_heal_enabled, window_size = config.window_size, "starting orchestrator");

    let orchestrator = Arc::new(Orchestrator::new(
        engine,
        classifier,
        analyzer,
        gateway,
        registry.clone(),
        recent_logs,
        incidents.clone(),
        Arc::new(bus.clone()),
        SystemClock,
        config,
    ));

    let cancel = CancellationToken::new();

    let orchestrator_task = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run(cancel).await })
    };

    let app_state = http::AppState { registry, incidents, bus: bus.clone() };
    let app = http::router(app_state);

    let port = env::api_port();
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|source| LifecycleError::Bind { port, source })?;
    info!(port, "listening");

    let server_cancel = cancel.clone();
    let server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    wait_for_shutdown_signal().await;
    info!("shutdown requested");
    cancel.cancel();

    if let Err(e) = orchestrator_task.await {
        warn!(error = %e, "orchestrator task panicked during shutdown");
    }
    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "HTTP server exited with error"),
        Err(e) => warn!(error = %e, "HTTP server task panicked during shutdown"),
    }

    info!("daemon stopped");
    Ok(())
}

#[cfg(unix)]
#[allow(clippy::expect_used)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
