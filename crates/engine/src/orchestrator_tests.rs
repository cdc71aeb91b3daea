// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::CollectingPublisher;
use sentinel_adapters::engine::fake::FakeEngine;
use sentinel_adapters::engine::HealthStatus;
use sentinel_core::test_support::anomaly_verdict;
use sentinel_core::{BusEvent, FakeClock};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve `responses.len()` requests in order over one ephemeral listener,
/// then drop it; any connection after the last response is refused.
async fn serve_sequence(responses: Vec<(u16, &'static str, &'static str)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        for (status, headers, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = stream.read(&mut buf).await.unwrap();
            let reason = if status < 400 { "OK" } else { "Unauthorized" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\n{headers}Content-Length: {}\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
        }
    });
    format!("http://{addr}")
}

fn test_orchestrator(
    engine: Arc<FakeEngine>,
    analyzer_url: String,
    gateway_url: String,
    bus: Arc<CollectingPublisher>,
    config: OrchestratorConfig,
) -> Arc<Orchestrator<FakeClock>> {
    Arc::new(Orchestrator::new(
        engine,
        Arc::new(sentinel_adapters::classifier::FastClassifierClient::new("http://127.0.0.1:1", "k", "m")),
        Arc::new(DeepAnalyzerClient::new(analyzer_url, "k", "m")),
        Arc::new(GatewaySession::new(gateway_url)),
        Arc::new(ContainerRegistry::new()),
        Arc::new(RecentLogs::new()),
        Arc::new(IncidentStore::new()),
        bus,
        FakeClock::new(),
        config,
    ))
}

#[tokio::test(start_paused = true)]
async fn drive_incident_resolves_through_full_pipeline() {
    let analyzer_url = serve_sequence(vec![(
        200,
        "",
        r#"{"content":"{\"root_cause\":\"db down\",\"explanation\":\"conn refused\",\"affected_components\":[\"demo-postgres\"],\"recommended_actions\":[{\"tool\":\"restart_container\",\"container_id\":\"demo-postgres\",\"params\":{},\"priority\":3,\"rationale\":\"restart\"}]}"}"#,
    )])
    .await;
    let gateway_url = serve_sequence(vec![
        (200, "X-Session-Token: tok-1\r\n", ""),
        (200, "", r#"{"tools":[{"name":"restart_container","description":"","parameters":{}}]}"#),
        (200, "", r#"{"content":[{"text":"{\"success\":true}"}],"is_error":false}"#),
    ])
    .await;

    let engine = Arc::new(FakeEngine::default());
    let container_id = ContainerId::new("demo-postgres");
    engine.health.lock().insert(container_id.as_str().to_string(), HealthStatus::Running);

    let bus = Arc::new(CollectingPublisher::default());
    let orchestrator =
        test_orchestrator(engine, analyzer_url, gateway_url, bus.clone(), OrchestratorConfig::default());

    let verdict = anomaly_verdict("demo-postgres", 0.9);
    let id = orchestrator.incidents.accept(verdict, "demo-api", 0, bus.as_ref()).expect("no debounce collision").id;

    orchestrator.clone().drive_incident(id, container_id, vec!["connection refused".to_string()]).await;

    let stored = orchestrator.incidents.get(id).expect("incident exists");
    assert_eq!(stored.state, IncidentState::Resolved);
    assert_eq!(stored.outcomes.len(), 1);
    assert!(stored.outcomes[0].success);
    assert!(bus.events().iter().any(|e| matches!(e, BusEvent::IncidentUpdate(i) if i.state == IncidentState::Resolved)));
}

#[tokio::test(start_paused = true)]
async fn drive_incident_goes_unresolved_when_analyzer_fails() {
    // Nothing is listening at this address, so every analyzer call fails transport-level.
    let analyzer_url = "http://127.0.0.1:1".to_string();
    let gateway_url = serve_sequence(vec![]).await;

    let engine = Arc::new(FakeEngine::default());
    let container_id = ContainerId::new("demo-postgres");

    let bus = Arc::new(CollectingPublisher::default());
    let orchestrator =
        test_orchestrator(engine, analyzer_url, gateway_url, bus.clone(), OrchestratorConfig::default());

    let verdict = anomaly_verdict("demo-postgres", 0.9);
    let id = orchestrator.incidents.accept(verdict, "demo-api", 0, bus.as_ref()).expect("no debounce collision").id;

    orchestrator.clone().drive_incident(id, container_id, vec![]).await;

    let stored = orchestrator.incidents.get(id).expect("incident exists");
    assert_eq!(stored.state, IncidentState::Unresolved);
    assert!(matches!(stored.last_error, Some(ErrorKind::AnalyzerError { .. })));
}

#[tokio::test(start_paused = true)]
async fn drive_incident_goes_unresolved_when_plan_ends_up_empty() {
    // The analyzer recommends a tool the gateway's catalog doesn't know about,
    // so root-cause analysis drops it and the resulting plan is empty.
    let analyzer_url = serve_sequence(vec![(
        200,
        "",
        r#"{"content":"{\"root_cause\":\"db down\",\"explanation\":\"conn refused\",\"affected_components\":[],\"recommended_actions\":[{\"tool\":\"nonexistent_tool\",\"container_id\":\"demo-postgres\",\"params\":{},\"priority\":1,\"rationale\":\"nope\"}]}"}"#,
    )])
    .await;
    let gateway_url = serve_sequence(vec![
        (200, "X-Session-Token: tok-1\r\n", ""),
        (200, "", r#"{"tools":[]}"#),
    ])
    .await;

    let engine = Arc::new(FakeEngine::default());
    let container_id = ContainerId::new("demo-postgres");

    let bus = Arc::new(CollectingPublisher::default());
    let orchestrator =
        test_orchestrator(engine, analyzer_url, gateway_url, bus.clone(), OrchestratorConfig::default());

    let verdict = anomaly_verdict("demo-postgres", 0.9);
    let id = orchestrator.incidents.accept(verdict, "demo-api", 0, bus.as_ref()).expect("no debounce collision").id;

    orchestrator.clone().drive_incident(id, container_id, vec![]).await;

    let stored = orchestrator.incidents.get(id).expect("incident exists");
    assert_eq!(stored.state, IncidentState::Unresolved);
    assert_eq!(stored.root_cause.as_ref().unwrap().dropped_actions, vec!["nonexistent_tool".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn drive_incident_stays_unresolved_when_auto_heal_disabled() {
    let analyzer_url = serve_sequence(vec![(
        200,
        "",
        r#"{"content":"{\"root_cause\":\"db down\",\"explanation\":\"conn refused\",\"affected_components\":[],\"recommended_actions\":[{\"tool\":\"restart_container\",\"container_id\":\"demo-postgres\",\"params\":{},\"priority\":3,\"rationale\":\"restart\"}]}"}"#,
    )])
    .await;
    let gateway_url = serve_sequence(vec![
        (200, "X-Session-Token: tok-1\r\n", ""),
        (200, "", r#"{"tools":[{"name":"restart_container","description":"","parameters":{}}]}"#),
    ])
    .await;

    let engine = Arc::new(FakeEngine::default());
    let container_id = ContainerId::new("demo-postgres");

    let bus = Arc::new(CollectingPublisher::default());
    let config = OrchestratorConfig { auto_heal_enabled: false, ..OrchestratorConfig::default() };
    let orchestrator = test_orchestrator(engine, analyzer_url, gateway_url, bus.clone(), config);

    let verdict = anomaly_verdict("demo-postgres", 0.9);
    let id = orchestrator.incidents.accept(verdict, "demo-api", 0, bus.as_ref()).expect("no debounce collision").id;

    orchestrator.clone().drive_incident(id, container_id, vec![]).await;

    let stored = orchestrator.incidents.get(id).expect("incident exists");
    assert_eq!(stored.state, IncidentState::Unresolved);
    // A plan was produced; it just never ran.
    assert!(stored.plan.as_ref().is_some_and(|p| !p.is_empty()));
    assert!(stored.outcomes.is_empty());
}

#[tokio::test(start_paused = true)]
async fn drive_incident_fails_when_a_low_priority_action_cannot_reach_the_gateway() {
    let analyzer_url = serve_sequence(vec![(
        200,
        "",
        r#"{"content":"{\"root_cause\":\"db down\",\"explanation\":\"conn refused\",\"affected_components\":[],\"recommended_actions\":[{\"tool\":\"restart_container\",\"container_id\":\"demo-postgres\",\"params\":{},\"priority\":1,\"rationale\":\"restart\"}]}"}"#,
    )])
    .await;
    // Handshake and catalog discovery succeed, but nothing answers the
    // subsequent tools/call request: every retry hits connection refused.
    let gateway_url = serve_sequence(vec![
        (200, "X-Session-Token: tok-1\r\n", ""),
        (200, "", r#"{"tools":[{"name":"restart_container","description":"","parameters":{}}]}"#),
    ])
    .await;

    let engine = Arc::new(FakeEngine::default());
    let container_id = ContainerId::new("demo-postgres");

    let bus = Arc::new(CollectingPublisher::default());
    let orchestrator =
        test_orchestrator(engine, analyzer_url, gateway_url, bus.clone(), OrchestratorConfig::default());

    let verdict = anomaly_verdict("demo-postgres", 0.9);
    let id = orchestrator.incidents.accept(verdict, "demo-api", 0, bus.as_ref()).expect("no debounce collision").id;

    orchestrator.clone().drive_incident(id, container_id, vec![]).await;

    let stored = orchestrator.incidents.get(id).expect("incident exists");
    assert_eq!(stored.state, IncidentState::Failed);
    assert!(stored.outcomes.iter().any(|o| matches!(o.error, Some(ErrorKind::GatewayUnavailable { .. }))));
}

#[tokio::test]
async fn reconcile_container_tasks_spawns_and_cancels_per_container_tasks() {
    let engine = Arc::new(FakeEngine::default());
    let bus = Arc::new(CollectingPublisher::default());
    let orchestrator =
        test_orchestrator(engine, "http://127.0.0.1:1".to_string(), "http://127.0.0.1:1".to_string(), bus, OrchestratorConfig::default());

    let (window_tx, _window_rx) = tokio::sync::mpsc::channel(8);
    let id = ContainerId::new("demo-postgres");
    orchestrator.reconcile_container_tasks(
        DiscoveryOutcome { newly_observed: vec![id.clone()], removed: vec![] },
        window_tx.clone(),
    );
    assert_eq!(orchestrator.tasks.lock().len(), 1);

    orchestrator.recent_logs.push(&id, "seed".to_string());
    orchestrator.reconcile_container_tasks(
        DiscoveryOutcome { newly_observed: vec![], removed: vec![id.clone()] },
        window_tx,
    );
    assert!(orchestrator.tasks.lock().is_empty());
    assert!(orchestrator.recent_logs.last(&id).is_empty());
}

#[test]
fn default_config_matches_documented_defaults() {
    let config = OrchestratorConfig::default();
    assert_eq!(config.window_size, sentinel_core::DEFAULT_WINDOW_SIZE);
    assert_eq!(config.sample_interval, std::time::Duration::from_secs(5));
    assert!(config.auto_heal_enabled);
}

#[test]
fn registry_context_falls_back_to_defaults_for_unknown_container() {
    let registry = Arc::new(ContainerRegistry::new());
    let ctx_source = RegistryContext { registry: registry.clone() };
    let ctx = ctx_source.context_for(&ContainerId::new("missing"));
    assert_eq!(ctx.service, "");
    assert_eq!(ctx.restart_count, 0);
    assert_eq!(ctx.cpu_percent, None);
    assert_eq!(ctx.memory_percent, None);
}
