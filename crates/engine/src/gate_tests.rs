// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sentinel_adapters::classifier::FastClassifierClient;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn serve_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        let _ = stream.read(&mut buf).await.unwrap();
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
    });
    format!("http://{addr}/classify")
}

struct FixedContext(GateContext);

impl ContextSource for FixedContext {
    fn context_for(&self, _container_id: &ContainerId) -> GateContext {
        GateContext {
            service: self.0.service.clone(),
            restart_count: self.0.restart_count,
            cpu_percent: self.0.cpu_percent,
            memory_percent: self.0.memory_percent,
        }
    }
}

fn window(container_id: &ContainerId, sequence: u64) -> LogWindow {
    LogWindow {
        container_id: container_id.clone(),
        sequence,
        lines: vec![sentinel_core::LogLine {
            container_id: container_id.clone(),
            stream: sentinel_core::LogStream::Stderr,
            level: sentinel_core::LogLevel::Error,
            text: "connection refused".to_string(),
            timestamp_ms: 1,
        }],
        earliest_ms: 1,
        latest_ms: 1,
    }
}

#[tokio::test]
async fn forwards_high_confidence_anomaly_verdicts() {
    let url = serve_once(
        r#"{"content":"{\"is_anomaly\":true,\"severity\":\"high\",\"confidence\":0.9,\"pattern_label\":\"db_down\"}"}"#,
    )
    .await;
    let classifier = Arc::new(FastClassifierClient::new(url, "k", "m"));
    let context = Arc::new(FixedContext(GateContext {
        service: "demo-api".to_string(),
        restart_count: 0,
        cpu_percent: Some(10.0),
        memory_percent: Some(20.0),
    }));
    let (window_tx, window_rx) = tokio::sync::mpsc::channel(8);
    let (outcome_tx, mut outcome_rx) = tokio::sync::mpsc::channel(8);

    let id = ContainerId::new("c1");
    window_tx.send(window(&id, 0)).await.unwrap();
    drop(window_tx);

    run(classifier, context, window_rx, outcome_tx, || 1000).await;

    let outcome = outcome_rx.recv().await.unwrap();
    assert!(outcome.verdict.is_anomaly);
    assert_eq!(outcome.verdict.container_id, id);
}

#[tokio::test]
async fn suppresses_low_confidence_verdicts() {
    let url = serve_once(
        r#"{"content":"{\"is_anomaly\":true,\"severity\":\"low\",\"confidence\":0.2,\"pattern_label\":\"noise\"}"}"#,
    )
    .await;
    let classifier = Arc::new(FastClassifierClient::new(url, "k", "m"));
    let context = Arc::new(FixedContext(GateContext {
        service: "demo-api".to_string(),
        restart_count: 0,
        cpu_percent: None,
        memory_percent: None,
    }));
    let (window_tx, window_rx) = tokio::sync::mpsc::channel(8);
    let (outcome_tx, mut outcome_rx) = tokio::sync::mpsc::channel(8);

    let id = ContainerId::new("c1");
    window_tx.send(window(&id, 0)).await.unwrap();
    drop(window_tx);

    run(classifier, context, window_rx, outcome_tx, || 1000).await;

    assert!(outcome_rx.recv().await.is_none());
}
