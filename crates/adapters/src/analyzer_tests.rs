// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

async fn serve_once(status: u16, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 16384];
        let _ = stream.read(&mut buf).await.unwrap();
        let reason = if status < 400 { "OK" } else { "Bad Request" };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
    });
    format!("http://{addr}/analyze")
}

fn input() -> AnalyzeInput<'static> {
    AnalyzeInput {
        service: "demo-api",
        verdict_summary: "high confidence 0.92: db_unreachable".to_string(),
        window_lines: &[],
        recent_lines: &[],
        descriptors_json: serde_json::json!([]),
        redacted_env: &[],
        available_tools: &["restart_container".to_string()],
    }
}

#[tokio::test]
async fn analyze_parses_recommended_actions() {
    let url = serve_once(
        200,
        r#"{"content":"{\"root_cause\":\"db down\",\"explanation\":\"postgres unreachable\",\"affected_components\":[\"demo-postgres\"],\"recommended_actions\":[{\"tool\":\"restart_container\",\"container_id\":\"demo-postgres\",\"params\":{\"reason\":\"DB unreachable\"},\"priority\":1,\"rationale\":\"restart fixes transient db outage\"}]}"}"#,
    )
    .await;
    let client = DeepAnalyzerClient::new(url, "key", "deep-1");
    let analysis = client.analyze(input()).await.unwrap();

    assert_eq!(analysis.root_cause, "db down");
    assert_eq!(analysis.recommended_actions.len(), 1);
    assert_eq!(analysis.recommended_actions[0].tool, "restart_container");
    assert_eq!(analysis.recommended_actions[0].priority, 1);
}

#[tokio::test]
async fn analyze_rejects_malformed_content() {
    let url = serve_once(200, r#"{"content":"not json"}"#).await;
    let client = DeepAnalyzerClient::new(url, "key", "deep-1");
    let err = client.analyze(input()).await.unwrap_err();
    assert!(matches!(err, AnalyzerError::Malformed(_)));
}

#[tokio::test]
async fn analyze_maps_transport_failure() {
    let url = serve_once(503, "unavailable").await;
    let client = DeepAnalyzerClient::new(url, "key", "deep-1");
    let err = client.analyze(input()).await.unwrap_err();
    assert!(matches!(err, AnalyzerError::Transport(_)));
}
