// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::SentinelClient;
use serial_test::serial;
use std::io::{Read, Write};
use std::net::TcpListener;

/// Binds an ephemeral port and replies to exactly one request with `body`,
/// on a background thread, returning the port so tests can point a client
/// at it without a real daemon running.
fn serve_once(status_line: &'static str, body: &'static str) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    std::thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let response = format!("{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}", body.len());
            let _ = stream.write_all(response.as_bytes());
        }
    });
    port
}

#[tokio::test]
async fn is_healthy_true_when_daemon_responds_ok() {
    let port = serve_once("HTTP/1.1 200 OK", "{\"status\":\"ok\"}");
    let client = SentinelClient::new(format!("http://127.0.0.1:{port}"));
    assert!(client.is_healthy().await);
}

#[tokio::test]
async fn is_healthy_false_when_unreachable() {
    // Port 0 is never a valid destination for an outbound connection.
    let client = SentinelClient::new("http://127.0.0.1:0");
    assert!(!client.is_healthy().await);
}

#[tokio::test]
async fn containers_parses_descriptor_list() {
    let port = serve_once(
        "HTTP/1.1 200 OK",
        r#"[{"id":"c1","name":"web-1","service":"web","status":"running","restart_count":0,"created_at_ms":1000,"missed_passes":0}]"#,
    );
    let client = SentinelClient::new(format!("http://127.0.0.1:{port}"));
    let containers = client.containers().await.unwrap();
    assert_eq!(containers.len(), 1);
    assert_eq!(containers[0].service, "web");
}

#[tokio::test]
async fn incident_returns_none_on_404() {
    let port = serve_once("HTTP/1.1 404 Not Found", "");
    let client = SentinelClient::new(format!("http://127.0.0.1:{port}"));
    assert_eq!(client.incident(999).await.unwrap(), None);
}

#[test]
#[serial]
fn from_env_defaults_to_port_8000() {
    std::env::remove_var("SENTINEL_API_URL");
    std::env::remove_var("API_PORT");
    let client = SentinelClient::from_env();
    assert_eq!(client.base_url(), "http://127.0.0.1:8000");
}

#[test]
#[serial]
fn from_env_honors_api_port() {
    std::env::remove_var("SENTINEL_API_URL");
    std::env::set_var("API_PORT", "9100");
    let client = SentinelClient::from_env();
    assert_eq!(client.base_url(), "http://127.0.0.1:9100");
    std::env::remove_var("API_PORT");
}

#[test]
#[serial]
fn from_env_honors_explicit_url_override() {
    std::env::set_var("SENTINEL_API_URL", "http://example.invalid:9999");
    let client = SentinelClient::from_env();
    assert_eq!(client.base_url(), "http://example.invalid:9999");
    std::env::remove_var("SENTINEL_API_URL");
}
