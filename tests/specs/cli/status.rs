//! Specs for `sentinelctl status|containers|incidents` against a fake
//! `sentineld` HTTP surface, and for the unreachable-daemon path.

use crate::prelude::*;

const CONTAINERS_JSON: &str = r#"[{"id":"abcdef012345","name":"demo-api","service":"demo-api","status":"running","restart_count":0,"created_at_ms":1000,"missed_passes":0}]"#;

const INCIDENTS_JSON: &str = r#"[{
    "id": 1,
    "container_id": "abcdef012345",
    "service": "demo-api",
    "detected_at_ms": 1000,
    "state": "remediating",
    "verdict": {
        "container_id": "abcdef012345",
        "window_sequence": 3,
        "is_anomaly": true,
        "severity": "high",
        "confidence": 0.92,
        "pattern_label": "connection_refused",
        "detected_at_ms": 1000
    },
    "outcomes": []
}]"#;

fn daemon() -> FakeDaemon {
    FakeDaemon::start(vec![
        ("/health", "200 OK", r#"{"status":"healthy"}"#.to_string()),
        ("/containers", "200 OK", CONTAINERS_JSON.to_string()),
        ("/incidents", "200 OK", INCIDENTS_JSON.to_string()),
        ("/incidents/1", "200 OK", {
            let arr: serde_json::Value = serde_json::from_str(INCIDENTS_JSON).unwrap();
            arr[0].to_string()
        }),
    ])
}

#[test]
fn status_reports_healthy_summary() {
    let daemon = daemon();
    cli()
        .env("SENTINEL_API_URL", daemon.url())
        .args(["status"])
        .passes()
        .stdout_has("sentineld is reachable")
        .stdout_has("1 containers monitored")
        .stdout_has("open incidents");
}

#[test]
fn status_json_output_is_well_formed() {
    let daemon = daemon();
    let assert = cli().env("SENTINEL_API_URL", daemon.url()).args(["-o", "json", "status"]).passes();
    assert.stdout_has("\"healthy\": true").stdout_has("\"containers\": 1");
}

#[test]
fn containers_lists_monitored_service() {
    let daemon = daemon();
    cli().env("SENTINEL_API_URL", daemon.url()).args(["containers"]).passes().stdout_has("demo-api").stdout_has("running");
}

#[test]
fn incidents_lists_open_incident() {
    let daemon = daemon();
    cli().env("SENTINEL_API_URL", daemon.url()).args(["incidents"]).passes().stdout_has("inc-1").stdout_has("remediating");
}

#[test]
fn incidents_shows_detail_for_one_id() {
    let daemon = daemon();
    cli()
        .env("SENTINEL_API_URL", daemon.url())
        .args(["incidents", "1"])
        .passes()
        .stdout_has("inc-1")
        .stdout_has("demo-api")
        .stdout_has("0.92");
}

#[test]
fn incidents_missing_id_fails_with_message() {
    let daemon = daemon();
    cli().env("SENTINEL_API_URL", daemon.url()).args(["incidents", "999"]).fails().stderr_has("no incident with id 999");
}

#[test]
fn status_fails_when_daemon_unreachable() {
    cli().env("SENTINEL_API_URL", unreachable_url()).args(["status"]).fails().stderr_has("not reachable");
}
