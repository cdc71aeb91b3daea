// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The external HTTP/WS interface the dashboard and `sentinelctl` talk to.
//! Polling endpoints return the current registry/incident-store snapshot;
//! `/ws` streams the live event bus, optionally replaying durable backlog
//! first via `?since=`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use sentinel_core::{ContainerId, DeliveredEvent, IncidentId, Topic};
use sentinel_engine::history::RecentLogs;
use sentinel_engine::incident_store::IncidentStore;
use sentinel_engine::registry::ContainerRegistry;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::event_bus::EventBus;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ContainerRegistry>,
    pub incidents: Arc<IncidentStore>,
    pub bus: EventBus,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/containers", get(list_containers))
        .route("/containers/{id}", get(get_container))
        .route("/incidents", get(list_incidents))
        .route("/incidents/{id}", get(get_incident))
        .route("/ws", get(websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

async fn list_containers(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.snapshot())
}

async fn list_incidents(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.incidents.snapshot())
}

async fn get_incident(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    match state.incidents.get(IncidentId(id)) {
        Some(incident) => Json(incident).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct WsParams {
    since: Option<u64>,
}

async fn websocket_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.since))
}

async fn handle_socket(socket: WebSocket, state: AppState, since: Option<u64>) {
    let (mut sender, mut receiver) = socket.split();

    let bootstrap = json!({
        "type": "bootstrap",
        "containers": state.registry.snapshot(),
        "incidents": state.incidents.snapshot(),
    });
    if sender.send(Message::Text(bootstrap.to_string().into())).await.is_err() {
        return;
    }

    if let Some(since) = since {
        match state.bus.backlog_since(since) {
            Ok(backlog) => {
                for entry in backlog {
                    let envelope = envelope_json(&entry.event, entry.seq, true);
                    if sender.send(Message::Text(envelope.to_string().into())).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => warn!(error = %e, "failed to read event bus backlog"),
        }
    }

    let mut stream = state.bus.subscribe(&Topic::ALL, 256);

    let outgoing = tokio::spawn(async move {
        loop {
            let delivered: DeliveredEvent = stream.recv().await;
            let envelope = envelope_json(&delivered.event, delivered.sequence, false);
            if sender.send(Message::Text(envelope.to_string().into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "websocket receive error");
                break;
            }
        }
    }

    outgoing.abort();
}

/// Flattens a [`BusEvent`] (already tagged `{"type": <topic>, ...}` via its
/// `#[serde(tag = "type")]` derive) into the spec's `{type, ...payload}`
/// envelope, adding the per-subscriber sequence number and, for replayed
/// backlog entries, a `backlog` marker.
fn envelope_json(event: &sentinel_core::BusEvent, sequence: u64, backlog: bool) -> serde_json::Value {
    let mut value = serde_json::to_value(event).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.insert("sequence".to_string(), json!(sequence));
        if backlog {
            obj.insert("backlog".to_string(), json!(true));
        }
    }
    value
}

async fn get_container(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.registry.get(&ContainerId::from(id)) {
        Some(descriptor) => Json(descriptor).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
