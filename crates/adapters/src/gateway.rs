// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The remediation tool gateway client.
//!
//! The session token and tool catalog are
//! owned exclusively here, not by the executor: every action execution is
//! a `call()` submitted to this component, which serializes concurrent
//! calls through an async mutex (the gateway's own session model is not
//! documented as concurrency-safe) and re-handshakes exactly once on
//! session expiry before surfacing an error to the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request timed out")]
    Timeout,
    #[error("gateway transport error: {0}")]
    Transport(String),
    #[error("gateway session expired")]
    SessionExpired,
    #[error("gateway returned malformed response: {0}")]
    Malformed(String),
}

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
/// Actions that recreate containers need the full `update_env_vars`
/// recreate path (commit + destroy + create + start) to complete.
pub const RECREATE_CALL_TIMEOUT: Duration = Duration::from_secs(120);

const PROTOCOL_VERSION: &str = "2026-06-01";
const CLIENT_ID: &str = "sre-sentinel";
const SESSION_HEADER: &str = "X-Session-Token";

#[derive(Debug, Clone, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub success: bool,
    pub payload: Value,
    pub is_error: bool,
}

#[derive(Serialize)]
struct InitializeRequest<'a> {
    protocol_version: &'a str,
    client_id: &'a str,
}

#[derive(Deserialize)]
struct ToolsListResponse {
    tools: Vec<ToolSchema>,
}

#[derive(Serialize)]
struct ToolsCallRequest<'a> {
    name: &'a str,
    arguments: Value,
}

#[derive(Deserialize)]
struct ToolsCallResponse {
    content: Vec<ContentEntry>,
    #[serde(default)]
    is_error: bool,
}

#[derive(Deserialize)]
struct ContentEntry {
    #[serde(default)]
    text: Option<String>,
}

struct SessionState {
    token: Option<String>,
    tools: Vec<ToolSchema>,
}

pub struct GatewaySession {
    http: reqwest::Client,
    base_url: String,
    state: Mutex<SessionState>,
}

impl GatewaySession {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            state: Mutex::new(SessionState { token: None, tools: Vec::new() }),
        }
    }

    /// Return the cached tool catalog, discovering it (and handshaking
    /// first, if needed) on first use.
    #[allow(clippy::expect_used)]
    pub async fn tools(&self) -> Result<Vec<ToolSchema>, GatewayError> {
        let mut state = self.state.lock().await;
        if state.token.is_none() {
            state.token = Some(self.handshake().await?);
        }
        if state.tools.is_empty() {
            state.tools = self.list_tools(state.token.as_deref().expect("handshake set token")).await?;
        }
        Ok(state.tools.clone())
    }

    /// Invoke `name` with `arguments`. Re-handshakes exactly once on
    /// session expiry and retries the call a single time: exactly one
    /// re-handshake attempt before the next action proceeds.
    #[allow(clippy::expect_used)]
    pub async fn call(
        &self,
        name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<ToolCallResult, GatewayError> {
        let mut state = self.state.lock().await;
        if state.token.is_none() {
            state.token = Some(self.handshake().await?);
            state.tools = self.list_tools(state.token.as_deref().expect("handshake set token")).await?;
        }
        let token = state.token.clone().expect("token set above");

        match self.call_once(&token, name, arguments.clone(), timeout).await {
            Err(GatewayError::SessionExpired) => {
                let new_token = self.handshake().await?;
                state.tools = self.list_tools(&new_token).await?;
                state.token = Some(new_token.clone());
                self.call_once(&new_token, name, arguments, timeout).await
            }
            other => other,
        }
    }

    async fn handshake(&self) -> Result<String, GatewayError> {
        let body = InitializeRequest { protocol_version: PROTOCOL_VERSION, client_id: CLIENT_ID };
        let response = self
            .http
            .post(format!("{}/initialize", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!("HTTP {}", response.status())));
        }
        response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| GatewayError::Malformed("initialize response carried no session token".into()))
    }

    async fn list_tools(&self, token: &str) -> Result<Vec<ToolSchema>, GatewayError> {
        let response = self
            .http
            .post(format!("{}/tools/list", self.base_url))
            .header(SESSION_HEADER, token)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::SessionExpired);
        }
        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!("HTTP {}", response.status())));
        }
        let parsed: ToolsListResponse =
            response.json().await.map_err(|e| GatewayError::Malformed(e.to_string()))?;
        Ok(parsed.tools)
    }

    async fn call_once(
        &self,
        token: &str,
        name: &str,
        arguments: Value,
        timeout: Duration,
    ) -> Result<ToolCallResult, GatewayError> {
        let body = ToolsCallRequest { name, arguments };
        let send = self
            .http
            .post(format!("{}/tools/call", self.base_url))
            .header(SESSION_HEADER, token)
            .json(&body)
            .send();

        let response = tokio::time::timeout(timeout, send)
            .await
            .map_err(|_| GatewayError::Timeout)?
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Err(GatewayError::SessionExpired);
        }
        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!("HTTP {}", response.status())));
        }

        let parsed: ToolsCallResponse = tokio::time::timeout(timeout, response.json())
            .await
            .map_err(|_| GatewayError::Timeout)?
            .map_err(|e| GatewayError::Malformed(e.to_string()))?;

        let payload = parsed
            .content
            .first()
            .and_then(|c| c.text.as_deref())
            .map(|text| serde_json::from_str::<Value>(text).unwrap_or(Value::String(text.to_string())))
            .unwrap_or(Value::Null);

        let success = !parsed.is_error
            && payload.get("success").and_then(Value::as_bool).unwrap_or(!payload.is_null());

        Ok(ToolCallResult { success, payload, is_error: parsed.is_error })
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod tests;
