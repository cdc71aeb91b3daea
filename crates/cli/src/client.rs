// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for talking to a running `sentineld` instance.

use sentinel_core::{ContainerDescriptor, Incident};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach sentineld at {url}: {source}")]
    Unreachable { url: String, source: reqwest::Error },
    #[error("sentineld returned an unexpected response: {0}")]
    Malformed(#[from] reqwest::Error),
}

pub struct SentinelClient {
    base_url: String,
    http: reqwest::Client,
}

impl SentinelClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http: reqwest::Client::new() }
    }

    /// Resolve the base URL the CLI talks to: `SENTINEL_API_URL` if set,
    /// otherwise `http://127.0.0.1:<API_PORT, default 8000>`.
    pub fn from_env() -> Self {
        if let Ok(url) = std::env::var("SENTINEL_API_URL") {
            return Self::new(url);
        }
        let port: u16 = std::env::var("API_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8000);
        Self::new(format!("http://127.0.0.1:{port}"))
    }

    #[cfg(test)]
    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn is_healthy(&self) -> bool {
        self.http.get(format!("{}/health", self.base_url)).send().await.is_ok_and(|r| r.status().is_success())
    }

    pub async fn containers(&self) -> Result<Vec<ContainerDescriptor>, ClientError> {
        let url = format!("{}/containers", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Unreachable { url: url.clone(), source })?
            .json()
            .await
            .map_err(ClientError::from)
    }

    pub async fn incidents(&self) -> Result<Vec<Incident>, ClientError> {
        let url = format!("{}/incidents", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .map_err(|source| ClientError::Unreachable { url: url.clone(), source })?
            .json()
            .await
            .map_err(ClientError::from)
    }

    pub async fn incident(&self, id: u64) -> Result<Option<Incident>, ClientError> {
        let url = format!("{}/incidents/{id}", self.base_url);
        let response =
            self.http.get(&url).send().await.map_err(|source| ClientError::Unreachable { url: url.clone(), source })?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        response.json().await.map(Some).map_err(ClientError::from)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
