// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal HTTP/1.1 client over a Unix domain socket, for talking to the
//! Docker Engine API at `/var/run/docker.sock`.
//!
//! Sends requests by hand and reads responses using Content-Length framing
//! (does not depend on connection close for EOF). Chunked/streamed endpoints
//! (`logs?follow=true`, `stats?stream=true`) are deliberately not supported
//! here: the ingester and sampler poll point-in-time snapshots instead of
//! holding a long-lived streaming connection, so every response this client
//! reads has a known length up front.

use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Io(String),
    #[error("request timed out")]
    Timeout,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// An HTTP response with its status code intact (unlike [`get`]/[`post`],
/// callers that need to distinguish 404 from other failures use this).
pub struct Response {
    pub status: u16,
    pub body: String,
}

pub async fn get(socket_path: &Path, path: &str) -> Result<String, HttpError> {
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    Ok(timed_request(socket_path, &request).await?.body)
}

pub async fn get_raw(socket_path: &Path, path: &str) -> Result<Response, HttpError> {
    timed_request(socket_path, &format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n")).await
}

pub async fn post(socket_path: &Path, path: &str, body: &str) -> Result<String, HttpError> {
    let request = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    Ok(timed_request(socket_path, &request).await?.body)
}

pub async fn delete(socket_path: &Path, path: &str) -> Result<String, HttpError> {
    let request = format!("DELETE {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    Ok(timed_request(socket_path, &request).await?.body)
}

/// Connect, send, and read with a timeout covering the whole operation.
/// `timeout` defaults to 5s via [`timed_request`]; callers needing a longer
/// budget (container recreation) use [`timed_request_with_timeout`].
async fn timed_request(socket_path: &Path, request: &str) -> Result<Response, HttpError> {
    timed_request_with_timeout(socket_path, request, Duration::from_secs(5)).await
}

pub async fn timed_request_with_timeout(
    socket_path: &Path,
    request: &str,
    timeout: Duration,
) -> Result<Response, HttpError> {
    tokio::time::timeout(timeout, send_request(socket_path, request))
        .await
        .map_err(|_| HttpError::Timeout)?
}

async fn send_request(socket_path: &Path, request: &str) -> Result<Response, HttpError> {
    let mut stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| HttpError::Connect(e.to_string()))?;
    stream.write_all(request.as_bytes()).await.map_err(|e| HttpError::Io(e.to_string()))?;

    let mut reader = BufReader::new(&mut stream);
    read_http_response(&mut reader).await
}

/// Read and parse an HTTP/1.1 response from a buffered stream.
async fn read_http_response<R: tokio::io::AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> Result<Response, HttpError> {
    let mut status_line = String::new();
    reader.read_line(&mut status_line).await.map_err(|e| HttpError::Io(e.to_string()))?;
    let status = status_line.split_whitespace().nth(1).and_then(|s| s.parse::<u16>().ok()).unwrap_or(0);

    let mut content_length: usize = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.map_err(|e| HttpError::Io(e.to_string()))?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
        let lower = line.to_ascii_lowercase();
        if let Some(val) = lower.strip_prefix("content-length:") {
            content_length = val.trim().parse().unwrap_or(0);
        }
    }

    let body = if content_length > 0 {
        let mut buf = vec![0u8; content_length];
        reader.read_exact(&mut buf).await.map_err(|e| HttpError::Io(e.to_string()))?;
        String::from_utf8_lossy(&buf).into_owned()
    } else {
        String::new()
    };

    if status >= 400 {
        return Err(HttpError::Status { status, body });
    }
    Ok(Response { status, body })
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
