// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SRE Sentinel daemon (sentineld)
//!
//! Watches labeled containers, classifies anomalies, drives root-cause
//! analysis and remediation through the tool gateway, and serves the
//! result over HTTP/WS for the dashboard and `sentinelctl`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[allow(clippy::expect_used)]
fn main() {
    let log_dir = sentinel_daemon::env::log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "sentineld.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let runtime = tokio::runtime::Runtime::new().expect("failed to start tokio runtime");
    let result = runtime.block_on(sentinel_daemon::run());

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!(error = %e, "daemon exited with error");
            std::process::exit(e.exit_code());
        }
    }
}
