// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sentinel-daemon: process wiring for the SRE Sentinel monitoring daemon
//! — environment configuration, the event bus, the external HTTP/WS
//! interface, and startup/shutdown lifecycle. Exposed as a library so
//! integration tests and `sentinelctl` can exercise the HTTP surface
//! in-process.

pub mod env;
pub mod event_bus;
pub mod http;
pub mod lifecycle;

pub use event_bus::{EventBus, EventStream};
pub use http::{router, AppState};
pub use lifecycle::{run, LifecycleError};
