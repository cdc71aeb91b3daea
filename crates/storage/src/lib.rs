// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sentinel-wal: an append-only, length-prefixed JSON log of [`BusEvent`]s
//! backing the event bus's optional durable fan-out (`EVENT_BUS_*`
//! configuration).
//!
//! Unlike a typical WAL that is the system of record recovered on every
//! restart, this one exists purely for within-process durability: a
//! dashboard `WS` client that reconnects mid-session can request backlog
//! since a sequence number instead of missing events published while it was
//! disconnected. Incidents are not persisted beyond process lifetime,
//! so nothing here is read back across a daemon restart.

mod wal;

pub use wal::{Entry, Wal, WalError};
