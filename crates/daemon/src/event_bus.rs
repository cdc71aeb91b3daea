// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event bus: typed pub/sub with per-subscriber bounded queues and
//! optional durable fan-out, generalizing the teacher's WAL-backed
//! `EventBus` to the topic set this daemon publishes (spec §4.1).
//!
//! `publish` is synchronous and never blocks the producer: it locks the
//! subscriber table just long enough to push onto each interested
//! subscriber's `VecDeque`, popping the oldest entry on overflow rather
//! than blocking or erroring. `subscribe` hands back an [`EventStream`]
//! whose `Drop` impl deregisters it, so a disconnected dashboard client
//! is cleaned up the moment its stream is dropped.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use sentinel_core::{BusEvent, DeliveredEvent, EventPublisher, Topic};
use sentinel_wal::{Entry, Wal, WalError};
use tokio::sync::Notify;
use tracing::warn;

struct SubscriberState {
    topics: Vec<Topic>,
    queue: Mutex<VecDeque<DeliveredEvent>>,
    seqs: Mutex<HashMap<Topic, u64>>,
    capacity: usize,
    dropped: AtomicU64,
    notify: Notify,
}

struct Inner {
    subscribers: Mutex<HashMap<u64, Arc<SubscriberState>>>,
    next_subscriber_id: AtomicU64,
    /// Present when `EVENT_BUS_WAL_PATH` is configured: every publish is
    /// appended here before fan-out, so a reconnecting durable subscriber
    /// can replay backlog since a sequence number (spec §3 invariant: "the
    /// event bus never drops published events for durable subscribers").
    wal: Option<Mutex<Wal>>,
}

/// The pub/sub fabric carrying every observability topic. Cheap to clone:
/// an `Arc` handle shared by every publisher (discovery, ingesters,
/// samplers, the gate, incident store, executor, verifier) and the
/// external interface's WS handler.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { inner: Arc::new(Inner { subscribers: Mutex::new(HashMap::new()), next_subscriber_id: AtomicU64::new(1), wal: None }) }
    }

    /// Open (or create) a durable WAL at `path` backing this bus's fan-out.
    pub fn with_wal(path: impl AsRef<std::path::Path>) -> Result<Self, WalError> {
        let wal = Wal::open(path, 0)?;
        Ok(Self {
            inner: Arc::new(Inner {
                subscribers: Mutex::new(HashMap::new()),
                next_subscriber_id: AtomicU64::new(1),
                wal: Some(Mutex::new(wal)),
            }),
        })
    }

    pub fn is_durable(&self) -> bool {
        self.inner.wal.is_some()
    }

    /// Every WAL entry with `seq > since`, oldest first. Used to serve a
    /// reconnecting dashboard's backlog request; empty when the bus carries
    /// no durable fan-out.
    pub fn backlog_since(&self, since: u64) -> Result<Vec<Entry>, WalError> {
        match &self.inner.wal {
            Some(wal) => wal.lock().entries_after(since),
            None => Ok(Vec::new()),
        }
    }

    pub fn current_wal_seq(&self) -> u64 {
        self.inner.wal.as_ref().map(|wal| wal.lock().write_seq()).unwrap_or(0)
    }

    /// Register a new subscriber interested in `topics`, with a queue
    /// bounded to `capacity`. Dropping the returned stream deregisters it.
    pub fn subscribe(&self, topics: &[Topic], capacity: usize) -> EventStream {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(SubscriberState {
            topics: topics.to_vec(),
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(64))),
            seqs: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            dropped: AtomicU64::new(0),
            notify: Notify::new(),
        });
        self.inner.subscribers.lock().insert(id, state.clone());
        EventStream { id, state, bus: self.inner.clone() }
    }

    fn deregister(&self, id: u64) {
        self.inner.subscribers.lock().remove(&id);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: BusEvent) {
        if let Some(wal) = &self.inner.wal {
            let mut wal = wal.lock();
            if let Err(e) = wal.append(&event).and_then(|_| wal.flush()) {
                warn!(error = %e, "failed to append event to durable WAL");
            }
        }

        let topic = event.topic();
        let subscribers = self.inner.subscribers.lock();
        for state in subscribers.values() {
            if !state.topics.contains(&topic) {
                continue;
            }
            let sequence = {
                let mut seqs = state.seqs.lock();
                let seq = seqs.entry(topic).or_insert(0);
                *seq += 1;
                *seq
            };
            let delivered = DeliveredEvent { sequence, event: event.clone() };
            {
                let mut queue = state.queue.lock();
                if queue.len() >= state.capacity {
                    queue.pop_front();
                    let dropped = state.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                    warn!(topic = %topic, dropped_total = dropped, "subscriber queue full, dropped oldest event");
                }
                queue.push_back(delivered);
            }
            state.notify.notify_one();
        }
    }
}

/// A live subscription to a set of topics. `recv` suspends until the next
/// event arrives; there is no end-of-stream signal short of dropping the
/// stream yourself, matching a dashboard connection that stays open for as
/// long as the client is connected.
pub struct EventStream {
    id: u64,
    state: Arc<SubscriberState>,
    bus: Arc<Inner>,
}

impl EventStream {
    pub async fn recv(&mut self) -> DeliveredEvent {
        loop {
            if let Some(event) = self.state.queue.lock().pop_front() {
                return event;
            }
            self.state.notify.notified().await;
        }
    }

    /// Total events dropped from this subscriber's queue due to overflow.
    pub fn dropped(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.bus.subscribers.lock().remove(&self.id);
    }
}

#[cfg(test)]
#[path = "event_bus_tests.rs"]
mod tests;
