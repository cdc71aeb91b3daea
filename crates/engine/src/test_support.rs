// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test-only helpers shared across this crate's `#[cfg(test)]` modules.

use parking_lot::Mutex;
use sentinel_core::{BusEvent, EventPublisher};

/// Captures every published event in order, for assertions.
#[derive(Default)]
pub struct CollectingPublisher {
    events: Mutex<Vec<BusEvent>>,
}

impl CollectingPublisher {
    pub fn events(&self) -> Vec<BusEvent> {
        self.events.lock().clone()
    }
}

impl EventPublisher for CollectingPublisher {
    fn publish(&self, event: BusEvent) {
        self.events.lock().push(event);
    }
}
