// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container registry — tracks discovered containers, their labels, and
//! their last-known state. Read-mostly: writes are serialized by the
//! discovery loop; readers see a consistent snapshot via copy-on-read.

use parking_lot::RwLock;
use sentinel_core::{ContainerDescriptor, ContainerId, ResourceSample};
use std::collections::HashMap;

/// Outcome of [`ContainerRegistry::upsert`], used by discovery to decide
/// whether a `container_update` is warranted (spec §4.2: "Publish
/// `container_update` on every state or metric change", not on every pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    New,
    Changed,
    Unchanged,
}

impl UpsertOutcome {
    pub fn is_new(self) -> bool {
        matches!(self, UpsertOutcome::New)
    }

    /// Whether this upsert warrants a `container_update` publish.
    pub fn changed(self) -> bool {
        !matches!(self, UpsertOutcome::Unchanged)
    }
}

#[derive(Default)]
pub struct ContainerRegistry {
    descriptors: RwLock<HashMap<ContainerId, ContainerDescriptor>>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a descriptor observed by this discovery pass, resetting its
    /// miss counter. Reports whether the container is newly observed,
    /// whether its state changed since the last pass, or neither.
    pub fn upsert(&self, mut descriptor: ContainerDescriptor) -> UpsertOutcome {
        let mut map = self.descriptors.write();
        descriptor.missed_passes = 0;
        let outcome = match map.get(&descriptor.id) {
            None => UpsertOutcome::New,
            Some(existing) => {
                if existing.name == descriptor.name
                    && existing.service == descriptor.service
                    && existing.status == descriptor.status
                    && existing.restart_count == descriptor.restart_count
                {
                    UpsertOutcome::Unchanged
                } else {
                    UpsertOutcome::Changed
                }
            }
        };
        map.insert(descriptor.id.clone(), descriptor);
        outcome
    }

    /// Increment the miss counter for every descriptor not present in
    /// `seen` this pass. Returns the ids that crossed the removal
    /// threshold: a descriptor is only removed after it has gone missing
    /// for 2 consecutive discovery passes.
    pub fn mark_missing_except(&self, seen: &[ContainerId]) -> Vec<ContainerId> {
        let mut map = self.descriptors.write();
        let mut removed = Vec::new();
        for (id, descriptor) in map.iter_mut() {
            if seen.contains(id) {
                continue;
            }
            descriptor.missed_passes += 1;
            if descriptor.should_remove() {
                removed.push(id.clone());
            }
        }
        for id in &removed {
            map.remove(id);
        }
        removed
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.descriptors.read().contains_key(id)
    }

    pub fn get(&self, id: &ContainerId) -> Option<ContainerDescriptor> {
        self.descriptors.read().get(id).cloned()
    }

    pub fn update_sample(&self, id: &ContainerId, sample: ResourceSample) {
        if let Some(descriptor) = self.descriptors.write().get_mut(id) {
            descriptor.last_sample = Some(sample);
        }
    }

    /// Consistent point-in-time snapshot of every tracked descriptor.
    pub fn snapshot(&self) -> Vec<ContainerDescriptor> {
        self.descriptors.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.read().is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
