// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn short_truncates_to_twelve_chars() {
    let id = ContainerId::new("a1b2c3d4e5f6a7b8c9d0");
    assert_eq!(id.short(), "a1b2c3d4e5f6");
}

#[test]
fn short_leaves_shorter_ids_untouched() {
    let id = ContainerId::new("abc123");
    assert_eq!(id.short(), "abc123");
}

#[test]
fn should_remove_only_after_grace_period() {
    let mut d = ContainerDescriptor::new(ContainerId::new("c1"), "demo", "demo-api", 0);
    assert!(!d.should_remove());
    d.missed_passes = ContainerDescriptor::MAX_MISSED_PASSES;
    assert!(!d.should_remove());
    d.missed_passes = ContainerDescriptor::MAX_MISSED_PASSES + 1;
    assert!(d.should_remove());
}

#[test]
fn descriptor_roundtrips_through_json() {
    let d = ContainerDescriptor::new(ContainerId::new("c1"), "demo-api", "demo-api", 42);
    let json = serde_json::to_string(&d).expect("serialize");
    let back: ContainerDescriptor = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.id, d.id);
    assert_eq!(back.service, d.service);
}
