// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sentinel_core::ContainerId;

#[test]
fn retains_only_the_most_recent_lines() {
    let history = RecentLogs::new();
    let id = ContainerId::new("a");
    for i in 0..(MAX_LINES_PER_CONTAINER + 10) {
        history.push(&id, format!("line-{i}"));
    }
    let last = history.last(&id);
    assert_eq!(last.len(), MAX_LINES_PER_CONTAINER);
    assert_eq!(last.first().unwrap(), "line-10");
    assert_eq!(last.last().unwrap(), &format!("line-{}", MAX_LINES_PER_CONTAINER + 9));
}

#[test]
fn unknown_container_returns_empty() {
    let history = RecentLogs::new();
    assert!(history.last(&ContainerId::new("missing")).is_empty());
}
