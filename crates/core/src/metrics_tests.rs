// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn first_sample_suppresses_rate_fields() {
    let stats = CumulativeStats {
        timestamp_ms: 1000,
        memory_used_bytes: 50,
        memory_limit_bytes: 100,
        ..Default::default()
    };
    let sample = stats.derive(None);
    assert!(sample.cpu_percent.is_none());
    assert!(sample.net_rx_bytes_per_sec.is_none());
    assert_eq!(sample.memory_percent, 50.0);
}

#[test]
fn second_sample_derives_cpu_percent_from_deltas() {
    let prev = CumulativeStats {
        timestamp_ms: 1000,
        cpu_total_usage_ns: 1_000_000_000,
        system_cpu_usage_ns: 10_000_000_000,
        online_cpus: 4,
        ..Default::default()
    };
    let cur = CumulativeStats {
        timestamp_ms: 2000,
        cpu_total_usage_ns: 1_500_000_000,
        system_cpu_usage_ns: 11_000_000_000,
        online_cpus: 4,
        ..Default::default()
    };
    let sample = cur.derive(Some(&prev));
    // (0.5e9 / 1e9) * 4 * 100 = 200%
    assert_eq!(sample.cpu_percent, Some(200.0));
}

#[test]
fn network_and_disk_rates_divide_by_elapsed_seconds() {
    let prev = CumulativeStats { timestamp_ms: 0, net_rx_bytes: 1000, ..Default::default() };
    let cur = CumulativeStats { timestamp_ms: 2000, net_rx_bytes: 3000, ..Default::default() };
    let sample = cur.derive(Some(&prev));
    assert_eq!(sample.net_rx_bytes_per_sec, Some(1000.0));
}

#[test]
fn zero_elapsed_time_suppresses_rates() {
    let prev = CumulativeStats { timestamp_ms: 1000, ..Default::default() };
    let cur = CumulativeStats { timestamp_ms: 1000, ..Default::default() };
    let sample = cur.derive(Some(&prev));
    assert!(sample.cpu_percent.is_none());
}

#[test]
fn ring_drops_oldest_beyond_capacity() {
    let mut ring = SampleRing::new();
    for i in 0..(MAX_SAMPLES_PER_CONTAINER + 10) {
        ring.push(ResourceSample {
            timestamp_ms: i as u64,
            cpu_percent: None,
            memory_percent: 0.0,
            net_rx_bytes_per_sec: None,
            net_tx_bytes_per_sec: None,
            block_read_bytes_per_sec: None,
            block_write_bytes_per_sec: None,
        });
    }
    assert_eq!(ring.len(), MAX_SAMPLES_PER_CONTAINER);
    assert_eq!(ring.latest().expect("sample").timestamp_ms, (MAX_SAMPLES_PER_CONTAINER + 9) as u64);
}
