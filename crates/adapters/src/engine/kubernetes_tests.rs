// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use k8s_openapi::api::core::v1::{ContainerStatus as K8sContainerStatus, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

fn labeled_pod(labels: &[(&str, &str)], phase: &str, ready: bool) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some("demo-api-0".to_string()),
            uid: Some("uid-123".to_string()),
            labels: Some(labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<BTreeMap<_, _>>()),
            ..Default::default()
        },
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            container_statuses: Some(vec![K8sContainerStatus {
                ready,
                restart_count: 2,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[test]
fn status_from_phase_running_and_ready_is_running() {
    assert_eq!(status_from_phase(Some("Running"), true), ContainerStatus::Running);
}

#[test]
fn status_from_phase_running_but_not_ready_is_starting() {
    assert_eq!(status_from_phase(Some("Running"), false), ContainerStatus::Starting);
}

#[test]
fn status_from_phase_succeeded_is_exited() {
    assert_eq!(status_from_phase(Some("Succeeded"), true), ContainerStatus::Exited);
}

#[test]
fn descriptor_from_pod_requires_monitor_label() {
    let pod = labeled_pod(&[], "Running", true);
    assert!(descriptor_from_pod(&pod).is_none());
}

#[test]
fn descriptor_from_pod_reads_service_label_and_restart_count() {
    let pod = labeled_pod(
        &[(MONITOR_LABEL, "true"), (SERVICE_LABEL, "demo-api")],
        "Running",
        true,
    );
    let d = descriptor_from_pod(&pod).unwrap();
    assert_eq!(d.id.as_str(), "uid-123");
    assert_eq!(d.name, "demo-api-0");
    assert_eq!(d.service, "demo-api");
    assert_eq!(d.status, ContainerStatus::Running);
    assert_eq!(d.restart_count, 2);
}

#[test]
fn descriptor_from_pod_missing_monitor_value_is_excluded() {
    let pod = labeled_pod(&[(MONITOR_LABEL, "false")], "Running", true);
    assert!(descriptor_from_pod(&pod).is_none());
}
