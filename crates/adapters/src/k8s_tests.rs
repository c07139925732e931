// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::prowjob::{JobState, ProwJobSpec, ProwJobStatus};
use kube::core::ErrorResponse;

fn record(name: &str, job: &str, state: JobState) -> ProwJob {
    let mut record =
        ProwJob::new(name, ProwJobSpec { job: job.to_string(), ..Default::default() });
    record.status = Some(ProwJobStatus { state, ..Default::default() });
    record
}

#[test]
fn object_events_become_status_updates() {
    let expected = StatusEvent::Updated(JobStatus {
        name: "uid-1".to_string(),
        job: "rehearse-1-unit".to_string(),
        state: JobState::Failed,
    });
    for event in [
        WatchEvent::Added(record("uid-1", "rehearse-1-unit", JobState::Failed)),
        WatchEvent::Modified(record("uid-1", "rehearse-1-unit", JobState::Failed)),
        WatchEvent::Deleted(record("uid-1", "rehearse-1-unit", JobState::Failed)),
    ] {
        assert_eq!(status_event(event), Ok(expected.clone()));
    }
}

#[test]
fn missing_status_reads_as_submitted() {
    let mut job = record("uid-2", "rehearse-1-e2e", JobState::Running);
    job.status = None;
    match status_event(WatchEvent::Modified(job)) {
        Ok(StatusEvent::Updated(status)) => assert_eq!(status.state, JobState::Submitted),
        other => panic!("unexpected event: {:?}", other),
    }
}

#[test]
fn watch_error_is_a_stream_error() {
    let event = WatchEvent::Error(ErrorResponse {
        status: "Failure".to_string(),
        message: "too old resource version".to_string(),
        reason: "Expired".to_string(),
        code: 410,
    });
    assert_eq!(
        status_event(event),
        Err(BackendError::Stream("too old resource version (410)".to_string()))
    );
}

#[test]
fn temporary_config_maps_carry_the_resource_label() {
    let config = RehearsalConfig::default().resource_label_key("example.com/rehearsal");
    let data = BTreeMap::from([("vars.yaml".to_string(), "region: us-east-1\n".to_string())]);

    let cm = temporary_config_map(
        "rehearse-cluster-profile-aws-01234567",
        "ci",
        &config.resource_label_key,
        &data,
    );

    assert_eq!(cm.metadata.name.as_deref(), Some("rehearse-cluster-profile-aws-01234567"));
    assert_eq!(cm.metadata.namespace.as_deref(), Some("ci"));
    let labels = cm.metadata.labels.unwrap_or_default();
    assert_eq!(labels.get("example.com/rehearsal").map(String::as_str), Some("true"));
    assert_eq!(labels.len(), 1);
    assert_eq!(cm.data, Some(data));
}
