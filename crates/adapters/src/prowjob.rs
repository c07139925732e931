// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution records submitted to the cluster: the `ProwJob` custom resource.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::PodSpec;
use kube::CustomResource;
use rehearse_core::{JobBase, Periodic, Presubmit};
pub use rehearse_core::{Pull, Refs};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

const JOB_LABEL: &str = "prow.k8s.io/job";
const TYPE_LABEL: &str = "prow.k8s.io/type";
const ORG_LABEL: &str = "prow.k8s.io/refs.org";
const REPO_LABEL: &str = "prow.k8s.io/refs.repo";
const PULL_LABEL: &str = "prow.k8s.io/refs.pull";
const CREATED_BY_LABEL: &str = "created-by-prow";
const MAX_LABEL_LEN: usize = 63;

/// Errors from building an execution record
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("job {0} has no execution spec")]
    MissingSpec(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    #[default]
    Presubmit,
    Periodic,
}

rehearse_core::simple_display! {
    JobType {
        Presubmit => "presubmit",
        Periodic => "periodic",
    }
}

/// Lifecycle of a submitted job.
///
/// `Submitted` and `Running` are transient; the rest are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    #[default]
    #[serde(rename = "triggered")]
    Submitted,
    #[serde(rename = "pending")]
    Running,
    #[serde(rename = "success")]
    Succeeded,
    #[serde(rename = "failure")]
    Failed,
    #[serde(rename = "aborted")]
    Aborted,
    #[serde(rename = "error")]
    Errored,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Submitted | JobState::Running)
    }
}

rehearse_core::simple_display! {
    JobState {
        Submitted => "triggered",
        Running => "pending",
        Succeeded => "success",
        Failed => "failure",
        Aborted => "aborted",
        Errored => "error",
    }
}

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "prow.k8s.io",
    version = "v1",
    kind = "ProwJob",
    namespaced,
    status = "ProwJobStatus",
    derive = "PartialEq",
    schema = "disabled"
)]
pub struct ProwJobSpec {
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub agent: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub job: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Refs>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_refs: Vec<Refs>,
    #[serde(default)]
    pub report: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rerun_command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_spec: Option<PodSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProwJobStatus {
    #[serde(default)]
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl ProwJob {
    /// Object name assigned at construction.
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn state(&self) -> JobState {
        self.status.as_ref().map(|s| s.state).unwrap_or_default()
    }
}

/// Build the record for a rehearsal presubmit tested against `refs`.
pub fn presubmit_record(
    job: &Presubmit,
    refs: &Refs,
    namespace: &str,
) -> Result<ProwJob, RecordError> {
    let spec = ProwJobSpec {
        job_type: JobType::Presubmit,
        agent: job.base.agent.to_string(),
        namespace: namespace.to_string(),
        job: job.name().to_string(),
        refs: Some(refs.clone()),
        extra_refs: Vec::new(),
        report: true,
        context: job.context.clone(),
        rerun_command: job.rerun_command.clone(),
        pod_spec: Some(pod_spec(&job.base)?),
    };
    let mut labels = base_labels(&job.base, JobType::Presubmit);
    labels.insert(ORG_LABEL.to_string(), label_value(&refs.org));
    labels.insert(REPO_LABEL.to_string(), label_value(&refs.repo));
    if let Some(pull) = refs.pulls.first() {
        labels.insert(PULL_LABEL.to_string(), pull.number.to_string());
    }
    Ok(new_record(spec, labels))
}

/// Build the record for a rehearsal periodic.
pub fn periodic_record(job: &Periodic, namespace: &str) -> Result<ProwJob, RecordError> {
    let spec = ProwJobSpec {
        job_type: JobType::Periodic,
        agent: job.base.agent.to_string(),
        namespace: namespace.to_string(),
        job: job.name().to_string(),
        extra_refs: job.extra_refs.clone(),
        report: true,
        pod_spec: Some(pod_spec(&job.base)?),
        ..Default::default()
    };
    Ok(new_record(spec, base_labels(&job.base, JobType::Periodic)))
}

fn pod_spec(base: &JobBase) -> Result<PodSpec, RecordError> {
    base.spec.clone().ok_or_else(|| RecordError::MissingSpec(base.name.clone()))
}

fn base_labels(base: &JobBase, job_type: JobType) -> BTreeMap<String, String> {
    let mut labels = base.labels.clone();
    labels.insert(CREATED_BY_LABEL.to_string(), "true".to_string());
    labels.insert(JOB_LABEL.to_string(), label_value(&base.name));
    labels.insert(TYPE_LABEL.to_string(), job_type.to_string());
    labels
}

fn new_record(spec: ProwJobSpec, labels: BTreeMap<String, String>) -> ProwJob {
    let name = uuid::Uuid::new_v4().to_string();
    let annotations = [(JOB_LABEL.to_string(), spec.job.clone())].into_iter().collect();
    let mut record = ProwJob::new(&name, spec);
    record.metadata.labels = Some(labels);
    record.metadata.annotations = Some(annotations);
    record.status = Some(ProwJobStatus {
        state: JobState::Submitted,
        start_time: Some(Utc::now()),
        ..Default::default()
    });
    record
}

/// Kubernetes label values are capped at 63 characters.
fn label_value(value: &str) -> String {
    let mut end = value.len().min(MAX_LABEL_LEN);
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value[..end].trim_end_matches(['-', '_', '.']).to_string()
}

#[cfg(test)]
#[path = "prowjob_tests.rs"]
mod tests;
