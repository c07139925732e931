// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution backend abstraction.
//!
//! The coordinator submits [`ProwJob`] records and follows their progress
//! through a label-scoped status stream. Shared resources that rehearsal
//! jobs mount under temporary names are published through the same backend.

use crate::prowjob::{JobState, ProwJob};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from backend operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("submit failed: {0}")]
    SubmitFailed(String),
    #[error("watch failed: {0}")]
    WatchFailed(String),
    #[error("status stream error: {0}")]
    Stream(String),
    #[error("config map {name}: {message}")]
    ConfigMap { name: String, message: String },
    #[error("client error: {0}")]
    Client(String),
}

/// Status snapshot of one submitted job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    /// Object name of the submitted record.
    pub name: String,
    /// Name of the job the record runs.
    pub job: String,
    pub state: JobState,
}

impl From<&ProwJob> for JobStatus {
    fn from(record: &ProwJob) -> Self {
        Self { name: record.name().to_string(), job: record.spec.job.clone(), state: record.state() }
    }
}

/// One event delivered by the status stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    Updated(JobStatus),
    /// Progress marker carrying no job.
    Bookmark,
    /// An object the stream should never carry.
    Unrecognized { kind: String },
}

pub type StatusStream = BoxStream<'static, Result<StatusEvent, BackendError>>;

/// Adapter for submitting jobs to, and observing them on, the cluster
#[async_trait]
pub trait ExecutionBackend: Clone + Send + Sync + 'static {
    /// Create the record; returns it as stored by the backend.
    async fn submit(&self, record: &ProwJob) -> Result<ProwJob, BackendError>;

    /// Open a status stream over records matching `label_selector`.
    async fn watch(&self, label_selector: &str) -> Result<StatusStream, BackendError>;

    /// Create or replace a ConfigMap.
    async fn apply_config_map(
        &self,
        name: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<(), BackendError>;

    async fn delete_config_map(&self, name: &str) -> Result<(), BackendError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{BackendError, ExecutionBackend, StatusEvent, StatusStream};
    use crate::prowjob::ProwJob;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Arc;

    /// Recorded backend call
    #[derive(Debug, Clone, PartialEq)]
    pub enum BackendCall {
        Submit { job: String },
        Watch { label_selector: String },
        ApplyConfigMap { name: String, data: BTreeMap<String, String> },
        DeleteConfigMap { name: String },
    }

    #[derive(Default)]
    struct FakeBackendState {
        calls: Vec<BackendCall>,
        reject: HashSet<String>,
        events: Vec<Result<StatusEvent, BackendError>>,
        watch_error: Option<BackendError>,
    }

    /// Fake execution backend for testing.
    ///
    /// Submissions get deterministic record names (`<job>-record`). A watch
    /// replays the scripted events and then ends; once the script is drained,
    /// further watches stay open without delivering anything.
    #[derive(Clone, Default)]
    pub struct FakeBackend {
        inner: Arc<Mutex<FakeBackendState>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Record name the fake assigns to submissions of `job`.
        pub fn record_name(job: &str) -> String {
            format!("{}-record", job)
        }

        /// Fail every submission of `job`.
        pub fn reject(&self, job: &str) {
            self.inner.lock().reject.insert(job.to_string());
        }

        pub fn push_event(&self, event: StatusEvent) {
            self.inner.lock().events.push(Ok(event));
        }

        pub fn push_error(&self, error: BackendError) {
            self.inner.lock().events.push(Err(error));
        }

        pub fn fail_watch(&self, error: BackendError) {
            self.inner.lock().watch_error = Some(error);
        }

        pub fn calls(&self) -> Vec<BackendCall> {
            self.inner.lock().calls.clone()
        }

        pub fn submitted(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    BackendCall::Submit { job } => Some(job),
                    _ => None,
                })
                .collect()
        }

        pub fn watch_count(&self) -> usize {
            self.calls().iter().filter(|c| matches!(c, BackendCall::Watch { .. })).count()
        }
    }

    #[async_trait]
    impl ExecutionBackend for FakeBackend {
        async fn submit(&self, record: &ProwJob) -> Result<ProwJob, BackendError> {
            let mut inner = self.inner.lock();
            let job = record.spec.job.clone();
            inner.calls.push(BackendCall::Submit { job: job.clone() });
            if inner.reject.contains(&job) {
                return Err(BackendError::SubmitFailed(format!("{} rejected", job)));
            }
            let mut stored = record.clone();
            stored.metadata.name = Some(Self::record_name(&job));
            Ok(stored)
        }

        async fn watch(&self, label_selector: &str) -> Result<StatusStream, BackendError> {
            let mut inner = self.inner.lock();
            inner.calls.push(BackendCall::Watch { label_selector: label_selector.to_string() });
            if let Some(error) = inner.watch_error.clone() {
                return Err(error);
            }
            if inner.events.is_empty() {
                return Ok(Box::pin(futures_util::stream::pending()));
            }
            Ok(Box::pin(futures_util::stream::iter(std::mem::take(&mut inner.events))))
        }

        async fn apply_config_map(
            &self,
            name: &str,
            data: &BTreeMap<String, String>,
        ) -> Result<(), BackendError> {
            self.inner
                .lock()
                .calls
                .push(BackendCall::ApplyConfigMap { name: name.to_string(), data: data.clone() });
            Ok(())
        }

        async fn delete_config_map(&self, name: &str) -> Result<(), BackendError> {
            self.inner.lock().calls.push(BackendCall::DeleteConfigMap { name: name.to_string() });
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{BackendCall, FakeBackend};

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;
