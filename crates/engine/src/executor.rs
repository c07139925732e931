// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rehearsal execution: submit every job, then follow them to completion.

use futures_util::StreamExt;
use rehearse_adapters::{
    periodic_record, presubmit_record, BackendError, ExecutionBackend, JobState, ProwJob,
    RecordError, Refs, StatusEvent,
};
use rehearse_core::{ExecutionMetrics, Periodic, Presubmits, RehearsalConfig};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors that abort monitoring
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("failed to open status stream: {0}")]
    Watch(#[source] BackendError),
    #[error("status stream failed: {source}")]
    Stream {
        #[source]
        source: BackendError,
        outstanding: Vec<String>,
    },
    #[error("status stream delivered an unexpected {kind}")]
    UnexpectedObject { kind: String, outstanding: Vec<String> },
    #[error("timed out waiting for {} rehearsal job(s)", outstanding.len())]
    TimedOut { outstanding: Vec<String> },
    #[error("cancelled while waiting for {} rehearsal job(s)", outstanding.len())]
    Cancelled { outstanding: Vec<String> },
}

impl ExecuteError {
    /// Record names still unresolved when monitoring stopped.
    pub fn outstanding(&self) -> &[String] {
        match self {
            ExecuteError::Watch(_) => &[],
            ExecuteError::Stream { outstanding, .. }
            | ExecuteError::UnexpectedObject { outstanding, .. }
            | ExecuteError::TimedOut { outstanding }
            | ExecuteError::Cancelled { outstanding } => outstanding,
        }
    }
}

/// Monitoring stopped before every submitted job finished.
///
/// `report` holds the submissions and results gathered up to that point.
#[derive(Debug, Error)]
#[error("{cause}")]
pub struct ExecutionAborted {
    pub cause: ExecuteError,
    pub report: Box<ExecutionReport>,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Render(#[from] RecordError),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// A job that never made it to the backend
#[derive(Debug)]
pub struct SubmitFailure {
    pub job: String,
    pub error: SubmitError,
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// No submission failed and every submitted job succeeded.
    pub success: bool,
    pub metrics: ExecutionMetrics,
    pub submit_failures: Vec<SubmitFailure>,
    /// Rendered records (dry run) or records as stored by the backend.
    pub records: Vec<ProwJob>,
}

impl ExecutionReport {
    /// Records as a YAML list, ordered by job name.
    pub fn records_yaml(&self) -> Result<String, serde_yaml::Error> {
        let mut records: Vec<&ProwJob> = self.records.iter().collect();
        records.sort_by(|a, b| a.spec.job.cmp(&b.spec.job));
        serde_yaml::to_string(&records)
    }
}

/// Build the execution record of every job.
///
/// Jobs that cannot be rendered are returned as failures.
pub fn render(
    presubmits: &Presubmits,
    periodics: &[Periodic],
    refs: &Refs,
    namespace: &str,
) -> (Vec<ProwJob>, Vec<SubmitFailure>) {
    let mut records = Vec::new();
    let mut failures = Vec::new();
    for (repo, job) in presubmits.iter() {
        match presubmit_record(job, refs, namespace) {
            Ok(record) => records.push(record),
            Err(error) => {
                tracing::warn!(%repo, job = %job.name(), %error, "failed to render rehearsal job");
                failures.push(SubmitFailure { job: job.name().to_string(), error: error.into() });
            }
        }
    }
    for job in periodics {
        match periodic_record(job, namespace) {
            Ok(record) => records.push(record),
            Err(error) => {
                tracing::warn!(job = %job.name(), %error, "failed to render rehearsal job");
                failures.push(SubmitFailure { job: job.name().to_string(), error: error.into() });
            }
        }
    }
    (records, failures)
}

/// Report of a dry run: records rendered and sorted by job, nothing submitted.
pub fn dry_run_report(
    presubmits: &Presubmits,
    periodics: &[Periodic],
    refs: &Refs,
    namespace: &str,
) -> ExecutionReport {
    let (mut records, submit_failures) = render(presubmits, periodics, refs, namespace);
    records.sort_by(|a, b| a.spec.job.cmp(&b.spec.job));
    ExecutionReport {
        success: submit_failures.is_empty(),
        metrics: ExecutionMetrics::default(),
        submit_failures,
        records,
    }
}

enum Stop {
    Finished(Result<bool, ExecuteError>),
    TimedOut,
    Cancelled,
}

/// Submits rehearsal jobs and monitors them through one backend.
pub struct ExecutionCoordinator<B: ExecutionBackend> {
    backend: B,
    config: RehearsalConfig,
    namespace: String,
    deadline: Option<Duration>,
    cancel: CancellationToken,
}

impl<B: ExecutionBackend> ExecutionCoordinator<B> {
    pub fn new(backend: B, config: RehearsalConfig, namespace: impl Into<String>) -> Self {
        Self {
            backend,
            config,
            namespace: namespace.into(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Give up monitoring after `deadline`; `None` waits indefinitely.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Render and (unless `dry_run`) submit every job, then wait for all
    /// submitted jobs to reach a terminal state.
    pub async fn execute(
        &self,
        presubmits: &Presubmits,
        periodics: &[Periodic],
        pr_number: u64,
        refs: &Refs,
        dry_run: bool,
    ) -> Result<ExecutionReport, ExecutionAborted> {
        if dry_run {
            return Ok(dry_run_report(presubmits, periodics, refs, &self.namespace));
        }

        let (rendered, submit_failures) = render(presubmits, periodics, refs, &self.namespace);
        let mut report = ExecutionReport { submit_failures, ..Default::default() };

        let mut pending = BTreeSet::new();
        for record in rendered {
            let job = record.spec.job.clone();
            match self.backend.submit(&record).await {
                Ok(created) => {
                    tracing::info!(%job, record = %created.name(), "submitted rehearsal job");
                    report.metrics.submitted.push(job);
                    pending.insert(created.name().to_string());
                    report.records.push(created);
                }
                Err(error) => {
                    tracing::warn!(%job, %error, "failed to submit rehearsal job");
                    report.submit_failures.push(SubmitFailure { job, error: error.into() });
                }
            }
        }

        let all_passed = if pending.is_empty() {
            true
        } else {
            let selector = self.config.label_selector(pr_number);
            match self.wait(pending, &selector, &mut report.metrics).await {
                Ok(all_passed) => all_passed,
                Err(cause) => return Err(ExecutionAborted { cause, report: Box::new(report) }),
            }
        };
        report.success = all_passed && report.submit_failures.is_empty();
        Ok(report)
    }

    async fn wait(
        &self,
        mut pending: BTreeSet<String>,
        selector: &str,
        metrics: &mut ExecutionMetrics,
    ) -> Result<bool, ExecuteError> {
        let deadline = self.deadline;
        let stop = {
            let monitor = self.monitor(&mut pending, selector, metrics);
            let expiry = async {
                match deadline {
                    Some(deadline) => tokio::time::sleep(deadline).await,
                    None => std::future::pending().await,
                }
            };
            tokio::select! {
                result = monitor => Stop::Finished(result),
                () = expiry => Stop::TimedOut,
                () = self.cancel.cancelled() => Stop::Cancelled,
            }
        };

        let outstanding = || pending.iter().cloned().collect::<Vec<_>>();
        match stop {
            Stop::Finished(result) => result,
            Stop::TimedOut => {
                tracing::error!(outstanding = pending.len(), "timed out waiting for rehearsal jobs");
                Err(ExecuteError::TimedOut { outstanding: outstanding() })
            }
            Stop::Cancelled => Err(ExecuteError::Cancelled { outstanding: outstanding() }),
        }
    }

    /// Consume status events until every pending record is terminal.
    ///
    /// A stream that ends cleanly is reopened; a stream error is fatal.
    async fn monitor(
        &self,
        pending: &mut BTreeSet<String>,
        selector: &str,
        metrics: &mut ExecutionMetrics,
    ) -> Result<bool, ExecuteError> {
        let mut success = true;
        loop {
            let mut stream = self.backend.watch(selector).await.map_err(ExecuteError::Watch)?;
            while let Some(event) = stream.next().await {
                let status = match event {
                    Ok(StatusEvent::Updated(status)) => status,
                    Ok(StatusEvent::Bookmark) => continue,
                    Ok(StatusEvent::Unrecognized { kind }) => {
                        return Err(ExecuteError::UnexpectedObject {
                            kind,
                            outstanding: pending.iter().cloned().collect(),
                        });
                    }
                    Err(source) => {
                        return Err(ExecuteError::Stream {
                            source,
                            outstanding: pending.iter().cloned().collect(),
                        });
                    }
                };

                tracing::debug!(
                    record = %status.name,
                    job = %status.job,
                    state = %status.state,
                    "processing status update"
                );
                if !status.state.is_terminal() || !pending.remove(&status.name) {
                    continue;
                }
                if status.state == JobState::Succeeded {
                    tracing::info!(job = %status.job, "rehearsal job succeeded");
                    metrics.passed.push(status.job);
                } else {
                    tracing::error!(job = %status.job, state = %status.state, "rehearsal job failed");
                    metrics.failed.push(status.job);
                    success = false;
                }
                if pending.is_empty() {
                    return Ok(success);
                }
            }
            tracing::debug!(outstanding = pending.len(), "status stream closed, reopening");
        }
    }

    /// Create the temporary ConfigMaps rehearsal jobs mount.
    pub async fn publish(
        &self,
        config_maps: &BTreeMap<String, BTreeMap<String, String>>,
    ) -> Result<(), BackendError> {
        for (name, data) in config_maps {
            self.backend.apply_config_map(name, data).await?;
        }
        Ok(())
    }

    /// Delete the temporary ConfigMaps; failures are logged, not returned.
    pub async fn cleanup(&self, config_maps: &BTreeMap<String, BTreeMap<String, String>>) {
        for name in config_maps.keys() {
            if let Err(error) = self.backend.delete_config_map(name).await {
                tracing::warn!(config_map = %name, %error, "failed to delete temporary config map");
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
