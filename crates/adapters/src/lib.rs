// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for external I/O: the job tree on disk and the cluster

pub mod backend;
pub mod k8s;
pub mod prowjob;
pub mod source;

pub use backend::{BackendError, ExecutionBackend, JobStatus, StatusEvent, StatusStream};
pub use k8s::KubeBackend;
pub use prowjob::{
    periodic_record, presubmit_record, JobState, JobType, ProwJob, ProwJobSpec, ProwJobStatus,
    Pull, RecordError, Refs,
};
pub use source::{load_corpus, SourceError};

#[cfg(any(test, feature = "test-support"))]
pub use backend::{BackendCall, FakeBackend};
