// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rehearse-engine: change detection, rehearsal building, and execution

pub mod builder;
pub mod diff;
pub mod executor;
pub mod filter;

pub use builder::{
    select_cluster_profile_jobs, select_template_jobs, temporary_config_maps, BuildError,
    FailedJob, RehearsalBuilder, RehearsalSet, RejectedJob, SharedResources,
};
pub use diff::{diff, BuildConfigDiff, DiffResult};
pub use executor::{
    dry_run_report, render, ExecuteError, ExecutionAborted, ExecutionCoordinator, ExecutionReport,
    SubmitError, SubmitFailure,
};
pub use filter::{check_periodic, check_presubmit, Rejection};
