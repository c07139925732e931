// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rehearsal eligibility.

use rehearse_core::{JobBase, Periodic, Presubmit, RehearsalConfig};
use thiserror::Error;

/// Why a job cannot be rehearsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("cannot rehearse jobs with no branches")]
    NoBranches,
    #[error("cannot rehearse jobs that run over multiple branches")]
    MultipleBranches,
    #[error("cannot rehearse jobs run by the {0} agent")]
    UnsupportedAgent(String),
    #[error("cannot rehearse jobs without an execution spec")]
    MissingSpec,
    #[error("cannot rehearse jobs whose command is {command:?} instead of {expected:?}")]
    UnsupportedCommand { command: Vec<String>, expected: String },
    #[error("cannot rehearse jobs that already pass {0:?}")]
    GitRefOverride(String),
    #[error("jobs that need additional volumes mounted are not allowed")]
    Volumes,
}

pub fn check_presubmit(
    job: &Presubmit,
    allow_volumes: bool,
    config: &RehearsalConfig,
) -> Result<(), Rejection> {
    match job.branches.len() {
        0 => return Err(Rejection::NoBranches),
        1 => {}
        _ => return Err(Rejection::MultipleBranches),
    }
    check_job(&job.base, allow_volumes, config)
}

pub fn check_periodic(
    job: &Periodic,
    allow_volumes: bool,
    config: &RehearsalConfig,
) -> Result<(), Rejection> {
    check_job(&job.base, allow_volumes, config)
}

fn check_job(job: &JobBase, allow_volumes: bool, config: &RehearsalConfig) -> Result<(), Rejection> {
    if !job.agent.is_rehearsable() {
        return Err(Rejection::UnsupportedAgent(job.agent.to_string()));
    }
    let (Some(spec), Some(container)) = (job.spec.as_ref(), job.container()) else {
        return Err(Rejection::MissingSpec);
    };

    let command = container.command.clone().unwrap_or_default();
    if command != [config.command.as_str()] {
        return Err(Rejection::UnsupportedCommand { command, expected: config.command.clone() });
    }

    if let Some(arg) = container.args.iter().flatten().find(|a| config.overrides_git_ref(a)) {
        return Err(Rejection::GitRefOverride(arg.clone()));
    }

    if spec.volumes.as_ref().is_some_and(|v| !v.is_empty()) && !allow_volumes {
        return Err(Rejection::Volumes);
    }
    Ok(())
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
