// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The rehearsal pipeline: load both checkouts, select and build rehearsal
//! jobs, then submit and follow them.

use crate::exit_error::ExitError;
use anyhow::{Context, Result};
use rehearse_adapters::{load_corpus, ExecutionBackend, KubeBackend, Refs};
use rehearse_core::{ConfigCorpus, ExecutionMetrics, RehearsalConfig};
use rehearse_engine::{
    diff, dry_run_report, select_cluster_profile_jobs, select_template_jobs,
    temporary_config_maps, DiffResult, ExecutionAborted, ExecutionCoordinator, ExecutionReport,
    RehearsalBuilder, RehearsalSet, SharedResources,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Temporary ConfigMap name -> data.
pub type ConfigMaps = BTreeMap<String, BTreeMap<String, String>>;

/// Everything one invocation needs, resolved from flags and environment.
#[derive(Debug, Clone)]
pub struct Options {
    pub candidate_path: PathBuf,
    pub master_path: PathBuf,
    pub pr_number: u64,
    pub refs: Refs,
    pub dry_run: bool,
    pub allow_volumes: bool,
    pub namespace: String,
    pub config: RehearsalConfig,
    pub watch_timeout: Option<Duration>,
    pub metrics_output: Option<PathBuf>,
}

/// Rehearsal jobs selected for one pull request, before execution.
#[derive(Debug)]
pub struct Plan {
    pub diff: DiffResult,
    pub rehearsals: RehearsalSet,
    pub config_maps: ConfigMaps,
}

/// Select the jobs affected by the change and turn them into rehearsals.
///
/// Template and cluster-profile changes pull in extra jobs only when
/// volumes are allowed, since every such job mounts one.
pub fn plan(
    master: &ConfigCorpus,
    candidate: &ConfigCorpus,
    pr_number: u64,
    allow_volumes: bool,
    config: &RehearsalConfig,
) -> Plan {
    let diff = diff(master, candidate, config);

    let mut presubmits = diff.presubmits.clone();
    if allow_volumes {
        let picked = select_template_jobs(&diff.templates, &presubmits, &candidate.presubmits, config);
        presubmits.merge(picked);
        let picked = select_cluster_profile_jobs(
            &diff.cluster_profiles,
            &presubmits,
            &candidate.presubmits,
            config,
        );
        presubmits.merge(picked);
    }

    let resources = SharedResources {
        build_configs: candidate.build_configs.clone(),
        templates: diff.templates.clone(),
        cluster_profiles: diff.cluster_profiles.clone(),
    };
    let config_maps = if allow_volumes {
        temporary_config_maps(&resources, candidate, config)
    } else {
        ConfigMaps::new()
    };

    let builder = RehearsalBuilder::new(config.clone(), resources, pr_number, allow_volumes);
    let rehearsals = builder.build(&presubmits, &diff.periodics);
    tracing::info!(
        rehearsals = rehearsals.len(),
        rejected = rehearsals.rejected.len(),
        failed = rehearsals.failed.len(),
        config_maps = config_maps.len(),
        "planned rehearsal"
    );
    Plan { diff, rehearsals, config_maps }
}

pub async fn run(opts: &Options, cancel: CancellationToken) -> Result<()> {
    let master = load_corpus(&opts.master_path).with_context(|| {
        format!("failed to load master configuration from {}", opts.master_path.display())
    })?;
    let candidate = load_corpus(&opts.candidate_path).with_context(|| {
        format!("failed to load candidate configuration from {}", opts.candidate_path.display())
    })?;

    let plan = plan(&master, &candidate, opts.pr_number, opts.allow_volumes, &opts.config);

    let report = if opts.dry_run {
        let report = dry_run_report(
            &plan.rehearsals.presubmits,
            &plan.rehearsals.periodics,
            &opts.refs,
            &opts.namespace,
        );
        print!("{}", dry_run_output(&report, &plan.config_maps)?);
        report
    } else if plan.rehearsals.is_empty() {
        tracing::info!("no jobs to rehearse");
        ExecutionReport { success: true, ..Default::default() }
    } else {
        let backend = KubeBackend::new(&opts.namespace, &opts.config)
            .await
            .context("failed to connect to the cluster")?;
        let result = execute(backend, opts, &plan, cancel).await;
        write_partial_metrics(opts.metrics_output.as_deref(), &result)?;
        result?
    };

    if let Some(path) = &opts.metrics_output {
        write_metrics(path, &report.metrics)?;
    }
    outcome(&plan, &report)
}

/// Publish temporary ConfigMaps, run every rehearsal, then clean up.
pub async fn execute<B: ExecutionBackend>(
    backend: B,
    opts: &Options,
    plan: &Plan,
    cancel: CancellationToken,
) -> Result<ExecutionReport> {
    let coordinator = ExecutionCoordinator::new(backend, opts.config.clone(), &opts.namespace)
        .with_deadline(opts.watch_timeout)
        .with_cancellation(cancel);

    if let Err(error) = coordinator.publish(&plan.config_maps).await {
        coordinator.cleanup(&plan.config_maps).await;
        return Err(error).context("failed to publish temporary config maps");
    }
    let result = coordinator
        .execute(
            &plan.rehearsals.presubmits,
            &plan.rehearsals.periodics,
            opts.pr_number,
            &opts.refs,
            false,
        )
        .await;
    coordinator.cleanup(&plan.config_maps).await;

    result.context("failed while waiting for rehearsal jobs")
}

/// Dry-run stdout: rendered records, then the temporary ConfigMaps as a
/// second YAML document. Empty when there is nothing to rehearse.
pub fn dry_run_output(report: &ExecutionReport, config_maps: &ConfigMaps) -> Result<String> {
    let mut out = String::new();
    if !report.records.is_empty() {
        out.push_str(&report.records_yaml().context("failed to render rehearsal jobs")?);
    }
    if !config_maps.is_empty() {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(config_maps).context("failed to render config maps")?);
    }
    Ok(out)
}

pub fn write_metrics(path: &Path, metrics: &ExecutionMetrics) -> Result<()> {
    let json = serde_json::to_string_pretty(metrics).context("failed to serialize metrics")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write metrics to {}", path.display()))
}

/// Write the metrics gathered before monitoring was aborted.
pub fn write_partial_metrics(path: Option<&Path>, result: &Result<ExecutionReport>) -> Result<()> {
    let (Some(path), Err(error)) = (path, result) else {
        return Ok(());
    };
    match error.downcast_ref::<ExecutionAborted>() {
        Some(aborted) => write_metrics(path, &aborted.report.metrics),
        None => Ok(()),
    }
}

/// Map a finished run to success or a rehearsal-failure exit.
pub fn outcome(plan: &Plan, report: &ExecutionReport) -> Result<()> {
    let failed =
        plan.rehearsals.failed.len() + report.submit_failures.len() + report.metrics.failed.len();
    if failed > 0 {
        return Err(ExitError::rehearsal_failed(format!("{} rehearsal job(s) failed", failed)).into());
    }
    if !report.success {
        return Err(ExitError::rehearsal_failed("rehearsal did not succeed").into());
    }
    tracing::info!(passed = report.metrics.passed.len(), "all rehearsal jobs passed");
    Ok(())
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
