// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change detection between two revisions of the configuration tree.
//!
//! Every comparison is structural over decoded values, so reordered keys
//! and reformatted files never register as changes.

use rehearse_core::{
    BuildConfigs, ConfigCorpus, ConfigMapSource, JobBase, Periodic, Presubmits, ProfileFiles,
    RehearsalConfig,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// New or changed build configs between two revisions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildConfigDiff {
    /// Candidate version of every new or changed config.
    pub changed: BuildConfigs,
    /// Test steps a change was confined to.
    ///
    /// A changed key without an entry here affects every test of that config.
    pub affected_tests: BTreeMap<String, BTreeSet<String>>,
}

impl BuildConfigDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Whether test `test` derived from config `key` must be rehearsed.
    pub fn affects(&self, key: &str, test: Option<&str>) -> bool {
        if !self.changed.contains_key(key) {
            return false;
        }
        match self.affected_tests.get(key) {
            None => true,
            Some(tests) => test.is_some_and(|t| tests.contains(t)),
        }
    }
}

/// Everything that differs between the master and candidate corpora.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    pub build_configs: BuildConfigDiff,
    /// Changed presubmits plus those linked to changed build configs.
    pub presubmits: Presubmits,
    /// Changed periodics plus those linked to changed build configs.
    pub periodics: Vec<Periodic>,
    pub templates: Vec<ConfigMapSource>,
    pub cluster_profiles: Vec<ConfigMapSource>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.build_configs.is_empty()
            && self.presubmits.is_empty()
            && self.periodics.is_empty()
            && self.templates.is_empty()
            && self.cluster_profiles.is_empty()
    }
}

/// Compare two corpora and select every job the candidate needs rehearsed.
pub fn diff(master: &ConfigCorpus, candidate: &ConfigCorpus, config: &RehearsalConfig) -> DiffResult {
    let build_configs = diff_build_configs(&master.build_configs, &candidate.build_configs);

    let mut presubmits = diff_presubmits(&master.presubmits, &candidate.presubmits);
    presubmits.merge(presubmits_for_build_configs(&candidate.presubmits, &build_configs, config));

    let mut periodics = diff_periodics(&master.periodics, &candidate.periodics);
    for job in periodics_for_build_configs(&candidate.periodics, &build_configs, config) {
        if !periodics.iter().any(|p| p.name() == job.name()) {
            periodics.push(job);
        }
    }

    let result = DiffResult {
        build_configs,
        presubmits,
        periodics,
        templates: changed_templates(&master.templates, &candidate.templates),
        cluster_profiles: changed_cluster_profiles(
            &master.cluster_profiles,
            &candidate.cluster_profiles,
        ),
    };
    tracing::info!(
        build_configs = result.build_configs.changed.len(),
        presubmits = result.presubmits.len(),
        periodics = result.periodics.len(),
        templates = result.templates.len(),
        cluster_profiles = result.cluster_profiles.len(),
        "computed changes"
    );
    result
}

pub fn diff_build_configs(master: &BuildConfigs, candidate: &BuildConfigs) -> BuildConfigDiff {
    let mut diff = BuildConfigDiff::default();
    for (key, config) in candidate {
        let Some(old) = master.get(key) else {
            tracing::debug!(build_config = %key, "new build config");
            diff.changed.insert(key.clone(), config.clone());
            continue;
        };

        if old.without_tests() != config.without_tests() {
            tracing::debug!(build_config = %key, "build config changed outside its tests");
            diff.changed.insert(key.clone(), config.clone());
            continue;
        }

        let tests: BTreeSet<String> = config
            .tests
            .iter()
            .filter(|step| old.test(&step.name) != Some(*step))
            .map(|step| step.name.clone())
            .collect();
        if !tests.is_empty() {
            tracing::debug!(build_config = %key, ?tests, "build config tests changed");
            diff.changed.insert(key.clone(), config.clone());
            diff.affected_tests.insert(key.clone(), tests);
        }
    }
    diff
}

/// Presubmits whose agent or execution spec differ from master.
///
/// A changed agent selects the job even when its spec is identical.
pub fn diff_presubmits(master: &Presubmits, candidate: &Presubmits) -> Presubmits {
    let index = master.index();
    candidate
        .iter()
        .filter(|(repo, job)| match index.get(repo).and_then(|jobs| jobs.get(job.name())) {
            None => true,
            Some(old) => old.base.agent != job.base.agent || old.base.spec != job.base.spec,
        })
        .inspect(|(repo, job)| tracing::debug!(%repo, job = %job.name(), "presubmit changed"))
        .map(|(repo, job)| (repo.to_string(), job.clone()))
        .collect()
}

/// Periodics that differ from master in any field.
pub fn diff_periodics(master: &[Periodic], candidate: &[Periodic]) -> Vec<Periodic> {
    let index: BTreeMap<&str, &Periodic> = master.iter().map(|p| (p.name(), p)).collect();
    candidate
        .iter()
        .filter(|job| !matches!(index.get(job.name()), Some(old) if *old == *job))
        .inspect(|job| tracing::debug!(job = %job.name(), "periodic changed"))
        .cloned()
        .collect()
}

/// Rehearsable presubmits reading an affected test of a changed build config.
pub fn presubmits_for_build_configs(
    candidate: &Presubmits,
    diff: &BuildConfigDiff,
    config: &RehearsalConfig,
) -> Presubmits {
    if diff.is_empty() {
        return Presubmits::new();
    }
    candidate
        .iter()
        .filter(|(_, job)| uses_changed_build_config(&job.base, &config.presubmit_name_prefix, diff, config))
        .map(|(repo, job)| (repo.to_string(), job.clone()))
        .collect()
}

/// Rehearsable periodics reading an affected test of a changed build config.
pub fn periodics_for_build_configs(
    candidate: &[Periodic],
    diff: &BuildConfigDiff,
    config: &RehearsalConfig,
) -> Vec<Periodic> {
    if diff.is_empty() {
        return Vec::new();
    }
    candidate
        .iter()
        .filter(|job| uses_changed_build_config(&job.base, &config.periodic_name_prefix, diff, config))
        .cloned()
        .collect()
}

fn uses_changed_build_config(
    job: &JobBase,
    name_prefix: &str,
    diff: &BuildConfigDiff,
    config: &RehearsalConfig,
) -> bool {
    if !job.agent.is_rehearsable() {
        return false;
    }
    job.build_config_keys(config).iter().any(|key| {
        let affected = diff.affects(key, test_name(&job.name, name_prefix, key));
        if affected {
            tracing::debug!(job = %job.name, build_config = %key, "job uses changed build config");
        }
        affected
    })
}

/// Test step a generated job runs: its name minus `name_prefix` and the
/// `<org>-<repo>-<branch>-` stem of its build config key.
pub fn test_name<'a>(job_name: &'a str, name_prefix: &str, key: &str) -> Option<&'a str> {
    let stem = Path::new(key).file_stem()?.to_str()?;
    job_name.strip_prefix(name_prefix)?.strip_prefix(stem)?.strip_prefix('-')
}

/// New or content-changed templates, in file name order.
pub fn changed_templates(
    master: &BTreeMap<String, String>,
    candidate: &BTreeMap<String, String>,
) -> Vec<ConfigMapSource> {
    candidate
        .iter()
        .filter(|(name, content)| master.get(*name) != Some(*content))
        .map(|(name, content)| ConfigMapSource::for_template(name, content))
        .collect()
}

/// New or content-changed cluster profiles, in name order.
pub fn changed_cluster_profiles(
    master: &BTreeMap<String, ProfileFiles>,
    candidate: &BTreeMap<String, ProfileFiles>,
) -> Vec<ConfigMapSource> {
    candidate
        .iter()
        .filter(|(name, files)| master.get(*name) != Some(*files))
        .map(|(name, files)| ConfigMapSource::for_profile(name, files))
        .collect()
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
