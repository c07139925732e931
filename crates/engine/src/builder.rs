// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turning selected production jobs into isolated rehearsal jobs.
//!
//! Each surviving job is cloned and stamped, its build-config references
//! are replaced by the candidate config content, and (when volumes are
//! allowed) its shared templates and cluster profiles are redirected to
//! per-run ConfigMaps. Aliases are computed once per builder so every job
//! in a run agrees on them.

use crate::filter::{check_periodic, check_presubmit, Rejection};
use k8s_openapi::api::core::v1::PodSpec;
use rehearse_core::policy::{has_cluster_type, uses_cluster_profile, uses_template};
use rehearse_core::{
    BuildConfigs, ConfigCorpus, ConfigMapSource, JobBase, Periodic, Presubmit, Presubmits,
    RehearsalConfig,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors from transforming one job
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("build config {key} used by {job} was not found")]
    MissingBuildConfig { job: String, key: String },
    #[error("failed to serialize build config {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Shared state a run's rehearsal jobs read: candidate build configs plus
/// the changed shared resources that get temporary aliases.
#[derive(Debug, Clone, Default)]
pub struct SharedResources {
    pub build_configs: BuildConfigs,
    pub templates: Vec<ConfigMapSource>,
    pub cluster_profiles: Vec<ConfigMapSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedJob {
    /// Repository, for presubmits.
    pub repo: Option<String>,
    pub job: String,
    pub reason: Rejection,
}

#[derive(Debug)]
pub struct FailedJob {
    pub repo: Option<String>,
    pub job: String,
    pub error: BuildError,
}

/// Output of one build: the rehearsal jobs plus every job left out.
#[derive(Debug, Default)]
pub struct RehearsalSet {
    pub presubmits: Presubmits,
    pub periodics: Vec<Periodic>,
    pub rejected: Vec<RejectedJob>,
    pub failed: Vec<FailedJob>,
}

impl RehearsalSet {
    pub fn len(&self) -> usize {
        self.presubmits.len() + self.periodics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct RehearsalBuilder {
    config: RehearsalConfig,
    resources: SharedResources,
    pr_number: u64,
    allow_volumes: bool,
    /// Template file name -> temporary ConfigMap.
    template_aliases: BTreeMap<String, String>,
    /// Production cluster-profile ConfigMap -> temporary ConfigMap.
    profile_aliases: BTreeMap<String, String>,
}

impl RehearsalBuilder {
    pub fn new(
        config: RehearsalConfig,
        resources: SharedResources,
        pr_number: u64,
        allow_volumes: bool,
    ) -> Self {
        let (template_aliases, profile_aliases) = if allow_volumes {
            (
                resources
                    .templates
                    .iter()
                    .map(|t| (t.base_name(), t.temp_cm_name(&config.template_kind)))
                    .collect(),
                resources
                    .cluster_profiles
                    .iter()
                    .map(|p| {
                        (
                            p.cm_name(&config.cluster_profile_prefix),
                            p.temp_cm_name(&config.cluster_profile_kind),
                        )
                    })
                    .collect(),
            )
        } else {
            Default::default()
        };
        Self { config, resources, pr_number, allow_volumes, template_aliases, profile_aliases }
    }

    /// Temporary ConfigMap standing in for template `file`, if redirected.
    pub fn template_alias(&self, file: &str) -> Option<&str> {
        self.template_aliases.get(file).map(String::as_str)
    }

    /// Temporary ConfigMap standing in for cluster-profile ConfigMap `name`.
    pub fn profile_alias(&self, name: &str) -> Option<&str> {
        self.profile_aliases.get(name).map(String::as_str)
    }

    /// Filter and transform every selected job.
    ///
    /// Rejections and per-job failures are collected, never fatal.
    pub fn build(&self, presubmits: &Presubmits, periodics: &[Periodic]) -> RehearsalSet {
        let mut set = RehearsalSet::default();

        for (repo, job) in presubmits.iter() {
            if let Err(reason) = check_presubmit(job, self.allow_volumes, &self.config) {
                tracing::warn!(%repo, job = %job.name(), %reason, "cannot rehearse job");
                set.rejected.push(RejectedJob {
                    repo: Some(repo.to_string()),
                    job: job.name().to_string(),
                    reason,
                });
                continue;
            }
            match self.rehearse_presubmit(repo, job) {
                Ok(rehearsal) => {
                    tracing::info!(
                        %repo,
                        job = %job.name(),
                        rehearsal_job = %rehearsal.name(),
                        "created rehearsal job"
                    );
                    set.presubmits.add(repo, rehearsal);
                }
                Err(error) => {
                    tracing::warn!(%repo, job = %job.name(), %error, "failed to configure rehearsal job");
                    set.failed.push(FailedJob {
                        repo: Some(repo.to_string()),
                        job: job.name().to_string(),
                        error,
                    });
                }
            }
        }

        for job in periodics {
            if let Err(reason) = check_periodic(job, self.allow_volumes, &self.config) {
                tracing::warn!(job = %job.name(), %reason, "cannot rehearse job");
                set.rejected.push(RejectedJob { repo: None, job: job.name().to_string(), reason });
                continue;
            }
            match self.rehearse_periodic(job) {
                Ok(rehearsal) => {
                    tracing::info!(
                        job = %job.name(),
                        rehearsal_job = %rehearsal.name(),
                        "created rehearsal job"
                    );
                    set.periodics.push(rehearsal);
                }
                Err(error) => {
                    tracing::warn!(job = %job.name(), %error, "failed to configure rehearsal job");
                    set.failed.push(FailedJob { repo: None, job: job.name().to_string(), error });
                }
            }
        }
        set
    }

    /// Transform one presubmit, skipping the eligibility check.
    pub fn rehearse_presubmit(&self, repo: &str, job: &Presubmit) -> Result<Presubmit, BuildError> {
        let mut rehearsal = job.to_rehearsal(repo, self.pr_number, &self.config);
        self.configure(&mut rehearsal.base)?;
        Ok(rehearsal)
    }

    /// Transform one periodic, skipping the eligibility check.
    pub fn rehearse_periodic(&self, job: &Periodic) -> Result<Periodic, BuildError> {
        let mut rehearsal = job.to_rehearsal(self.pr_number, &self.config);
        self.configure(&mut rehearsal.base)?;
        Ok(rehearsal)
    }

    fn configure(&self, job: &mut JobBase) -> Result<(), BuildError> {
        self.inline_build_configs(job)?;
        if self.allow_volumes {
            if let Some(spec) = job.spec.as_mut() {
                self.redirect_shared_resources(spec);
            }
        }
        Ok(())
    }

    /// Replace build-config ConfigMap references with the candidate content.
    fn inline_build_configs(&self, job: &mut JobBase) -> Result<(), BuildError> {
        let name = job.name.clone();
        let Some(container) = job.container_mut() else {
            return Ok(());
        };
        for env in container.env.iter_mut().flatten() {
            let Some(key) = env
                .value_from
                .as_ref()
                .and_then(|source| source.config_map_key_ref.as_ref())
                .filter(|r| self.config.is_build_config_map(&r.name))
                .map(|r| r.key.clone())
            else {
                continue;
            };

            let config = self.resources.build_configs.get(&key).ok_or_else(|| {
                BuildError::MissingBuildConfig { job: name.clone(), key: key.clone() }
            })?;
            let content = config
                .to_yaml()
                .map_err(|source| BuildError::Serialize { key: key.clone(), source })?;
            tracing::debug!(job = %name, build_config = %key, "inlining build config");
            env.value = Some(content);
            env.value_from = None;
        }
        Ok(())
    }

    fn redirect_shared_resources(&self, spec: &mut PodSpec) {
        let mounts = spec
            .containers
            .first()
            .and_then(|c| c.volume_mounts.clone())
            .unwrap_or_default();

        for volume in spec.volumes.iter_mut().flatten() {
            let volume_name = volume.name.clone();
            for mount in mounts.iter().filter(|m| m.name == volume_name) {
                let Some(alias) = mount.sub_path.as_deref().and_then(|p| self.template_alias(p))
                else {
                    continue;
                };
                if let Some(source) = volume.config_map.as_mut() {
                    tracing::debug!(template = %source.name, alias, "redirecting template");
                    source.name = alias.to_string();
                }
            }

            if volume.name != self.config.cluster_profile_volume {
                continue;
            }
            let sources = volume.projected.iter_mut().flat_map(|p| p.sources.iter_mut().flatten());
            for source in sources.filter_map(|s| s.config_map.as_mut()) {
                if let Some(alias) = self.profile_alias(&source.name) {
                    tracing::debug!(profile = %source.name, alias, "redirecting cluster profile");
                    source.name = alias.to_string();
                }
            }
        }
    }
}

/// Pick extra presubmits so every changed template runs once per flavor.
///
/// For each template and flavor not already covered by `selected`, the
/// first rehearsable job in `candidate` (repositories in lexicographic
/// order) that mounts the template with that flavor is picked.
pub fn select_template_jobs(
    templates: &[ConfigMapSource],
    selected: &Presubmits,
    candidate: &Presubmits,
    config: &RehearsalConfig,
) -> Presubmits {
    let mut picked = Presubmits::new();
    for template in templates {
        let file = template.base_name();
        for flavor in &config.flavors {
            let covers = |job: &Presubmit| {
                job.base.spec.as_ref().is_some_and(|spec| {
                    has_cluster_type(spec, &config.flavor_env, flavor) && uses_template(spec, &file)
                })
            };
            let covered = |set: &Presubmits| set.iter().any(|(_, job)| covers(job));
            if covered(selected) || covered(&picked) {
                continue;
            }

            let choice = candidate
                .iter()
                .find(|(repo, job)| {
                    job.base.agent.is_rehearsable()
                        && !selected.contains(repo, job.name())
                        && covers(job)
                });
            if let Some((repo, job)) = choice {
                tracing::info!(
                    %repo,
                    job = %job.name(),
                    template = %file,
                    %flavor,
                    "picking job to rehearse template change"
                );
                picked.add(repo, job.clone());
            }
        }
    }
    picked
}

/// Every rehearsable presubmit in `candidate` that mounts one of the changed
/// cluster `profiles` and is not already in `selected`.
pub fn select_cluster_profile_jobs(
    profiles: &[ConfigMapSource],
    selected: &Presubmits,
    candidate: &Presubmits,
    config: &RehearsalConfig,
) -> Presubmits {
    let mut picked = Presubmits::new();
    for profile in profiles {
        let cm = profile.cm_name(&config.cluster_profile_prefix);
        for (repo, job) in candidate.iter() {
            if !job.base.agent.is_rehearsable()
                || selected.contains(repo, job.name())
                || picked.contains(repo, job.name())
            {
                continue;
            }
            let mounts = job.base.spec.as_ref().is_some_and(|spec| {
                uses_cluster_profile(spec, &config.cluster_profile_volume, &cm)
            });
            if mounts {
                tracing::info!(
                    %repo,
                    job = %job.name(),
                    profile = %profile.name(),
                    "picking job to rehearse cluster profile change"
                );
                picked.add(repo, job.clone());
            }
        }
    }
    picked
}

/// ConfigMaps that must exist under their temporary names before the
/// rehearsal jobs referencing them run, keyed by temporary name.
pub fn temporary_config_maps(
    resources: &SharedResources,
    candidate: &ConfigCorpus,
    config: &RehearsalConfig,
) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut maps = BTreeMap::new();
    for template in &resources.templates {
        let file = template.base_name();
        if let Some(content) = candidate.templates.get(&file) {
            maps.insert(
                template.temp_cm_name(&config.template_kind),
                BTreeMap::from([(file, content.clone())]),
            );
        }
    }
    for profile in &resources.cluster_profiles {
        if let Some(files) = candidate.cluster_profiles.get(&profile.name()) {
            maps.insert(profile.temp_cm_name(&config.cluster_profile_kind), files.clone());
        }
    }
    maps
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
