// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CI job definitions: presubmits and periodics.
//!
//! Field names follow the declarative job files (`name`, `agent`, `branches`,
//! `context`, `spec`, ...). The execution spec is a Kubernetes `PodSpec`
//! holding exactly one container.

use crate::config::RehearsalConfig;
use k8s_openapi::api::core::v1::{Container, PodSpec};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Execution agent of a job. Only [`AgentKind::Kubernetes`] jobs can be rehearsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AgentKind {
    #[default]
    Kubernetes,
    Jenkins,
    Other(String),
}

impl AgentKind {
    pub fn is_rehearsable(&self) -> bool {
        matches!(self, AgentKind::Kubernetes)
    }

    pub fn as_str(&self) -> &str {
        match self {
            AgentKind::Kubernetes => "kubernetes",
            AgentKind::Jenkins => "jenkins",
            AgentKind::Other(s) => s,
        }
    }
}

impl From<String> for AgentKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | "kubernetes" => AgentKind::Kubernetes,
            "jenkins" => AgentKind::Jenkins,
            _ => AgentKind::Other(s),
        }
    }
}

impl From<AgentKind> for String {
    fn from(kind: AgentKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by every job flavor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobBase {
    pub name: String,
    #[serde(default)]
    pub agent: AgentKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<PodSpec>,
    /// Job-file fields not modelled here (`decorate`, `cluster`, ...).
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl JobBase {
    /// The single execution container, if the job has a spec.
    pub fn container(&self) -> Option<&Container> {
        self.spec.as_ref().and_then(|s| s.containers.first())
    }

    pub fn container_mut(&mut self) -> Option<&mut Container> {
        self.spec.as_mut().and_then(|s| s.containers.first_mut())
    }

    /// Build-config keys this job reads through the build-config ConfigMaps.
    pub fn build_config_keys(&self, config: &RehearsalConfig) -> BTreeSet<String> {
        self.container()
            .and_then(|c| c.env.as_ref())
            .into_iter()
            .flatten()
            .filter_map(|env| env.value_from.as_ref()?.config_map_key_ref.as_ref())
            .filter(|r| config.is_build_config_map(&r.name))
            .map(|r| r.key.clone())
            .collect()
    }

    /// Literal value of the env var `name`, if set without an external reference.
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.container()?
            .env
            .as_ref()?
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.value.as_deref())
    }

    fn rehearsal_stamp(&mut self, config: &RehearsalConfig, pr_number: u64) {
        self.name = config.rehearsal_name(pr_number, &self.name);
        self.labels.insert(config.label_key.clone(), pr_number.to_string());
    }
}

/// Job triggered for every pull request against matching branches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presubmit {
    #[serde(flatten)]
    pub base: JobBase,
    #[serde(default)]
    pub always_run: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
    #[serde(default)]
    pub context: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub trigger: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rerun_command: String,
}

impl Presubmit {
    pub fn name(&self) -> &str {
        &self.base.name
    }

    /// The single branch this job targets with regex anchors removed.
    ///
    /// `None` unless exactly one branch pattern is configured.
    pub fn branch(&self) -> Option<&str> {
        match self.branches.as_slice() {
            [only] => Some(only.trim_start_matches('^').trim_end_matches('$')),
            _ => None,
        }
    }

    /// Clone this job into its rehearsal variant.
    ///
    /// The source is left untouched; the returned copy is renamed, labelled,
    /// made optional, and pinned to `repo@branch`.
    pub fn to_rehearsal(&self, repo: &str, pr_number: u64, config: &RehearsalConfig) -> Self {
        let mut rehearsal = self.clone();
        rehearsal.base.rehearsal_stamp(config, pr_number);

        let branch = self.branch().unwrap_or_default();
        let short = self
            .context
            .strip_prefix(config.production_context_prefix.as_str())
            .unwrap_or(&self.context);
        rehearsal.context =
            format!("{}/{}/{}/{}", config.rehearsal_context_prefix, repo, branch, short);
        rehearsal.rerun_command = config.rerun_command.clone();
        rehearsal.optional = true;

        if let Some(container) = rehearsal.base.container_mut() {
            container
                .args
                .get_or_insert_with(Vec::new)
                .push(format!("{}={}@{}", config.git_ref_arg, repo, branch));
        }
        rehearsal
    }
}

/// Job triggered on a schedule, outside any pull request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Periodic {
    #[serde(flatten)]
    pub base: JobBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    /// Repositories cloned for the job; periodics have no triggering refs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_refs: Vec<Refs>,
}

impl Periodic {
    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn to_rehearsal(&self, pr_number: u64, config: &RehearsalConfig) -> Self {
        let mut rehearsal = self.clone();
        rehearsal.base.rehearsal_stamp(config, pr_number);
        rehearsal
    }
}

/// Git references a job checks out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Refs {
    pub org: String,
    pub repo: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_ref: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_sha: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pulls: Vec<Pull>,
    /// Clone options such as `path_alias` and `workdir`.
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pull {
    pub number: u64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub sha: String,
}

/// Presubmits grouped by the repository (`org/repo`) they run against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Presubmits(BTreeMap<String, Vec<Presubmit>>);

impl Presubmits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, repo: impl Into<String>, job: Presubmit) {
        self.0.entry(repo.into()).or_default().push(job);
    }

    /// Add every job of `other` not already present under the same repo and name.
    pub fn merge(&mut self, other: Presubmits) {
        for (repo, job) in other.into_jobs() {
            if !self.contains(&repo, job.name()) {
                self.add(repo, job);
            }
        }
    }

    pub fn contains(&self, repo: &str, name: &str) -> bool {
        self.0.get(repo).is_some_and(|jobs| jobs.iter().any(|j| j.name() == name))
    }

    pub fn get(&self, repo: &str, name: &str) -> Option<&Presubmit> {
        self.0.get(repo)?.iter().find(|j| j.name() == name)
    }

    /// Repositories in lexicographic order.
    pub fn repos(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn jobs(&self, repo: &str) -> &[Presubmit] {
        self.0.get(repo).map(Vec::as_slice).unwrap_or_default()
    }

    /// All `(repo, job)` pairs, repositories in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Presubmit)> {
        self.0.iter().flat_map(|(repo, jobs)| jobs.iter().map(move |j| (repo.as_str(), j)))
    }

    pub fn into_jobs(self) -> impl Iterator<Item = (String, Presubmit)> {
        self.0.into_iter().flat_map(|(repo, jobs)| jobs.into_iter().map(move |j| (repo.clone(), j)))
    }

    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lookup table `repo -> name -> job`.
    pub fn index(&self) -> BTreeMap<&str, BTreeMap<&str, &Presubmit>> {
        let mut index: BTreeMap<&str, BTreeMap<&str, &Presubmit>> = BTreeMap::new();
        for (repo, job) in self.iter() {
            index.entry(repo).or_default().insert(job.name(), job);
        }
        index
    }
}

impl FromIterator<(String, Presubmit)> for Presubmits {
    fn from_iter<I: IntoIterator<Item = (String, Presubmit)>>(iter: I) -> Self {
        let mut presubmits = Presubmits::new();
        for (repo, job) in iter {
            presubmits.add(repo, job);
        }
        presubmits
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
