// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run configuration for a rehearsal.
//!
//! Every naming convention the rehearsal machinery relies on (label keys,
//! prefixes, the rehearsable binary) lives here and is threaded explicitly
//! through the builder and the coordinator, so two runs can use distinct
//! namespaces.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading a [`RehearsalConfig`] file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RehearsalConfig {
    /// Label stamped on every rehearsal job; value is the pull-request number.
    pub label_key: String,
    /// Label marking the temporary ConfigMaps a run publishes.
    pub resource_label_key: String,
    /// Prefix for rehearsal job names (`<prefix>-<pr>-<name>`).
    pub name_prefix: String,
    /// Context prefix of production presubmits.
    pub production_context_prefix: String,
    /// Context prefix of rehearsal presubmits.
    pub rehearsal_context_prefix: String,
    pub rerun_command: String,
    /// The only command a rehearsable job may run.
    pub command: String,
    /// Argument that pins the source revision under test.
    pub git_ref_arg: String,
    /// Build-config ConfigMaps are named `<prefix>...<suffix>`.
    pub build_config_map_prefix: String,
    pub build_config_map_suffix: String,
    /// Job name prefixes stripped when deriving a test name.
    pub presubmit_name_prefix: String,
    pub periodic_name_prefix: String,
    /// Env var carrying the infrastructure flavor of a job.
    pub flavor_env: String,
    pub cluster_profile_volume: String,
    pub cluster_profile_prefix: String,
    pub template_kind: String,
    pub cluster_profile_kind: String,
    /// Flavors exercised when a shared template changes.
    pub flavors: Vec<String>,
}

impl Default for RehearsalConfig {
    fn default() -> Self {
        Self {
            label_key: "ci.openshift.org/rehearse".to_string(),
            resource_label_key: "ci.openshift.org/rehearse-resource".to_string(),
            name_prefix: "rehearse".to_string(),
            production_context_prefix: "ci/prow/".to_string(),
            rehearsal_context_prefix: "ci/rehearse".to_string(),
            rerun_command: "/test pj-rehearse".to_string(),
            command: "ci-operator".to_string(),
            git_ref_arg: "--git-ref".to_string(),
            build_config_map_prefix: "ci-operator-".to_string(),
            build_config_map_suffix: "configs".to_string(),
            presubmit_name_prefix: "pull-ci-".to_string(),
            periodic_name_prefix: "periodic-ci-".to_string(),
            flavor_env: "CLUSTER_TYPE".to_string(),
            cluster_profile_volume: "cluster-profile".to_string(),
            cluster_profile_prefix: "cluster-profile-".to_string(),
            template_kind: "template".to_string(),
            cluster_profile_kind: "cluster-profile".to_string(),
            flavors: ["aws", "gcs", "openstack", "libvirt", "vsphere", "gcp"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl RehearsalConfig {
    crate::setters! {
        label_key: into String,
        name_prefix: into String,
        resource_label_key: into String,
        command: into String,
        flavor_env: into String,
        flavors: set Vec<String>,
    }

    /// Load overrides from a TOML file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Name of the rehearsal copy of `name` for pull request `pr_number`.
    pub fn rehearsal_name(&self, pr_number: u64, name: &str) -> String {
        format!("{}-{}-{}", self.name_prefix, pr_number, name)
    }

    /// Label selector matching every job of one rehearsal run.
    pub fn label_selector(&self, pr_number: u64) -> String {
        format!("{}={}", self.label_key, pr_number)
    }

    pub fn is_build_config_map(&self, name: &str) -> bool {
        name.len() >= self.build_config_map_prefix.len() + self.build_config_map_suffix.len()
            && name.starts_with(&self.build_config_map_prefix)
            && name.ends_with(&self.build_config_map_suffix)
    }

    /// True when `arg` already sets the source revision, in either flag spelling.
    pub fn overrides_git_ref(&self, arg: &str) -> bool {
        let bare = self.git_ref_arg.trim_start_matches('-');
        let single = format!("-{}", bare);
        let double = format!("--{}", bare);
        arg.starts_with(&double) || arg.starts_with(&single)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
