// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Snapshots of the job/config tree and the shared resources jobs mount.

use crate::build_config::BuildConfigs;
use crate::job::{Periodic, Presubmits};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Files of one cluster profile, keyed by file name.
pub type ProfileFiles = BTreeMap<String, String>;

/// Immutable snapshot of one revision of the configuration tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigCorpus {
    pub presubmits: Presubmits,
    pub periodics: Vec<Periodic>,
    pub build_configs: BuildConfigs,
    /// Shared job templates, keyed by file name.
    pub templates: BTreeMap<String, String>,
    /// Cluster profiles, keyed by profile name.
    pub cluster_profiles: BTreeMap<String, ProfileFiles>,
}

/// A shared resource published as a ConfigMap and mounted by jobs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ConfigMapSource {
    /// Template file name or cluster profile name.
    pub filename: PathBuf,
    /// Hex SHA-256 of the content.
    pub sha: String,
}

impl ConfigMapSource {
    pub fn new(filename: impl Into<PathBuf>, sha: impl Into<String>) -> Self {
        Self { filename: filename.into(), sha: sha.into() }
    }

    pub fn for_template(filename: &str, content: &str) -> Self {
        Self::new(filename, sha256_hex(content.as_bytes()))
    }

    pub fn for_profile(name: &str, files: &ProfileFiles) -> Self {
        Self::new(name, profile_sha(files))
    }

    /// Base file name, as referenced by volume mount sub-paths.
    pub fn base_name(&self) -> String {
        self.filename.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
    }

    /// Logical resource name: the file stem.
    pub fn name(&self) -> String {
        Path::new(&self.base_name())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Name of the production ConfigMap holding this resource.
    pub fn cm_name(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.name())
    }

    /// Name of the temporary per-run ConfigMap standing in for this resource.
    pub fn temp_cm_name(&self, kind: &str) -> String {
        let short = self.sha.get(..8).unwrap_or(&self.sha);
        format!("rehearse-{}-{}-{}", kind, self.name(), short)
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

fn profile_sha(files: &ProfileFiles) -> String {
    let mut hasher = Sha256::new();
    for (name, content) in files {
        hasher.update(name.as_bytes());
        hasher.update([0]);
        hasher.update(content.as_bytes());
        hasher.update([0]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[path = "corpus_tests.rs"]
mod tests;
