// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Loading a [`ConfigCorpus`] from a release-repository checkout.
//!
//! Layout under the checkout root:
//!
//! ```text
//! ci-operator/jobs/**/*.yaml        presubmits and periodics
//! ci-operator/config/**/*.yaml      build configs, keyed by file name
//! ci-operator/templates/**/*.yaml   shared templates, keyed by file name
//! cluster/test-deploy/<profile>/*   cluster profile files
//! ```

use rehearse_core::{BuildConfig, ConfigCorpus, Periodic, Presubmits, ProfileFiles};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const JOBS_DIR: &str = "ci-operator/jobs";
pub const CONFIG_DIR: &str = "ci-operator/config";
pub const TEMPLATES_DIR: &str = "ci-operator/templates";
pub const CLUSTER_PROFILES_DIR: &str = "cluster/test-deploy";

/// Errors from reading the configuration tree
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("duplicate {kind} {name:?} at {}", path.display())]
    Duplicate { kind: &'static str, name: String, path: PathBuf },
}

/// One job file; other sections (postsubmits, ...) are ignored.
#[derive(Debug, Default, Deserialize)]
struct JobFile {
    #[serde(default)]
    presubmits: Presubmits,
    #[serde(default)]
    periodics: Vec<Periodic>,
}

/// Read every section of the checkout at `root`.
///
/// Missing directories yield empty sections.
pub fn load_corpus(root: &Path) -> Result<ConfigCorpus, SourceError> {
    let mut corpus = ConfigCorpus::default();

    for path in yaml_files(&root.join(JOBS_DIR))? {
        let file: JobFile = parse(&path)?;
        corpus.presubmits.merge(file.presubmits);
        corpus.periodics.extend(file.periodics);
    }

    for path in yaml_files(&root.join(CONFIG_DIR))? {
        let config: BuildConfig = parse(&path)?;
        insert_unique(&mut corpus.build_configs, "build config", &path, config)?;
    }

    for path in yaml_files(&root.join(TEMPLATES_DIR))? {
        let content = read(&path)?;
        insert_unique(&mut corpus.templates, "template", &path, content)?;
    }

    corpus.cluster_profiles = cluster_profiles(&root.join(CLUSTER_PROFILES_DIR))?;

    tracing::debug!(
        root = %root.display(),
        presubmits = corpus.presubmits.len(),
        periodics = corpus.periodics.len(),
        build_configs = corpus.build_configs.len(),
        templates = corpus.templates.len(),
        cluster_profiles = corpus.cluster_profiles.len(),
        "loaded config corpus"
    );
    Ok(corpus)
}

fn read(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|source| SourceError::Io { path: path.to_owned(), source })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let content = read(path)?;
    // An empty document decodes as unit, not as an empty mapping
    let content = if content.trim().is_empty() { "{}" } else { content.as_str() };
    serde_yaml::from_str(content).map_err(|source| SourceError::Parse { path: path.to_owned(), source })
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

fn insert_unique<T>(
    map: &mut BTreeMap<String, T>,
    kind: &'static str,
    path: &Path,
    value: T,
) -> Result<(), SourceError> {
    let name = file_name(path);
    if map.contains_key(&name) {
        return Err(SourceError::Duplicate { kind, name, path: path.to_owned() });
    }
    map.insert(name, value);
    Ok(())
}

/// Recursively collect `.yaml`/`.yml` files under `dir`, sorted by path.
fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let mut files = Vec::new();
    if !dir.is_dir() {
        return Ok(files);
    }
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let entries = std::fs::read_dir(&current)
            .map_err(|source| SourceError::Io { path: current.clone(), source })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml")) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn cluster_profiles(dir: &Path) -> Result<BTreeMap<String, ProfileFiles>, SourceError> {
    let mut profiles = BTreeMap::new();
    if !dir.is_dir() {
        return Ok(profiles);
    }
    let entries =
        std::fs::read_dir(dir).map_err(|source| SourceError::Io { path: dir.to_owned(), source })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let mut files = ProfileFiles::new();
        let profile_entries = std::fs::read_dir(&path)
            .map_err(|source| SourceError::Io { path: path.clone(), source })?;
        for file in profile_entries.flatten() {
            let file_path = file.path();
            let name = file_name(&file_path);
            if file_path.is_file() && !name.starts_with('.') {
                files.insert(name, read(&file_path)?);
            }
        }
        profiles.insert(file_name(&path), files);
    }
    Ok(profiles)
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
