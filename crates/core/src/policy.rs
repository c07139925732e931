// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure predicates over build configs and job specs.
//!
//! The spec matchers (`has_cluster_type`, `uses_template`,
//! `uses_cluster_profile`) drive supplementary job selection. The promotion
//! and release-branch helpers are library API for callers that decide where
//! a config's images land; the rehearsal pipeline itself never promotes.

use crate::build_config::BuildConfig;
use k8s_openapi::api::core::v1::PodSpec;
use thiserror::Error;

const OKD_NAMESPACE: &str = "openshift";
const OKD_IMAGESTREAM: &str = "origin-v4.0";
const OCP_NAMESPACE: &str = "ocp";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid branch {0:?} promoting to current release")]
pub struct BranchError(pub String);

pub fn is_promotion_disabled(config: &BuildConfig) -> bool {
    config.promotion.as_ref().is_some_and(|p| p.disabled)
}

/// Whether the config builds images that feed the official release payload.
pub fn builds_official_images(config: &BuildConfig) -> bool {
    let Some(promotion) = config.promotion.as_ref() else {
        return false;
    };
    (promotion.namespace == OKD_NAMESPACE && promotion.name == OKD_IMAGESTREAM)
        || promotion.namespace == OCP_NAMESPACE
}

pub fn promotes_official_images(config: &BuildConfig) -> bool {
    !is_promotion_disabled(config) && builds_official_images(config)
}

/// Branch that will track `future` once `branch` stops promoting to `current`.
pub fn determine_release_branch(
    current: &str,
    future: &str,
    branch: &str,
) -> Result<String, BranchError> {
    if branch == "master" {
        Ok(format!("release-{}", future))
    } else if branch == format!("openshift-{}", current) {
        Ok(format!("openshift-{}", future))
    } else {
        Err(BranchError(branch.to_string()))
    }
}

/// Release flavor of a branch: `master`, `3.x`, `4.N`, or `misc`.
pub fn flavor_for_branch(branch: &str) -> String {
    if branch == "master" {
        return "master".to_string();
    }
    let Some(version) = ["release-", "enterprise-", "openshift-"]
        .iter()
        .find_map(|prefix| branch.strip_prefix(prefix))
    else {
        return "misc".to_string();
    };
    let Some((major, minor)) = version.split_once('.') else {
        return "misc".to_string();
    };
    if minor.is_empty() || !minor.bytes().all(|b| b.is_ascii_digit()) {
        return "misc".to_string();
    }
    match major {
        "3" => "3.x".to_string(),
        "4" => version.to_string(),
        _ => "misc".to_string(),
    }
}

/// Whether the pod spec sets env var `env` to the literal `flavor`.
pub fn has_cluster_type(spec: &PodSpec, env: &str, flavor: &str) -> bool {
    spec.containers
        .first()
        .and_then(|c| c.env.as_ref())
        .is_some_and(|vars| vars.iter().any(|e| e.name == env && e.value.as_deref() == Some(flavor)))
}

/// Whether the pod spec mounts the shared template `file` (by sub-path).
pub fn uses_template(spec: &PodSpec, file: &str) -> bool {
    spec.containers
        .first()
        .and_then(|c| c.volume_mounts.as_ref())
        .is_some_and(|mounts| mounts.iter().any(|m| m.sub_path.as_deref() == Some(file)))
}

/// Whether the projected volume `volume` pulls in the ConfigMap `config_map`.
pub fn uses_cluster_profile(spec: &PodSpec, volume: &str, config_map: &str) -> bool {
    spec.volumes
        .iter()
        .flatten()
        .filter(|v| v.name == volume)
        .filter_map(|v| v.projected.as_ref()?.sources.as_ref())
        .flatten()
        .any(|s| s.config_map.as_ref().is_some_and(|cm| cm.name == config_map))
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
