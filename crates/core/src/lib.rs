// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rehearse-core: data model and policy for rehearsing CI job changes

pub mod macros;

pub mod build_config;
pub mod config;
pub mod corpus;
pub mod job;
pub mod metrics;
pub mod policy;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use build_config::{BuildConfig, BuildConfigs, PromotionConfig, TestStep};
pub use config::{ConfigError, RehearsalConfig};
pub use corpus::{sha256_hex, ConfigCorpus, ConfigMapSource, ProfileFiles};
pub use job::{AgentKind, JobBase, Periodic, Presubmit, Presubmits, Pull, Refs};
pub use metrics::ExecutionMetrics;
pub use policy::{
    builds_official_images, determine_release_branch, flavor_for_branch, is_promotion_disabled,
    promotes_official_images, BranchError,
};
