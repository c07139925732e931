// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build configurations: named test steps plus a promotion policy.
//!
//! Only the fields the rehearsal machinery reasons about are typed; every
//! other field is kept as a decoded YAML value so equality stays structural
//! (key order and formatting never register as a change).

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Build configs keyed by their storage key (file name).
pub type BuildConfigs = BTreeMap<String, BuildConfig>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tests: Vec<TestStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PromotionConfig>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl BuildConfig {
    pub fn test(&self, name: &str) -> Option<&TestStep> {
        self.tests.iter().find(|t| t.name == name)
    }

    /// Copy of this config with its test steps cleared.
    pub fn without_tests(&self) -> Self {
        Self { tests: Vec::new(), ..self.clone() }
    }

    /// Serialized form handed to a rehearsal job in place of the live ConfigMap.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}

/// One named test step; names are unique within a [`BuildConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    #[serde(rename = "as")]
    pub name: String,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl TestStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), other: BTreeMap::new() }
    }

    pub fn commands(mut self, commands: impl Into<String>) -> Self {
        self.other.insert("commands".to_string(), Value::String(commands.into()));
        self
    }
}

/// Where built images are promoted after merge
///
/// `tag`, `additional_images`, `excluded_images` and the like ride in `other`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromotionConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

#[cfg(test)]
#[path = "build_config_tests.rs"]
mod tests;
