// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders and proptest strategies shared across crates.

use crate::build_config::{BuildConfig, TestStep};
use crate::job::{AgentKind, JobBase, Periodic, Presubmit};
use k8s_openapi::api::core::v1::{
    ConfigMapKeySelector, ConfigMapProjection, ConfigMapVolumeSource, Container, EnvVar,
    EnvVarSource, PodSpec, ProjectedVolumeSource, Volume, VolumeMount, VolumeProjection,
};

/// Builder for the single-container spec of a CI job.
#[derive(Debug, Clone)]
pub struct SpecBuilder {
    container: Container,
    volumes: Vec<Volume>,
}

impl Default for SpecBuilder {
    fn default() -> Self {
        Self {
            container: Container {
                name: "test".to_string(),
                image: Some("ci-operator:latest".to_string()),
                command: Some(vec!["ci-operator".to_string()]),
                args: Some(vec!["--artifact-dir=$(ARTIFACTS)".to_string()]),
                ..Default::default()
            },
            volumes: Vec::new(),
        }
    }
}

impl SpecBuilder {
    pub fn command(mut self, command: &[&str]) -> Self {
        self.container.command = Some(command.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.container.args.get_or_insert_with(Vec::new).push(arg.to_string());
        self
    }

    pub fn env(mut self, name: &str, value: &str) -> Self {
        self.container.env.get_or_insert_with(Vec::new).push(EnvVar {
            name: name.to_string(),
            value: Some(value.to_string()),
            ..Default::default()
        });
        self
    }

    /// Read `key` from the shared build-config ConfigMap into `CONFIG_SPEC`.
    pub fn build_config(self, key: &str) -> Self {
        self.config_map_env("CONFIG_SPEC", "ci-operator-configs", key)
    }

    pub fn config_map_env(mut self, name: &str, config_map: &str, key: &str) -> Self {
        self.container.env.get_or_insert_with(Vec::new).push(EnvVar {
            name: name.to_string(),
            value_from: Some(EnvVarSource {
                config_map_key_ref: Some(ConfigMapKeySelector {
                    name: config_map.to_string(),
                    key: key.to_string(),
                    optional: None,
                }),
                ..Default::default()
            }),
            ..Default::default()
        });
        self
    }

    /// Mount shared template `file` from ConfigMap `prow-job-<stem>`.
    pub fn template(mut self, file: &str) -> Self {
        let stem = file.trim_end_matches(".yaml");
        let volume = format!("job-definition-{}", stem);
        self.container.volume_mounts.get_or_insert_with(Vec::new).push(VolumeMount {
            name: volume.clone(),
            mount_path: format!("/tmp/{}", file),
            sub_path: Some(file.to_string()),
            ..Default::default()
        });
        self.volumes.push(Volume {
            name: volume,
            config_map: Some(ConfigMapVolumeSource {
                name: format!("prow-job-{}", stem),
                ..Default::default()
            }),
            ..Default::default()
        });
        self
    }

    /// Project cluster profile `profile` into the `cluster-profile` volume.
    pub fn cluster_profile(mut self, profile: &str) -> Self {
        self.container.volume_mounts.get_or_insert_with(Vec::new).push(VolumeMount {
            name: "cluster-profile".to_string(),
            mount_path: "/usr/local/cluster-profile".to_string(),
            ..Default::default()
        });
        self.volumes.push(Volume {
            name: "cluster-profile".to_string(),
            projected: Some(ProjectedVolumeSource {
                sources: Some(vec![VolumeProjection {
                    config_map: Some(ConfigMapProjection {
                        name: format!("cluster-profile-{}", profile),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        });
        self
    }

    pub fn build(self) -> PodSpec {
        PodSpec {
            containers: vec![self.container],
            volumes: if self.volumes.is_empty() { None } else { Some(self.volumes) },
            service_account_name: Some("ci-operator".to_string()),
            ..Default::default()
        }
    }
}

pub fn spec() -> SpecBuilder {
    SpecBuilder::default()
}

/// Builder for presubmits with production-like defaults.
#[derive(Debug, Clone)]
pub struct PresubmitBuilder {
    job: Presubmit,
}

impl PresubmitBuilder {
    pub fn agent(mut self, agent: AgentKind) -> Self {
        self.job.base.agent = agent;
        self
    }

    pub fn branches(mut self, branches: &[&str]) -> Self {
        self.job.branches = branches.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn context(mut self, context: &str) -> Self {
        self.job.context = context.to_string();
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.job.base.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn spec(mut self, spec: SpecBuilder) -> Self {
        self.job.base.spec = Some(spec.build());
        self
    }

    pub fn no_spec(mut self) -> Self {
        self.job.base.spec = None;
        self
    }

    pub fn build(self) -> Presubmit {
        self.job
    }
}

pub fn presubmit(name: &str) -> PresubmitBuilder {
    let test = name.rsplit('-').next().unwrap_or(name);
    PresubmitBuilder {
        job: Presubmit {
            base: JobBase {
                name: name.to_string(),
                agent: AgentKind::Kubernetes,
                spec: Some(spec().build()),
                ..Default::default()
            },
            always_run: true,
            branches: vec!["master".to_string()],
            context: format!("ci/prow/{}", test),
            rerun_command: format!("/test {}", test),
            trigger: format!("(?m)^/test (?:.*? )?{}(?: .*?)?$", test),
            ..Default::default()
        },
    }
}

pub fn periodic(name: &str, spec: SpecBuilder) -> Periodic {
    Periodic {
        base: JobBase {
            name: name.to_string(),
            agent: AgentKind::Kubernetes,
            spec: Some(spec.build()),
            ..Default::default()
        },
        interval: Some("24h".to_string()),
        ..Default::default()
    }
}

/// Build config with one `commands` test step per `(name, commands)` pair.
pub fn build_config(tests: &[(&str, &str)]) -> BuildConfig {
    let mut config = BuildConfig {
        tests: tests.iter().map(|(name, cmd)| TestStep::new(*name).commands(*cmd)).collect(),
        ..Default::default()
    };
    config.other.insert(
        "build_root".to_string(),
        serde_yaml::Value::String("openshift/release:golang-1.10".to_string()),
    );
    config
}

pub mod strategies {
    use super::*;
    use crate::job::Presubmits;
    use crate::BuildConfigs;
    use proptest::prelude::*;

    fn arb_spec() -> impl Strategy<Value = SpecBuilder> {
        (
            proptest::collection::vec("--[a-z]{1,6}=[a-z0-9]{0,6}", 0..3),
            proptest::option::of("[a-z]{1,8}"),
            proptest::option::of(prop_oneof![Just("aws"), Just("gcp"), Just("libvirt")]),
        )
            .prop_map(|(args, config_key, flavor)| {
                let mut spec = spec();
                for arg in &args {
                    spec = spec.arg(arg);
                }
                if let Some(key) = config_key {
                    spec = spec.build_config(&format!("{}.yaml", key));
                }
                if let Some(flavor) = flavor {
                    spec = spec.env("CLUSTER_TYPE", flavor);
                }
                spec
            })
    }

    pub fn arb_presubmit() -> impl Strategy<Value = Presubmit> {
        (
            "pull-ci-[a-z]{1,6}-[a-z]{1,6}",
            prop_oneof![Just(AgentKind::Kubernetes), Just(AgentKind::Jenkins)],
            proptest::collection::vec(prop_oneof![Just("master"), Just("^release-4\\.1$")], 0..3),
            arb_spec(),
        )
            .prop_map(|(name, agent, branches, spec)| {
                presubmit(&name).agent(agent).branches(&branches).spec(spec).build()
            })
    }

    pub fn arb_presubmits() -> impl Strategy<Value = Presubmits> {
        proptest::collection::vec(
            (prop_oneof![Just("org/a"), Just("org/b")], arb_presubmit()),
            0..6,
        )
        .prop_map(|pairs| {
            let mut presubmits = Presubmits::new();
            for (repo, job) in pairs {
                if !presubmits.contains(repo, job.name()) {
                    presubmits.add(repo, job);
                }
            }
            presubmits
        })
    }

    pub fn arb_build_configs() -> impl Strategy<Value = BuildConfigs> {
        proptest::collection::btree_map(
            "[a-z]{1,4}-[a-z]{1,4}-master\\.yaml",
            proptest::collection::btree_map("[a-z]{1,6}", "[a-z ]{0,12}", 0..4).prop_map(|steps| {
                let pairs: Vec<(&str, &str)> =
                    steps.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
                build_config(&pairs)
            }),
            0..4,
        )
    }
}
