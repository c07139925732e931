// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers: a builder around the binary and throwaway checkouts.

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

pub const PR: &str = "1234";

pub fn cli() -> Cli {
    let mut cmd = Command::cargo_bin("pj-rehearse").unwrap();
    cmd.env_remove("PJR_NAMESPACE").env_remove("PJR_WATCH_TIMEOUT_MS").env("PJR_LOG", "warn");
    Cli { cmd }
}

/// Dry-run invocation comparing `master` against `candidate`.
pub fn rehearse(master: &Checkout, candidate: &Checkout) -> Cli {
    cli().args(&[
        "--dry-run",
        "--pr-number",
        PR,
        "--master-path",
        master.path_str(),
        "--candidate-path",
        candidate.path_str(),
    ])
}

pub struct Cli {
    cmd: Command,
}

impl Cli {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn passes(self) -> Output {
        self.exits_with(0)
    }

    pub fn exits_with(mut self, code: i32) -> Output {
        let output = self.cmd.output().unwrap();
        let out = Output {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        assert_eq!(
            output.status.code(),
            Some(code),
            "unexpected exit status\nstdout:\n{}\nstderr:\n{}",
            out.stdout,
            out.stderr
        );
        out
    }
}

pub struct Output {
    pub stdout: String,
    pub stderr: String,
}

impl Output {
    pub fn stdout_has(self, expected: &str) -> Self {
        assert!(self.stdout.contains(expected), "stdout missing {:?}:\n{}", expected, self.stdout);
        self
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout, expected);
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        assert!(self.stderr.contains(expected), "stderr missing {:?}:\n{}", expected, self.stderr);
        self
    }

    /// Rehearsal records from the first YAML document on stdout.
    pub fn records(&self) -> Vec<serde_yaml::Value> {
        self.documents().into_iter().next().map_or_else(Vec::new, |doc| {
            serde_yaml::from_value(doc).unwrap()
        })
    }

    /// Every YAML document on stdout.
    pub fn documents(&self) -> Vec<serde_yaml::Value> {
        use serde::Deserialize;
        if self.stdout.trim().is_empty() {
            return Vec::new();
        }
        serde_yaml::Deserializer::from_str(&self.stdout)
            .map(|doc| serde_yaml::Value::deserialize(doc).unwrap())
            .collect()
    }
}

/// A release-repository checkout in a temporary directory.
pub struct Checkout {
    dir: TempDir,
}

impl Checkout {
    pub fn empty() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    pub fn file(self, rel: &str, content: &str) -> Self {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        self
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_str(&self) -> &str {
        self.dir.path().to_str().unwrap()
    }
}

/// Presubmit job file for `org/repo` with the given jobs section body.
pub fn presubmits(jobs: &str) -> String {
    format!("presubmits:\n  org/repo:\n{}", jobs)
}

/// One `ci-operator` presubmit reading its build config from `key`.
pub fn presubmit(test: &str, args: &str, key: &str) -> String {
    format!(
        r#"  - name: pull-ci-org-repo-master-{test}
    agent: kubernetes
    always_run: true
    branches:
    - master
    context: ci/prow/{test}
    rerun_command: /test {test}
    spec:
      containers:
      - name: test
        image: ci-operator:latest
        command:
        - ci-operator
        args:
        - {args}
        env:
        - name: CONFIG_SPEC
          valueFrom:
            configMapKeyRef:
              name: ci-operator-master-configs
              key: {key}
"#
    )
}

pub const JOBS_FILE: &str = "ci-operator/jobs/org/repo/org-repo-master-presubmits.yaml";
pub const CONFIG_KEY: &str = "org-repo-master.yaml";
pub const CONFIG_FILE: &str = "ci-operator/config/org/repo/org-repo-master.yaml";

pub fn build_config(unit_commands: &str) -> String {
    format!(
        r#"build_root:
  image_stream_tag:
    name: release
    tag: golang-1.10
tests:
- as: unit
  commands: {unit_commands}
- as: e2e
  commands: make e2e
"#
    )
}
