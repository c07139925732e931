// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-config changes select the jobs that run them.

use crate::prelude::*;

const PERIODICS_FILE: &str = "ci-operator/jobs/org/repo/org-repo-master-periodics.yaml";

fn jobs() -> String {
    presubmits(&format!(
        "{}{}",
        presubmit("unit", "--target=unit", CONFIG_KEY),
        presubmit("e2e", "--target=e2e", CONFIG_KEY)
    ))
}

fn checkout(config: &str) -> Checkout {
    Checkout::empty().file(JOBS_FILE, &jobs()).file(CONFIG_FILE, config)
}

fn rehearsed(out: &Output) -> Vec<String> {
    out.records().iter().map(|r| r["spec"]["job"].as_str().unwrap().to_string()).collect()
}

#[test]
fn changed_test_rehearses_only_its_job() {
    let master = checkout(&build_config("make unit"));
    let candidate = checkout(&build_config("make unit-v2"));

    let out = rehearse(&master, &candidate).passes().stdout_has("commands: make unit-v2");

    assert_eq!(rehearsed(&out), vec!["rehearse-1234-pull-ci-org-repo-master-unit"]);
}

#[test]
fn changed_shared_field_rehearses_every_job() {
    let master = checkout(&build_config("make unit"));
    let candidate = checkout(&build_config("make unit").replace("golang-1.10", "golang-1.11"));

    let out = rehearse(&master, &candidate).passes().stdout_has("tag: golang-1.11");

    assert_eq!(
        rehearsed(&out),
        vec![
            "rehearse-1234-pull-ci-org-repo-master-e2e",
            "rehearse-1234-pull-ci-org-repo-master-unit",
        ]
    );
}

#[test]
fn reformatted_config_rehearses_nothing() {
    let master = checkout(&build_config("make unit"));
    let reordered = "tests:\n- commands: make unit\n  as: unit\n- as: e2e\n  commands: make e2e\n\
                     build_root:\n  image_stream_tag: {name: release, tag: golang-1.10}\n";
    let candidate = checkout(reordered);

    rehearse(&master, &candidate).passes().stdout_eq("");
}

#[test]
fn periodic_using_changed_config_is_rehearsed() {
    let periodic = r#"periodics:
- name: periodic-ci-org-repo-master-e2e
  interval: 24h
  spec:
    containers:
    - name: test
      command: [ci-operator]
      args: [--target=e2e]
      env:
      - name: CONFIG_SPEC
        valueFrom:
          configMapKeyRef:
            name: ci-operator-master-configs
            key: org-repo-master.yaml
"#;
    let master = checkout(&build_config("make unit")).file(PERIODICS_FILE, periodic);
    let e2e_changed = build_config("make unit").replace("make e2e", "make e2e-v2");
    let candidate = checkout(&e2e_changed).file(PERIODICS_FILE, periodic);

    let out = rehearse(&master, &candidate).passes();

    assert_eq!(
        rehearsed(&out),
        vec![
            "rehearse-1234-periodic-ci-org-repo-master-e2e",
            "rehearse-1234-pull-ci-org-repo-master-e2e",
        ]
    );
    let periodic_record = &out.records()[0];
    assert_eq!(periodic_record["spec"]["type"], serde_yaml::Value::from("periodic"));
    assert!(periodic_record["spec"]["refs"].is_null());
}
