// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dry-run specs: which presubmits are rehearsed and what they look like.

use crate::prelude::*;
use serde_yaml::Value;

fn checkout(jobs: &str) -> Checkout {
    Checkout::empty()
        .file(JOBS_FILE, &presubmits(jobs))
        .file(CONFIG_FILE, &build_config("make unit"))
}

fn unit(args: &str) -> String {
    presubmit("unit", args, CONFIG_KEY)
}

fn env_var<'a>(record: &'a Value, name: &str) -> &'a Value {
    record["spec"]["pod_spec"]["containers"][0]["env"]
        .as_sequence()
        .unwrap()
        .iter()
        .find(|e| e["name"] == Value::from(name))
        .unwrap()
}

#[test]
fn unchanged_checkouts_rehearse_nothing() {
    let master = checkout(&unit("--target=unit"));
    let candidate = checkout(&unit("--target=unit"));

    rehearse(&master, &candidate).passes().stdout_eq("");
}

#[test]
fn changed_presubmit_is_rehearsed() {
    let master = checkout(&unit("--target=unit"));
    let candidate = checkout(&unit("--target=unit-v2"));

    let out = rehearse(&master, &candidate).passes();
    let records = out.records();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record["apiVersion"], Value::from("prow.k8s.io/v1"));
    assert_eq!(record["kind"], Value::from("ProwJob"));
    assert_eq!(record["spec"]["type"], Value::from("presubmit"));
    assert_eq!(record["spec"]["job"], Value::from("rehearse-1234-pull-ci-org-repo-master-unit"));
    assert_eq!(record["spec"]["namespace"], Value::from("ci"));
    assert_eq!(record["spec"]["context"], Value::from("ci/rehearse/org/repo/master/unit"));
    assert_eq!(record["spec"]["rerun_command"], Value::from("/test pj-rehearse"));
    assert_eq!(record["spec"]["refs"]["pulls"][0]["number"], Value::from(1234));
    assert_eq!(record["metadata"]["labels"]["ci.openshift.org/rehearse"], Value::from("1234"));
    assert_eq!(record["status"]["state"], Value::from("triggered"));

    let args = record["spec"]["pod_spec"]["containers"][0]["args"].as_sequence().unwrap();
    assert_eq!(
        args,
        &vec![Value::from("--target=unit-v2"), Value::from("--git-ref=org/repo@master")]
    );

    let config = env_var(record, "CONFIG_SPEC");
    assert!(config["valueFrom"].is_null());
    assert!(config["value"].as_str().unwrap().contains("commands: make unit"));
}

#[test]
fn records_are_sorted_by_job_name() {
    let master = checkout(&format!(
        "{}{}",
        unit("--target=unit"),
        presubmit("e2e", "--target=e2e", CONFIG_KEY)
    ));
    let candidate = checkout(&format!(
        "{}{}",
        unit("--target=unit-v2"),
        presubmit("e2e", "--target=e2e-v2", CONFIG_KEY)
    ));

    let records = rehearse(&master, &candidate).passes().records();

    let jobs: Vec<_> = records.iter().map(|r| r["spec"]["job"].as_str().unwrap()).collect();
    assert_eq!(
        jobs,
        vec![
            "rehearse-1234-pull-ci-org-repo-master-e2e",
            "rehearse-1234-pull-ci-org-repo-master-unit",
        ]
    );
}

#[test]
fn namespace_flag_is_used() {
    let master = checkout(&unit("--target=unit"));
    let candidate = checkout(&unit("--target=unit-v2"));

    let records =
        rehearse(&master, &candidate).args(&["--namespace", "rehearsals"]).passes().records();

    assert_eq!(records[0]["spec"]["namespace"], Value::from("rehearsals"));
}

#[test]
fn non_rehearsable_job_is_skipped() {
    let master = checkout(&unit("--target=unit"));
    let candidate = checkout(&unit("--target=unit-v2").replace("- ci-operator", "- make"));

    rehearse(&master, &candidate).passes().stdout_eq("");
}

#[test]
fn missing_build_config_fails_the_rehearsal() {
    let master = checkout(&unit("--target=unit"));
    let candidate = checkout(&presubmit("unit", "--target=unit-v2", "org-repo-release.yaml"));

    rehearse(&master, &candidate).exits_with(1).stderr_has("1 rehearsal job(s) failed");
}

#[test]
fn malformed_candidate_is_an_infrastructure_failure() {
    let master = checkout(&unit("--target=unit"));
    let candidate = Checkout::empty().file(JOBS_FILE, "presubmits: [not, a, map]\n");

    rehearse(&master, &candidate)
        .exits_with(2)
        .stderr_has("failed to load candidate configuration");
}

#[test]
fn dry_run_writes_empty_metrics() {
    let master = checkout(&unit("--target=unit"));
    let candidate = checkout(&unit("--target=unit-v2"));
    let metrics = master.path().join("metrics.json");

    rehearse(&master, &candidate)
        .args(&["--metrics-output", metrics.to_str().unwrap()])
        .passes();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&metrics).unwrap()).unwrap();
    assert_eq!(written, serde_json::json!({"submitted": [], "passed": [], "failed": []}));
}
