// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template and cluster-profile changes are rehearsed through temporary
//! ConfigMaps when volumes are allowed.

use crate::prelude::*;
use serde_yaml::Value;

const TEMPLATE_FILE: &str = "ci-operator/templates/cluster-launch-e2e.yaml";
const PROFILE_FILE: &str = "cluster/test-deploy/aws/vars.yaml";

const E2E_AWS: &str = r#"  - name: pull-ci-org-repo-master-e2e-aws
    agent: kubernetes
    branches:
    - master
    context: ci/prow/e2e-aws
    spec:
      containers:
      - name: test
        command:
        - ci-operator
        args:
        - --target=e2e-aws
        env:
        - name: CLUSTER_TYPE
          value: aws
        volumeMounts:
        - name: job-definition
          mountPath: /usr/local/e2e-aws
          subPath: cluster-launch-e2e.yaml
        - name: cluster-profile
          mountPath: /usr/local/cluster-profile
      volumes:
      - name: job-definition
        configMap:
          name: prow-job-cluster-launch-e2e
      - name: cluster-profile
        projected:
          sources:
          - configMap:
              name: cluster-profile-aws
"#;

fn checkout(template: &str, profile: &str) -> Checkout {
    Checkout::empty()
        .file(JOBS_FILE, &presubmits(E2E_AWS))
        .file(TEMPLATE_FILE, template)
        .file(PROFILE_FILE, profile)
}

fn volume<'a>(record: &'a Value, name: &str) -> &'a Value {
    record["spec"]["pod_spec"]["volumes"]
        .as_sequence()
        .unwrap()
        .iter()
        .find(|v| v["name"] == Value::from(name))
        .unwrap()
}

fn config_map_names(doc: &Value) -> Vec<String> {
    doc.as_mapping()
        .unwrap()
        .keys()
        .map(|k| k.as_str().unwrap().to_string())
        .collect()
}

#[test]
fn template_change_redirects_to_temporary_config_map() {
    let master = checkout("kind: Template\n", "region: us-east-1\n");
    let candidate = checkout("kind: Template\nobjects: []\n", "region: us-east-1\n");

    let out = rehearse(&master, &candidate).args(&["--allow-volumes"]).passes();
    let docs = out.documents();
    assert_eq!(docs.len(), 2);

    let records = out.records();
    assert_eq!(records.len(), 1);
    let alias = volume(&records[0], "job-definition")["configMap"]["name"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(alias.starts_with("rehearse-template-cluster-launch-e2e-"), "{}", alias);
    assert_eq!(
        volume(&records[0], "cluster-profile")["projected"]["sources"][0]["configMap"]["name"],
        Value::from("cluster-profile-aws")
    );

    assert_eq!(config_map_names(&docs[1]), vec![alias.clone()]);
    assert_eq!(
        docs[1][alias.as_str()]["cluster-launch-e2e.yaml"],
        Value::from("kind: Template\nobjects: []\n")
    );
}

#[test]
fn cluster_profile_change_redirects_projected_volume() {
    let master = checkout("kind: Template\n", "region: us-east-1\n");
    let candidate = checkout("kind: Template\n", "region: us-west-2\n");

    let out = rehearse(&master, &candidate).args(&["--allow-volumes"]).passes();
    let docs = out.documents();

    let records = out.records();
    assert_eq!(records.len(), 1);
    let alias = volume(&records[0], "cluster-profile")["projected"]["sources"][0]["configMap"]
        ["name"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(alias.starts_with("rehearse-cluster-profile-aws-"), "{}", alias);
    assert_eq!(
        volume(&records[0], "job-definition")["configMap"]["name"],
        Value::from("prow-job-cluster-launch-e2e")
    );
    assert_eq!(docs[1][alias.as_str()]["vars.yaml"], Value::from("region: us-west-2\n"));
}

#[test]
fn shared_resource_changes_need_allow_volumes() {
    let master = checkout("kind: Template\n", "region: us-east-1\n");
    let candidate = checkout("kind: Template\nobjects: []\n", "region: us-west-2\n");

    rehearse(&master, &candidate).passes().stdout_eq("");
}

#[test]
fn changed_job_with_volumes_is_rejected_without_allow_volumes() {
    let master = checkout("kind: Template\n", "region: us-east-1\n");
    let candidate = Checkout::empty()
        .file(JOBS_FILE, &presubmits(&E2E_AWS.replace("--target=e2e-aws", "--target=e2e-aws-v2")))
        .file(TEMPLATE_FILE, "kind: Template\n")
        .file(PROFILE_FILE, "region: us-east-1\n");

    rehearse(&master, &candidate).passes().stdout_eq("");
    rehearse(&master, &candidate)
        .args(&["--allow-volumes"])
        .passes()
        .stdout_has("job: rehearse-1234-pull-ci-org-repo-master-e2e-aws");
}
