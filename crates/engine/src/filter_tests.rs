// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use proptest::prelude::*;
use rehearse_core::test_support::strategies::arb_presubmit;
use rehearse_core::test_support::{periodic, presubmit, spec};
use rehearse_core::AgentKind;

fn config() -> RehearsalConfig {
    RehearsalConfig::default()
}

#[test]
fn plain_job_is_eligible() {
    let job = presubmit("pull-ci-org-repo-master-unit").build();
    assert_eq!(check_presubmit(&job, false, &config()), Ok(()));
}

#[yare::parameterized(
    none     = { &[], Rejection::NoBranches },
    multiple = { &["master", "release-4.1"], Rejection::MultipleBranches },
)]
fn branch_count(branches: &[&str], expected: Rejection) {
    let job = presubmit("pull-ci-org-repo-master-unit").branches(branches).build();
    assert_eq!(check_presubmit(&job, true, &config()), Err(expected));
}

#[test]
fn multiple_branches_win_over_other_rejections() {
    let job = presubmit("pull-ci-org-repo-master-unit")
        .branches(&["master", "release-4.1"])
        .agent(AgentKind::Jenkins)
        .spec(spec().command(&["make"]))
        .build();
    assert_eq!(check_presubmit(&job, false, &config()), Err(Rejection::MultipleBranches));
}

#[test]
fn non_kubernetes_agent_is_rejected() {
    let job = presubmit("pull-ci-org-repo-master-unit").agent(AgentKind::Jenkins).build();
    assert_eq!(
        check_presubmit(&job, false, &config()),
        Err(Rejection::UnsupportedAgent("jenkins".to_string()))
    );
}

#[test]
fn missing_spec_is_rejected() {
    let job = presubmit("pull-ci-org-repo-master-unit").no_spec().build();
    assert_eq!(check_presubmit(&job, false, &config()), Err(Rejection::MissingSpec));
}

#[yare::parameterized(
    other_binary = { &["make"] },
    with_args    = { &["ci-operator", "--target=unit"] },
    shell        = { &["/bin/bash", "-c", "ci-operator"] },
    empty        = { &[] },
)]
fn unsupported_commands(command: &[&str]) {
    let job = presubmit("pull-ci-org-repo-master-unit").spec(spec().command(command)).build();
    assert!(matches!(
        check_presubmit(&job, false, &config()),
        Err(Rejection::UnsupportedCommand { .. })
    ));
}

#[yare::parameterized(
    double = { "--git-ref=org/repo@master" },
    single = { "-git-ref=org/repo@master" },
)]
fn git_ref_override_is_rejected(arg: &str) {
    let job = presubmit("pull-ci-org-repo-master-unit").spec(spec().arg(arg)).build();
    assert_eq!(
        check_presubmit(&job, false, &config()),
        Err(Rejection::GitRefOverride(arg.to_string()))
    );
}

#[test]
fn volumes_need_permission() {
    let job = presubmit("pull-ci-org-repo-master-e2e")
        .spec(spec().template("cluster-launch-e2e.yaml"))
        .build();
    assert_eq!(check_presubmit(&job, false, &config()), Err(Rejection::Volumes));
    assert_eq!(check_presubmit(&job, true, &config()), Ok(()));
}

#[test]
fn periodics_skip_branch_checks() {
    let job = periodic("periodic-ci-e2e", spec());
    assert_eq!(check_periodic(&job, false, &config()), Ok(()));

    let job = periodic("periodic-ci-e2e", spec().arg("--git-ref=a@b"));
    assert!(check_periodic(&job, false, &config()).is_err());
}

#[test]
fn configured_command_is_honored() {
    let config = config().command("ci-operator-v2");
    let job = presubmit("pull-ci-org-repo-master-unit").spec(spec().command(&["ci-operator-v2"])).build();
    assert_eq!(check_presubmit(&job, false, &config), Ok(()));
}

proptest! {
    #[test]
    fn eligibility_is_pure(job in arb_presubmit(), allow_volumes in any::<bool>()) {
        let config = RehearsalConfig::default();
        let before = job.clone();
        let first = check_presubmit(&job, allow_volumes, &config);
        let second = check_presubmit(&job, allow_volumes, &config);
        prop_assert_eq!(first, second);
        prop_assert_eq!(job, before);
    }
}
