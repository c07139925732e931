// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help and argument handling specs

use crate::prelude::*;

#[test]
fn help_lists_pipeline_flags() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("--candidate-path")
        .stdout_has("--master-path")
        .stdout_has("--pr-number")
        .stdout_has("--dry-run")
        .stdout_has("--allow-volumes");
}

#[test]
fn version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn missing_required_flags_is_a_usage_error() {
    cli().args(&["--dry-run"]).exits_with(2).stderr_has("--candidate-path");
}

#[test]
fn missing_config_file_fails_before_loading_checkouts() {
    cli()
        .args(&[
            "--dry-run",
            "--pr-number",
            PR,
            "--master-path",
            "/nonexistent/master",
            "--candidate-path",
            "/nonexistent/candidate",
            "--config",
            "/nonexistent/rehearse.toml",
        ])
        .exits_with(2)
        .stderr_has("failed to load rehearsal config");
}
