// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pj-rehearse: rehearse CI job configuration changes from a pull request

mod env;
mod exit_error;
mod run;

use anyhow::{Context, Result};
use clap::Parser;
use rehearse_adapters::{Pull, Refs};
use rehearse_core::RehearsalConfig;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::run::Options;

#[derive(Parser, Debug)]
#[command(name = "pj-rehearse", version, about = "Rehearse changed CI jobs before they merge")]
struct Cli {
    /// Checkout of the release repository with the proposed changes
    #[arg(long)]
    candidate_path: PathBuf,
    /// Checkout of the release repository at the base revision
    #[arg(long)]
    master_path: PathBuf,
    /// Pull request being rehearsed
    #[arg(long)]
    pr_number: u64,
    #[arg(long, default_value = "openshift")]
    org: String,
    #[arg(long, default_value = "release")]
    repo: String,
    #[arg(long, default_value = "master")]
    base_ref: String,
    #[arg(long, default_value = "")]
    base_sha: String,
    #[arg(long, default_value = "")]
    pull_sha: String,
    #[arg(long, default_value = "")]
    author: String,
    /// Print the rehearsal jobs instead of submitting them
    #[arg(long)]
    dry_run: bool,
    /// Rehearse jobs that mount volumes, redirecting changed shared resources
    #[arg(long)]
    allow_volumes: bool,
    /// Namespace for rehearsal jobs (default: $PJR_NAMESPACE, then "ci")
    #[arg(long)]
    namespace: Option<String>,
    /// TOML file overriding the built-in rehearsal settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Give up waiting for jobs after this many seconds
    #[arg(long)]
    watch_timeout_secs: Option<u64>,
    /// Write submitted/passed/failed job names here as JSON
    #[arg(long)]
    metrics_output: Option<PathBuf>,
}

impl Cli {
    fn into_options(self) -> Result<Options> {
        let config = match &self.config {
            Some(path) => RehearsalConfig::load(path).context("failed to load rehearsal config")?,
            None => RehearsalConfig::default(),
        };
        let refs = Refs {
            org: self.org,
            repo: self.repo,
            base_ref: self.base_ref,
            base_sha: self.base_sha,
            pulls: vec![Pull { number: self.pr_number, author: self.author, sha: self.pull_sha }],
            ..Default::default()
        };
        Ok(Options {
            candidate_path: self.candidate_path,
            master_path: self.master_path,
            pr_number: self.pr_number,
            refs,
            dry_run: self.dry_run,
            allow_volumes: self.allow_volumes,
            namespace: self.namespace.unwrap_or_else(env::namespace),
            config,
            watch_timeout: self
                .watch_timeout_secs
                .map(Duration::from_secs)
                .or_else(env::watch_timeout),
            metrics_output: self.metrics_output,
        })
    }
}

fn init_logging() {
    let filter = EnvFilter::try_new(env::log_filter())
        .unwrap_or_else(|_| EnvFilter::new(env::DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping");
            on_signal.cancel();
        }
    });

    let result = match cli.into_options() {
        Ok(opts) => run::run(&opts, cancel).await,
        Err(error) => Err(error),
    };
    if let Err(error) = result {
        eprintln!("pj-rehearse: {:#}", error);
        std::process::exit(exit_error::exit_code(&error));
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
