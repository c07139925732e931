// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "ci";
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Namespace to run rehearsals in: PJR_NAMESPACE > "ci"
pub fn namespace() -> String {
    std::env::var("PJR_NAMESPACE")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

/// Monitoring deadline override (`PJR_WATCH_TIMEOUT_MS`); unset waits indefinitely.
pub fn watch_timeout() -> Option<Duration> {
    std::env::var("PJR_WATCH_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Log filter directives: PJR_LOG > "info"
pub fn log_filter() -> String {
    std::env::var("PJR_LOG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
