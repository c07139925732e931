// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run execution tallies.

use serde::{Deserialize, Serialize};

/// Job names submitted, passed, and failed during one rehearsal run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    pub submitted: Vec<String>,
    pub passed: Vec<String>,
    pub failed: Vec<String>,
}

impl ExecutionMetrics {
    pub fn is_empty(&self) -> bool {
        self.submitted.is_empty() && self.passed.is_empty() && self.failed.is_empty()
    }
}
