// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type that carries a process exit code.
//!
//! The pipeline returns `ExitError` instead of calling `std::process::exit()`
//! directly, leaving process termination to `main()`.

use std::fmt;

/// A rehearsal failed or could not be submitted.
pub const REHEARSAL_FAILED: i32 = 1;
/// Configuration could not be loaded or the cluster misbehaved.
pub const INFRASTRUCTURE: i32 = 2;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn rehearsal_failed(message: impl Into<String>) -> Self {
        Self::new(REHEARSAL_FAILED, message)
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Exit code for a top-level error: its own code when it is an
/// [`ExitError`], infrastructure failure otherwise.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error.downcast_ref::<ExitError>().map_or(INFRASTRUCTURE, |e| e.code)
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
