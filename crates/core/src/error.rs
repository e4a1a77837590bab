// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine-wide error taxonomy
//!
//! Lower layers keep their own `thiserror` enums; at the engine boundary
//! every failure is classified into one of these variants so the scheduler
//! can dispatch on the class (retry vs halt vs fatal) and events can carry
//! a stable `Class: message` rendering.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable class names for the error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    ConfigError,
    WorkspaceError,
    InvocationError,
    ContractFailure,
    RelayExhausted,
    StateStoreError,
    Cancelled,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::ConfigError => "ConfigError",
            ErrorClass::WorkspaceError => "WorkspaceError",
            ErrorClass::InvocationError => "InvocationError",
            ErrorClass::ContractFailure => "ContractFailure",
            ErrorClass::RelayExhausted => "RelayExhausted",
            ErrorClass::StateStoreError => "StateStoreError",
            ErrorClass::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure flowing through scheduler, executor, and events.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WaveError {
    #[error("ConfigError: {0}")]
    Config(String),
    #[error("WorkspaceError: {0}")]
    Workspace(String),
    #[error("InvocationError: {0}")]
    Invocation(String),
    #[error("ContractFailure: {0}")]
    Contract(String),
    #[error("RelayExhausted: {0}")]
    RelayExhausted(String),
    #[error("StateStoreError: {0}")]
    StateStore(String),
    #[error("Cancelled")]
    Cancelled,
}

impl WaveError {
    pub fn class(&self) -> ErrorClass {
        match self {
            WaveError::Config(_) => ErrorClass::ConfigError,
            WaveError::Workspace(_) => ErrorClass::WorkspaceError,
            WaveError::Invocation(_) => ErrorClass::InvocationError,
            WaveError::Contract(_) => ErrorClass::ContractFailure,
            WaveError::RelayExhausted(_) => ErrorClass::RelayExhausted,
            WaveError::StateStore(_) => ErrorClass::StateStoreError,
            WaveError::Cancelled => ErrorClass::Cancelled,
        }
    }

    /// Classes a step contract may recover from via retry.
    ///
    /// Workspace and store failures are never retried; cancellation is not
    /// an error condition.
    pub fn is_step_retryable(&self) -> bool {
        matches!(self, WaveError::Contract(_) | WaveError::Invocation(_))
    }

    /// Classes that abort the whole run regardless of step policy.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, WaveError::StateStore(_))
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
