// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level errors
//!
//! [`EngineError`] covers failures that abort a run before or outside
//! step execution. Failures *of* a step travel as
//! [`wave_core::WaveError`] inside the step's outcome, where the
//! executor's retry policy dispatches on the class.

use crate::workspace::WorkspaceError;
use thiserror::Error;
use wave_adapters::InvokeError;
use wave_core::WaveError;
use wave_manifest::ConfigError;
use wave_storage::StateStoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    StateStore(#[from] StateStoreError),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("pipeline '{0}' is disabled")]
    PipelineDisabled(String),

    #[error("unknown step '{0}' for --from-step")]
    UnknownFromStep(String),
}

/// Classify an invocation error for events and retry dispatch.
pub fn classify_invoke_error(err: InvokeError) -> WaveError {
    match err {
        InvokeError::Timeout(duration) => WaveError::Invocation(format!(
            "TimeoutError: adapter timed out after {}s",
            duration.as_secs()
        )),
        other => WaveError::Invocation(other.to_string()),
    }
}

/// Classify a workspace failure for the step outcome.
pub fn classify_workspace_error(err: WorkspaceError) -> WaveError {
    WaveError::Workspace(err.to_string())
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
