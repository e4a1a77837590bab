// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run and step state machines

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of one step within a pipeline run.
///
/// ```text
///      (graph-ready)          (worker)
/// pending ─────────────▶ ready ────▶ running ──┬──▶ completed (terminal)
///                                              ├──▶ failed    (terminal)
///                                              ├──▶ retrying ──▶ ready
///                                              └──▶ relaying ──▶ running
///                                              cancelled (terminal, from any state)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Waiting on unsatisfied dependencies
    Pending,
    /// All dependencies completed; eligible for dispatch
    Ready,
    /// A worker is executing this step
    Running,
    /// Contract failed; a fresh attempt will be dispatched
    Retrying,
    /// Context relay in progress; the step resumes with a checkpoint
    Relaying,
    /// Step finished and its contract passed (or soft-failed)
    Completed,
    /// Step finished unsuccessfully
    Failed,
    /// Step was cancelled before reaching a natural terminal state
    Cancelled,
}

impl StepState {
    /// Terminal states emit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Completed | StepState::Failed | StepState::Cancelled
        )
    }

    /// Whether the step state machine permits `self` to move to `next`.
    ///
    /// Cancellation is reachable from every non-terminal state.
    pub fn can_transition_to(&self, next: StepState) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == StepState::Cancelled {
            return true;
        }
        matches!(
            (self, next),
            (StepState::Pending, StepState::Ready)
                | (StepState::Ready, StepState::Running)
                | (StepState::Running, StepState::Completed)
                | (StepState::Running, StepState::Failed)
                | (StepState::Running, StepState::Retrying)
                | (StepState::Running, StepState::Relaying)
                | (StepState::Retrying, StepState::Ready)
                | (StepState::Relaying, StepState::Running)
                | (StepState::Relaying, StepState::Failed)
        )
    }

    /// Wire name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepState::Pending => "pending",
            StepState::Ready => "ready",
            StepState::Running => "running",
            StepState::Retrying => "retrying",
            StepState::Relaying => "relaying",
            StepState::Completed => "completed",
            StepState::Failed => "failed",
            StepState::Cancelled => "cancelled",
        }
    }

    /// Parse a wire name back into a state.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(StepState::Pending),
            "ready" => Some(StepState::Ready),
            "running" => Some(StepState::Running),
            "retrying" => Some(StepState::Retrying),
            "relaying" => Some(StepState::Relaying),
            "completed" => Some(StepState::Completed),
            "failed" => Some(StepState::Failed),
            "cancelled" => Some(StepState::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a whole pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RunState::Pending),
            "running" => Some(RunState::Running),
            "completed" => Some(RunState::Completed),
            "failed" => Some(RunState::Failed),
            "cancelled" => Some(RunState::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
