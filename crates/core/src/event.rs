// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-transition events
//!
//! One event per state transition, emitted after the transition is durable.
//! Serialized as one JSON object per line on the NDJSON stream; the field
//! set is stable per transition and new optional fields may be added.

use crate::artifact::ArtifactRecord;
use crate::id::{RunId, StepId};
use crate::state::{RunState, StepState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The `state` field carries either a step state or a run state; both
/// serialize as their snake_case wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventState {
    Step(StepState),
    Run(RunState),
}

impl From<StepState> for EventState {
    fn from(s: StepState) -> Self {
        EventState::Step(s)
    }
}

impl From<RunState> for EventState {
    fn from(s: RunState) -> Self {
        EventState::Run(s)
    }
}

/// A single state-transition event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// ISO-8601 with timezone
    pub timestamp: DateTime<Utc>,
    /// The pipeline run this event belongs to
    pub pipeline_id: RunId,
    /// Absent for run-level events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    pub state: EventState,
    /// Milliseconds spent in the state being left; 0 for entry events
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_count: Option<u32>,
    /// `Class: message` rendering of the failure, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<ArtifactRecord>>,
    /// Matrix worker index, when the step fans out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl Event {
    /// A step-level transition event stamped with the current time.
    pub fn step(pipeline_id: RunId, step_id: StepId, state: StepState) -> Self {
        Self {
            timestamp: Utc::now(),
            pipeline_id,
            step_id: Some(step_id),
            state: state.into(),
            duration_ms: 0,
            message: String::new(),
            retry_count: None,
            error: None,
            artifacts: None,
            worker_id: None,
            meta: Map::new(),
        }
    }

    /// A run-level transition event stamped with the current time.
    pub fn run(pipeline_id: RunId, state: RunState) -> Self {
        Self {
            timestamp: Utc::now(),
            pipeline_id,
            step_id: None,
            state: state.into(),
            duration_ms: 0,
            message: String::new(),
            retry_count: None,
            error: None,
            artifacts: None,
            worker_id: None,
            meta: Map::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_artifacts(mut self, artifacts: Vec<ArtifactRecord>) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn with_worker_id(mut self, worker_id: u32) -> Self {
        self.worker_id = Some(worker_id);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
