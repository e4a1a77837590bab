// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wave-engine: the pipeline execution engine
//!
//! Drives a validated pipeline from ready to terminal: the DAG scheduler
//! dispatches step executors under bounded concurrency, each executor
//! walks one step through workspace preparation, adapter invocation,
//! contract validation and handover, the relay engine restarts saturated
//! invocations from checkpoints, and every transition is committed to the
//! state store before its event reaches the bus.

pub mod contract;
pub mod context;
pub mod error;
pub mod events;
pub mod relay;
pub mod resume;
pub mod runner;
pub mod scheduler;
pub mod step;
pub mod vars;
pub mod workspace;

#[cfg(test)]
mod test_helpers;

pub use context::EngineContext;
pub use error::EngineError;
pub use events::{CollectSink, EventBus, EventSink, NdjsonSink};
pub use runner::{PipelineRunner, RunOptions, RunReport};
pub use workspace::{WorkspaceError, WorkspaceManager};
