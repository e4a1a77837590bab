// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wave-adapters: invoking external LLM CLIs
//!
//! Wave does not execute models; it drives adapter binaries as child
//! processes. The [`AdapterInvoker`] trait is the seam between the step
//! executor and that outside world: [`ProcessInvoker`] is the production
//! implementation, [`FakeInvoker`] plays scripted outcomes for tests.

pub mod env;
pub mod process;
pub mod stream;
pub mod traced;

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wave_core::{ArtifactRecord, TokenUsage};

pub use process::ProcessInvoker;
pub use stream::AdapterEvent;
pub use traced::TracedInvoker;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeInvoker, ScriptedResponse};

/// Errors from adapter invocation.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("adapter binary not found: {0}")]
    BinaryNotFound(String),
    #[error("failed to spawn adapter: {0}")]
    Spawn(String),
    #[error("base protocol file declared but unreadable: {0}")]
    BaseProtocolUnreadable(PathBuf),
    #[error("system prompt file unreadable: {0}")]
    SystemPromptUnreadable(PathBuf),
    #[error("adapter I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("adapter timed out after {0:?}")]
    Timeout(Duration),
}

/// Why an invocation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The adapter exited on its own.
    Completed,
    /// Stopped at the relay engine's request; a checkpointed resume follows.
    Relay,
    /// Stopped by cooperative cancellation.
    Cancelled,
}

/// Everything needed to run one adapter invocation. Fully resolved by the
/// engine; this crate never reads the manifest.
#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub run_id: String,
    pub step_id: String,
    pub persona: String,
    pub binary: String,
    pub mode: String,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    /// True when the adapter emits NDJSON events on stdout.
    pub json_output: bool,
    pub system_prompt_file: PathBuf,
    pub base_protocol_file: Option<PathBuf>,
    pub allowed_tools: Vec<String>,
    pub deny: Vec<String>,
    pub user_prompt: String,
    /// Workspace directory; becomes the child's cwd.
    pub workspace: PathBuf,
    pub timeout: Duration,
    /// Environment variable names forwarded from the ambient environment.
    pub env_passthrough: Vec<String>,
    pub extra_env: Vec<(String, String)>,
}

/// Signals surfaced to the step executor while the adapter runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterSignal {
    /// Cumulative token usage reported by the adapter.
    Usage(TokenUsage),
    /// The adapter asked for a compaction (context relay).
    CompactionRequested,
}

/// Control surface threaded from scheduler through executor into the
/// invocation: cooperative cancellation, relay stop, and a signal channel.
#[derive(Clone, Default)]
pub struct InvokeControl {
    pub cancel: CancellationToken,
    pub relay_stop: CancellationToken,
    pub signals: Option<mpsc::Sender<AdapterSignal>>,
}

impl InvokeControl {
    /// Control with no external observers; used by summarizer invocations
    /// and tests.
    pub fn detached() -> Self {
        Self::default()
    }
}

/// Outcome of one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub tokens_used: TokenUsage,
    /// Artifacts the adapter reported producing (absolute paths).
    pub artifacts: Vec<ArtifactRecord>,
    /// Assistant-turn texts, in order; feeds relay summarization.
    pub transcript: Vec<String>,
    pub stop: StopReason,
}

impl InvokeResult {
    pub fn success(&self) -> bool {
        self.stop == StopReason::Completed && self.exit_code == 0
    }
}

/// The seam between the step executor and adapter binaries.
#[async_trait]
pub trait AdapterInvoker: Send + Sync {
    async fn invoke(
        &self,
        request: InvokeRequest,
        ctl: InvokeControl,
    ) -> Result<InvokeResult, InvokeError>;
}
