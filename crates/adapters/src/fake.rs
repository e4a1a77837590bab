// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake adapter invoker for deterministic testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::{
    AdapterInvoker, AdapterSignal, InvokeControl, InvokeError, InvokeRequest, InvokeResult,
    StopReason,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use wave_core::{ArtifactRecord, TokenUsage};

/// One scripted invocation outcome.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    /// Files written into the workspace before returning (relative path,
    /// content). Stands in for the adapter doing its work.
    pub files: Vec<(String, String)>,
    /// Signals pushed to the executor while "running".
    pub signals: Vec<AdapterSignal>,
    /// Simulated run time before returning.
    pub delay: Option<Duration>,
    /// Timeout error instead of a result.
    pub times_out: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub tokens_used: TokenUsage,
    pub transcript: Vec<String>,
    /// Artifact records reported by the "adapter" (workspace-relative
    /// paths, resolved on invoke).
    pub artifacts: Vec<(String, String)>,
}

impl Default for ScriptedResponse {
    fn default() -> Self {
        Self::ok()
    }
}

impl ScriptedResponse {
    /// Successful, empty-handed invocation.
    pub fn ok() -> Self {
        Self {
            files: Vec::new(),
            signals: Vec::new(),
            delay: None,
            times_out: false,
            exit_code: 0,
            stdout: String::new(),
            tokens_used: TokenUsage::new(100, 50),
            transcript: vec!["done".to_string()],
            artifacts: Vec::new(),
        }
    }

    /// Successful invocation that writes `content` at `path` in the
    /// workspace.
    pub fn writing(path: impl Into<String>, content: impl Into<String>) -> Self {
        let mut response = Self::ok();
        response.files.push((path.into(), content.into()));
        response
    }

    pub fn failing(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::ok()
        }
    }

    pub fn timing_out() -> Self {
        Self {
            times_out: true,
            ..Self::ok()
        }
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push((path.into(), content.into()));
        self
    }

    pub fn with_signal(mut self, signal: AdapterSignal) -> Self {
        self.signals.push(signal);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_tokens(mut self, usage: TokenUsage) -> Self {
        self.tokens_used = usage;
        self
    }

    pub fn with_transcript(mut self, turns: Vec<String>) -> Self {
        self.transcript = turns;
        self
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }
}

struct FakeState {
    /// Per-step response queues; popped front-first, so tests can script
    /// attempt 1 ≠ attempt 2.
    scripts: HashMap<String, VecDeque<ScriptedResponse>>,
    /// Fallback when a step has no (remaining) script.
    default: ScriptedResponse,
    calls: Vec<InvokeRequest>,
}

/// Fake adapter invoker
///
/// Plays scripted responses per step and records every request. Honors
/// cancellation and relay-stop during scripted delays, so scheduler and
/// relay tests exercise the same control paths as production.
#[derive(Clone)]
pub struct FakeInvoker {
    inner: Arc<Mutex<FakeState>>,
}

impl Default for FakeInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeInvoker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeState {
                scripts: HashMap::new(),
                default: ScriptedResponse::ok(),
                calls: Vec::new(),
            })),
        }
    }

    /// Queue a response for a step; queued responses play in order.
    pub fn script(&self, step_id: &str, response: ScriptedResponse) {
        self.inner
            .lock()
            .scripts
            .entry(step_id.to_string())
            .or_default()
            .push_back(response);
    }

    /// Response used when a step has no scripted queue entry left.
    pub fn set_default(&self, response: ScriptedResponse) {
        self.inner.lock().default = response;
    }

    pub fn calls(&self) -> Vec<InvokeRequest> {
        self.inner.lock().calls.clone()
    }

    /// Requests recorded for one step, in order.
    pub fn calls_for(&self, step_id: &str) -> Vec<InvokeRequest> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|r| r.step_id == step_id)
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.inner.lock().calls.len()
    }
}

#[async_trait]
impl AdapterInvoker for FakeInvoker {
    async fn invoke(
        &self,
        request: InvokeRequest,
        ctl: InvokeControl,
    ) -> Result<InvokeResult, InvokeError> {
        let response = {
            let mut state = self.inner.lock();
            state.calls.push(request.clone());
            let scripted = state
                .scripts
                .get_mut(&request.step_id)
                .and_then(VecDeque::pop_front);
            scripted.unwrap_or_else(|| state.default.clone())
        };

        for signal in &response.signals {
            if let Some(tx) = &ctl.signals {
                let _ = tx.send(signal.clone()).await;
            }
        }

        let mut stop = StopReason::Completed;
        if let Some(delay) = response.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = ctl.cancel.cancelled() => stop = StopReason::Cancelled,
                _ = ctl.relay_stop.cancelled() => stop = StopReason::Relay,
            }
        } else {
            // Even instant responses observe a pending relay stop, so
            // threshold-triggered relays are deterministic in tests.
            if ctl.relay_stop.is_cancelled() {
                stop = StopReason::Relay;
            }
            if ctl.cancel.is_cancelled() {
                stop = StopReason::Cancelled;
            }
        }

        if response.times_out {
            return Err(InvokeError::Timeout(request.timeout));
        }

        if stop == StopReason::Completed {
            for (path, content) in &response.files {
                let target = request.workspace.join(path);
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&target, content).await?;
            }
        }

        let artifacts = response
            .artifacts
            .iter()
            .map(|(name, path)| ArtifactRecord::new(name.clone(), request.workspace.join(path)))
            .collect();

        Ok(InvokeResult {
            stdout: response.stdout,
            stderr: String::new(),
            exit_code: if stop == StopReason::Completed {
                response.exit_code
            } else {
                -1
            },
            tokens_used: response.tokens_used,
            artifacts,
            transcript: response.transcript,
            stop,
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
