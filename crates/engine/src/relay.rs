// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The relay engine
//!
//! When an adapter invocation approaches its context window, the engine
//! stops it at the end of the current turn, has a summarizer persona
//! distill the transcript into a checkpoint, persists the checkpoint, and
//! restarts the step with fresh context. The attempt number and retry
//! budget are untouched; a bounded relay depth and the per-run token cap
//! keep the loop finite.

use crate::context::EngineContext;
use crate::error::classify_invoke_error;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wave_adapters::{AdapterSignal, InvokeControl, InvokeRequest, InvokeResult, StopReason};
use wave_core::{Event, RunId, StepId, StepState, TokenUsage, WaveError};
use wave_manifest::{AdapterDef, Manifest, StepDef};
use wave_storage::{CheckpointRecord, StepTransition};

/// Summarizer invocations are short; they get a fixed budget rather than
/// the step's timeout.
const SUMMARIZER_TIMEOUT: Duration = Duration::from_secs(300);

/// Effective relay configuration for one step.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub threshold_percent: u8,
    pub summarizer_persona: String,
    pub max_depth: u32,
    pub context_window: u64,
    pub adapter_reports_usage: bool,
    pub max_total_tokens: Option<u64>,
}

impl RelaySettings {
    /// Manifest defaults overridden by the step's `handover.compaction`.
    pub fn resolve(manifest: &Manifest, step: &StepDef, adapter: &AdapterDef) -> Self {
        let relay = &manifest.runtime.relay;
        let compaction = step.compaction();
        Self {
            threshold_percent: compaction
                .and_then(|c| c.token_threshold_percent)
                .unwrap_or(relay.token_threshold_percent),
            summarizer_persona: compaction
                .and_then(|c| c.summarizer_persona.clone())
                .unwrap_or_else(|| relay.summarizer_persona.clone()),
            max_depth: compaction
                .and_then(|c| c.max_depth)
                .unwrap_or(relay.max_depth),
            context_window: adapter.context_window(),
            adapter_reports_usage: adapter.reports_usage(),
            max_total_tokens: manifest.runtime.meta_pipeline.max_total_tokens,
        }
    }
}

/// Outcome of a relay-supervised invocation chain.
#[derive(Debug)]
pub struct RelayedInvoke {
    pub result: InvokeResult,
    /// Tokens across the whole chain, relays included.
    pub total_tokens: TokenUsage,
    pub relay_count: u32,
}

pub struct RelayEngine {
    ctx: EngineContext,
}

impl RelayEngine {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Run one adapter invocation, relaying through checkpoints whenever
    /// usage crosses the threshold or the adapter requests compaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn invoke_with_relay(
        &self,
        mut request: InvokeRequest,
        settings: &RelaySettings,
        run_id: &RunId,
        step_id: &StepId,
        attempt: u32,
        worker: Option<u32>,
        cancel: CancellationToken,
    ) -> Result<RelayedInvoke, WaveError> {
        let original_prompt = request.user_prompt.clone();
        let mut total_tokens = TokenUsage::default();
        let mut relay_count = 0u32;

        if !settings.adapter_reports_usage {
            tracing::warn!(
                step = %step_id,
                threshold_percent = settings.threshold_percent,
                "adapter does not report usage; relays trigger only on explicit compaction signals"
            );
        }

        loop {
            let relay_stop = CancellationToken::new();
            let (tx, mut rx) = mpsc::channel::<AdapterSignal>(16);
            let ctl = InvokeControl {
                cancel: cancel.clone(),
                relay_stop: relay_stop.clone(),
                signals: Some(tx),
            };

            let mut budget_hit = false;
            let invoke = self.ctx.invoker.invoke(request.clone(), ctl);
            tokio::pin!(invoke);

            let result = loop {
                tokio::select! {
                    result = &mut invoke => break result,
                    Some(signal) = rx.recv() => match signal {
                        AdapterSignal::Usage(usage) => {
                            if let Some(cap) = settings.max_total_tokens {
                                if total_tokens.total() + usage.total() >= cap {
                                    budget_hit = true;
                                    relay_stop.cancel();
                                    continue;
                                }
                            }
                            if settings.adapter_reports_usage
                                && usage.crossed_threshold(
                                    settings.threshold_percent,
                                    settings.context_window,
                                )
                            {
                                relay_stop.cancel();
                            }
                        }
                        AdapterSignal::CompactionRequested => relay_stop.cancel(),
                    }
                }
            };

            let result = result.map_err(classify_invoke_error)?;
            total_tokens.add(result.tokens_used);

            match result.stop {
                StopReason::Completed | StopReason::Cancelled => {
                    return Ok(RelayedInvoke {
                        result,
                        total_tokens,
                        relay_count,
                    });
                }
                StopReason::Relay => {
                    if budget_hit {
                        return Err(WaveError::RelayExhausted(format!(
                            "run token budget exhausted ({} tokens used)",
                            total_tokens.total()
                        )));
                    }
                    relay_count += 1;
                    if relay_count > settings.max_depth {
                        return Err(WaveError::RelayExhausted(format!(
                            "relay depth {} exceeds max_depth {}",
                            relay_count, settings.max_depth
                        )));
                    }

                    let checkpoint = self
                        .relay_checkpoint(
                            &request,
                            &result,
                            settings,
                            run_id,
                            step_id,
                            attempt,
                            worker,
                            relay_count,
                            &cancel,
                        )
                        .await?;

                    request.user_prompt = resume_prompt(&checkpoint, &original_prompt);
                }
            }
        }
    }

    /// Suspend bookkeeping: `relaying` transition, summarizer run,
    /// checkpoint persistence, `running` transition for the resume.
    #[allow(clippy::too_many_arguments)]
    async fn relay_checkpoint(
        &self,
        request: &InvokeRequest,
        interrupted: &InvokeResult,
        settings: &RelaySettings,
        run_id: &RunId,
        step_id: &StepId,
        attempt: u32,
        worker: Option<u32>,
        relay_count: u32,
        cancel: &CancellationToken,
    ) -> Result<String, WaveError> {
        // Matrix workers share the step's state row; only the step-level
        // invocation drives store transitions.
        if worker.is_none() {
            self.ctx
                .store
                .transition_step(run_id, step_id, StepState::Relaying, StepTransition::default())
                .map_err(|e| WaveError::StateStore(e.to_string()))?;
        }
        let mut event = Event::step(run_id.clone(), step_id.clone(), StepState::Relaying)
            .with_message(format!(
                "relay triggered at {} tokens (depth {relay_count})",
                interrupted.tokens_used.total()
            ))
            .with_meta("relay_depth", serde_json::json!(relay_count));
        if let Some(index) = worker {
            event = event.with_worker_id(index);
        }
        self.ctx.bus.emit(event);

        let checkpoint_text = self
            .summarize(request, &interrupted.transcript, settings, cancel)
            .await?;

        self.ctx
            .store
            .save_checkpoint(&CheckpointRecord {
                run_id: run_id.clone(),
                step_id: step_id.clone(),
                attempt,
                checkpoint_text: checkpoint_text.clone(),
                created_at: chrono::Utc::now(),
            })
            .map_err(|e| WaveError::StateStore(e.to_string()))?;

        if worker.is_none() {
            self.ctx
                .store
                .transition_step(run_id, step_id, StepState::Running, StepTransition::default())
                .map_err(|e| WaveError::StateStore(e.to_string()))?;
        }
        let mut event = Event::step(run_id.clone(), step_id.clone(), StepState::Running)
            .with_message("resumed from relay checkpoint")
            .with_meta("relay_depth", serde_json::json!(relay_count));
        if let Some(index) = worker {
            event = event.with_worker_id(index);
        }
        self.ctx.bus.emit(event);

        Ok(checkpoint_text)
    }

    /// Run the summarizer persona over the interrupted transcript.
    async fn summarize(
        &self,
        request: &InvokeRequest,
        transcript: &[String],
        settings: &RelaySettings,
        cancel: &CancellationToken,
    ) -> Result<String, WaveError> {
        let manifest = &self.ctx.manifest;
        let persona = manifest
            .persona(&settings.summarizer_persona)
            .map_err(|e| WaveError::Config(e.to_string()))?;
        let adapter = manifest
            .adapter(&persona.adapter)
            .map_err(|e| WaveError::Config(e.to_string()))?;
        let rules = manifest
            .effective_permissions(&settings.summarizer_persona)
            .map_err(|e| WaveError::Config(e.to_string()))?;

        let summary_request = InvokeRequest {
            run_id: request.run_id.clone(),
            step_id: format!("{}#summarize", request.step_id),
            persona: settings.summarizer_persona.clone(),
            binary: adapter.binary.clone(),
            mode: adapter.mode.clone(),
            model: persona.model.clone(),
            temperature: persona.temperature,
            json_output: adapter.reports_usage(),
            system_prompt_file: manifest.resolve_path(&persona.system_prompt_file),
            base_protocol_file: adapter
                .base_protocol_file
                .as_ref()
                .map(|p| manifest.resolve_path(p)),
            allowed_tools: rules.allowed_tools,
            deny: rules.deny,
            user_prompt: summarizer_prompt(transcript),
            workspace: request.workspace.clone(),
            timeout: SUMMARIZER_TIMEOUT,
            env_passthrough: adapter.env_passthrough.clone(),
            extra_env: Vec::new(),
        };

        let ctl = InvokeControl {
            cancel: cancel.clone(),
            ..InvokeControl::detached()
        };
        let result = self
            .ctx
            .invoker
            .invoke(summary_request, ctl)
            .await
            .map_err(classify_invoke_error)?;

        if result.stop == StopReason::Cancelled {
            return Err(WaveError::Cancelled);
        }
        if result.exit_code != 0 {
            return Err(WaveError::Invocation(format!(
                "summarizer exited with code {}",
                result.exit_code
            )));
        }

        let text = if result.transcript.is_empty() {
            result.stdout.trim().to_string()
        } else {
            result.transcript.join("\n\n")
        };
        if text.is_empty() {
            return Err(WaveError::Invocation(
                "summarizer produced an empty checkpoint".to_string(),
            ));
        }
        Ok(text)
    }
}

fn summarizer_prompt(transcript: &[String]) -> String {
    format!(
        "A long-running task is being compacted. Summarize the transcript below \
         into a checkpoint with exactly these sections:\n\n\
         ## Completed Work\n## Current State\n## Remaining Work\n## Resume Instructions\n\n\
         Transcript:\n\n{}",
        transcript.join("\n\n")
    )
}

fn resume_prompt(checkpoint: &str, original_prompt: &str) -> String {
    format!(
        "A previous session ran out of context. Checkpoint from that session:\n\n\
         {checkpoint}\n\n\
         Continue the work from the checkpoint. Original task:\n\n{original_prompt}"
    )
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
