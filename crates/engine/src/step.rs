// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The step executor
//!
//! Runs one step from ready to terminal: prepare workspace, render the
//! prompt, invoke the adapter (under relay supervision), collect declared
//! artifacts, validate the contract, and hand over. Contract failures
//! under `on_failure: retry` loop back through a fresh workspace with the
//! validation diagnostics appended to the prompt; `must_pass: false`
//! failures complete with a warning. Every transition is committed to the
//! store before its event is emitted.

use crate::contract;
use crate::context::EngineContext;
use crate::error::{classify_invoke_error, classify_workspace_error};
use crate::relay::{RelayEngine, RelaySettings};
use crate::vars::step_vars;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use wave_adapters::{InvokeRequest, StopReason};
use wave_core::{ArtifactRecord, ArtifactRef, Event, RunId, StepId, StepState, TokenUsage, WaveError};
use wave_manifest::{ExecKind, MountDef, MountMode, OnFailure, Pipeline, StepDef};
use wave_storage::StepTransition;

/// Terminal report handed back to the scheduler.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub step_id: StepId,
    pub state: StepState,
    pub error: Option<WaveError>,
}

/// What one attempt produced.
struct AttemptSuccess {
    artifacts: Vec<ArtifactRecord>,
    tokens: TokenUsage,
    warning: Option<String>,
}

struct AttemptFailure {
    error: WaveError,
    /// Text folded into the next attempt's prompt.
    diagnostics: Option<String>,
    tokens: TokenUsage,
}

type AttemptResult = Result<AttemptSuccess, AttemptFailure>;

pub struct StepExecutor {
    ctx: EngineContext,
    pipeline: Arc<Pipeline>,
    run_id: RunId,
    input: String,
    timeout_override: Option<Duration>,
    /// Global worker slots; matrix workers each consume one.
    global_slots: Arc<Semaphore>,
}

impl StepExecutor {
    pub fn new(
        ctx: EngineContext,
        pipeline: Arc<Pipeline>,
        run_id: RunId,
        input: String,
        timeout_override: Option<Duration>,
        global_slots: Arc<Semaphore>,
    ) -> Self {
        Self {
            ctx,
            pipeline,
            run_id,
            input,
            timeout_override,
            global_slots,
        }
    }

    /// Drive a step to a terminal state. Never returns a non-terminal
    /// report; errors become `failed` (or `cancelled`).
    pub async fn execute(&self, step: &StepDef, cancel: CancellationToken) -> StepReport {
        let report = if step.is_matrix() {
            self.execute_matrix(step, cancel).await
        } else {
            self.execute_step(step, cancel).await
        };
        match report {
            Ok(report) => report,
            Err(error) => {
                // Bookkeeping failed (store I/O); surface as a failed step
                // without attempting further writes.
                tracing::error!(step = %step.id, error = %error, "step bookkeeping failed");
                StepReport {
                    step_id: step.id.clone(),
                    state: StepState::Failed,
                    error: Some(error),
                }
            }
        }
    }

    // === single-instance steps ===

    async fn execute_step(
        &self,
        step: &StepDef,
        cancel: CancellationToken,
    ) -> Result<StepReport, WaveError> {
        let contract = step.contract();
        let max_retries = contract.map(|c| c.max_retries).unwrap_or(0);
        let retry_allowed =
            contract.map(|c| c.on_failure == OnFailure::Retry).unwrap_or(false);

        let mut attempt = self.stored_attempt(&step.id)?;
        let mut retry_count = 0u32;
        let mut total_tokens = TokenUsage::default();
        let mut carried_diagnostics: Option<String> = None;

        loop {
            attempt += 1;
            let started = Instant::now();
            self.mark_running(&step.id, attempt, retry_count)?;

            let outcome = self
                .run_attempt(step, attempt, None, carried_diagnostics.take(), &cancel)
                .await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(success) => {
                    total_tokens.add(success.tokens);
                    return self.finish_completed(
                        step,
                        duration_ms,
                        total_tokens,
                        success.artifacts,
                        success.warning,
                        retry_count,
                    );
                }
                Err(failure) => {
                    total_tokens.add(failure.tokens);

                    if matches!(failure.error, WaveError::Cancelled) {
                        return self.finish_cancelled(&step.id, duration_ms);
                    }

                    let retryable =
                        retry_allowed && failure.error.is_step_retryable() && retry_count < max_retries;
                    if !retryable {
                        return self.finish_failed(
                            &step.id,
                            failure.error,
                            duration_ms,
                            total_tokens,
                            retry_count,
                        );
                    }

                    retry_count += 1;
                    self.mark_retrying(&step.id, retry_count, &failure.error, duration_ms)?;
                    carried_diagnostics = failure.diagnostics;

                    // Fresh workspace for the next attempt; no
                    // contamination from the failed one.
                    let workspace = self.ctx.workspaces.step_dir(&self.run_id, &step.id, None);
                    if let Err(e) = self.ctx.workspaces.destroy(&workspace) {
                        tracing::warn!(step = %step.id, error = %e, "failed to destroy workspace before retry");
                    }
                }
            }
        }
    }

    /// One prepare → invoke → collect → validate pass. Store transitions
    /// stay with the caller; matrix workers share this path.
    async fn run_attempt(
        &self,
        step: &StepDef,
        attempt: u32,
        worker: Option<(u32, String)>,
        carried_diagnostics: Option<String>,
        cancel: &CancellationToken,
    ) -> AttemptResult {
        let worker_index = worker.as_ref().map(|(index, _)| *index);
        let task = worker.as_ref().map(|(_, task)| task.as_str());

        let vars = step_vars(
            &self.run_id,
            self.pipeline.name(),
            &step.id,
            &self.input,
            task,
        );

        // 1. Workspace. Manifest-level skill mounts are shared into every
        // step, readonly, alongside the step's own mounts.
        let mut mounts: Vec<MountDef> = step.mounts().to_vec();
        mounts.extend(self.ctx.manifest.skill_mounts.iter().map(|skill| MountDef {
            source: skill.source.clone(),
            target: skill.target.clone(),
            mode: MountMode::Readonly,
        }));
        let workspace = self
            .ctx
            .workspaces
            .create(&self.run_id, &step.id, worker_index, &mounts, &vars)
            .map_err(|e| fail(classify_workspace_error(e), TokenUsage::default()))?;

        let refs = &step.memory.inject_artifacts;
        self.ctx
            .workspaces
            .inject_artifacts(&workspace, refs, |reference| {
                self.resolve_artifact(reference)
            })
            .map_err(|e| fail(classify_workspace_error(e), TokenUsage::default()))?;

        // 2. Prompt.
        let mut prompt = self
            .render_source(step, &vars)
            .map_err(|e| fail(e, TokenUsage::default()))?;
        if let Some(diagnostics) = carried_diagnostics {
            prompt.push_str(&format!(
                "\n\nThe previous attempt failed validation:\n{diagnostics}\nFix these issues."
            ));
        }

        // 3. Invoke under relay supervision.
        let request = self
            .build_request(step, &workspace, prompt)
            .map_err(|e| fail(e, TokenUsage::default()))?;
        let json_output = request.json_output;
        let adapter = self
            .ctx
            .manifest
            .adapter_for(&step.persona)
            .map_err(|e| fail(WaveError::Config(e.to_string()), TokenUsage::default()))?;
        let settings = RelaySettings::resolve(&self.ctx.manifest, step, adapter);

        let relayed = RelayEngine::new(self.ctx.clone())
            .invoke_with_relay(
                request,
                &settings,
                &self.run_id,
                &step.id,
                attempt,
                worker_index,
                cancel.clone(),
            )
            .await
            .map_err(|e| fail(e, TokenUsage::default()))?;

        let tokens = relayed.total_tokens;
        let result = relayed.result;

        if result.stop == StopReason::Cancelled {
            return Err(fail(WaveError::Cancelled, tokens));
        }
        if result.exit_code != 0 {
            let tail: String = result
                .stderr
                .lines()
                .rev()
                .take(5)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(AttemptFailure {
                error: WaveError::Invocation(format!(
                    "adapter exited with code {}",
                    result.exit_code
                )),
                diagnostics: (!tail.is_empty()).then_some(tail),
                tokens,
            });
        }

        // 4. Declared output artifacts must exist.
        let mut artifacts: Vec<ArtifactRecord> = Vec::new();
        for (name, rel_path) in &step.output_artifacts {
            let path = workspace.join(rel_path);
            if !path.exists() {
                return Err(AttemptFailure {
                    error: WaveError::Contract(format!(
                        "declared output artifact '{name}' missing at {}",
                        rel_path.display()
                    )),
                    diagnostics: Some(format!(
                        "- expected artifact '{name}' at {} was not produced",
                        rel_path.display()
                    )),
                    tokens,
                });
            }
            artifacts.push(ArtifactRecord::new(artifact_name(name, worker_index), path));
        }
        // Adapter-reported artifacts are kept unless a declared name wins.
        for reported in result.artifacts {
            let name = artifact_name(&reported.name, worker_index);
            if !artifacts.iter().any(|a| a.name == name) {
                artifacts.push(ArtifactRecord::new(name, reported.path));
            }
        }
        // Text adapters have no structured output; their stdout is the
        // step's primary artifact.
        if !json_output && !result.stdout.is_empty() {
            let name = artifact_name("stdout", worker_index);
            if !artifacts.iter().any(|a| a.name == name) {
                let path = workspace.join(".wave/stdout.txt");
                if let Some(parent) = path.parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                if let Err(e) = std::fs::write(&path, &result.stdout) {
                    tracing::warn!(step = %step.id, error = %e, "failed to persist stdout artifact");
                } else {
                    artifacts.push(ArtifactRecord::new(name, path));
                }
            }
        }
        self.ctx
            .store
            .record_artifacts(&self.run_id, &step.id, &artifacts)
            .map_err(|e| fail(WaveError::StateStore(e.to_string()), tokens))?;

        // 5. Contract gate.
        if let Some(contract) = step.contract() {
            let outcome =
                contract::validate(&contract.kind, &workspace, &self.ctx.manifest.base_dir).await;
            if !outcome.passed {
                let rendered = outcome.render_diagnostics();
                if contract.must_pass {
                    return Err(AttemptFailure {
                        error: WaveError::Contract(format!(
                            "{} contract failed with {} finding(s)",
                            contract.kind.name(),
                            outcome.diagnostics.len()
                        )),
                        diagnostics: Some(rendered),
                        tokens,
                    });
                }
                return Ok(AttemptSuccess {
                    artifacts,
                    tokens,
                    warning: Some(format!(
                        "{} contract failed (soft): {} finding(s)",
                        contract.kind.name(),
                        outcome.diagnostics.len()
                    )),
                });
            }
        }

        Ok(AttemptSuccess {
            artifacts,
            tokens,
            warning: None,
        })
    }

    // === matrix steps ===

    async fn execute_matrix(
        &self,
        step: &StepDef,
        cancel: CancellationToken,
    ) -> Result<StepReport, WaveError> {
        // Allow expect: execute() routes here only when strategy is set
        #[allow(clippy::expect_used)]
        let strategy = step.strategy.as_ref().expect("matrix step has a strategy");

        let attempt = self.stored_attempt(&step.id)? + 1;
        let started = Instant::now();
        self.mark_running(&step.id, attempt, 0)?;

        let items = match self.read_matrix_items(&strategy.items_source) {
            Ok(items) => items,
            Err(error) => {
                let duration_ms = started.elapsed().as_millis() as u64;
                return self.finish_failed(
                    &step.id,
                    error,
                    duration_ms,
                    TokenUsage::default(),
                    0,
                );
            }
        };

        let local_slots = Arc::new(Semaphore::new(strategy.max_concurrency));
        let mut join_set: JoinSet<(u32, AttemptResult)> = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let index = index as u32;
            let executor = self.clone_for_worker();
            let step = step.clone();
            let local = Arc::clone(&local_slots);
            let global = Arc::clone(&self.global_slots);
            let cancel = cancel.clone();
            let bus = Arc::clone(&self.ctx.bus);
            let run_id = self.run_id.clone();

            join_set.spawn(async move {
                // A worker needs both a matrix slot and a global slot.
                let Ok(_local_permit) = local.acquire_owned().await else {
                    return (index, Err(fail(WaveError::Cancelled, TokenUsage::default())));
                };
                let Ok(_global_permit) = global.acquire_owned().await else {
                    return (index, Err(fail(WaveError::Cancelled, TokenUsage::default())));
                };
                if cancel.is_cancelled() {
                    return (index, Err(fail(WaveError::Cancelled, TokenUsage::default())));
                }

                bus.emit(
                    Event::step(run_id.clone(), step.id.clone(), StepState::Running)
                        .with_worker_id(index)
                        .with_message(format!("matrix worker {index} started")),
                );

                let outcome = executor
                    .run_attempt(&step, attempt, Some((index, item)), None, &cancel)
                    .await;

                let (state, error) = match &outcome {
                    Ok(success) => (
                        StepState::Completed,
                        success.warning.clone(),
                    ),
                    Err(failure) => (
                        if matches!(failure.error, WaveError::Cancelled) {
                            StepState::Cancelled
                        } else {
                            StepState::Failed
                        },
                        Some(failure.error.to_string()),
                    ),
                };
                let mut event = Event::step(run_id, step.id.clone(), state)
                    .with_worker_id(index)
                    .with_message(format!("matrix worker {index} finished"));
                if state != StepState::Completed {
                    if let Some(error) = error {
                        event = event.with_error(error);
                    }
                }
                bus.emit(event);

                (index, outcome)
            });
        }

        let mut total_tokens = TokenUsage::default();
        let mut artifacts: Vec<ArtifactRecord> = Vec::new();
        let mut first_error: Option<WaveError> = None;
        let mut cancelled = false;

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((_, Ok(success))) => {
                    total_tokens.add(success.tokens);
                    artifacts.extend(success.artifacts);
                }
                Ok((_, Err(failure))) => {
                    total_tokens.add(failure.tokens);
                    if matches!(failure.error, WaveError::Cancelled) {
                        cancelled = true;
                    } else if first_error.is_none() {
                        first_error = Some(failure.error);
                    }
                }
                Err(join_error) => {
                    if first_error.is_none() {
                        first_error =
                            Some(WaveError::Invocation(format!("worker panicked: {join_error}")));
                    }
                }
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        if let Some(error) = first_error {
            return self.finish_failed(&step.id, error, duration_ms, total_tokens, 0);
        }
        if cancelled {
            return self.finish_cancelled(&step.id, duration_ms);
        }
        self.finish_completed(step, duration_ms, total_tokens, artifacts, None, 0)
    }

    fn clone_for_worker(&self) -> Self {
        Self {
            ctx: self.ctx.clone(),
            pipeline: Arc::clone(&self.pipeline),
            run_id: self.run_id.clone(),
            input: self.input.clone(),
            timeout_override: self.timeout_override,
            global_slots: Arc::clone(&self.global_slots),
        }
    }

    /// Read the matrix item list from the producing step's artifact.
    fn read_matrix_items(&self, source: &ArtifactRef) -> Result<Vec<String>, WaveError> {
        let path = self.resolve_artifact(source).ok_or_else(|| {
            WaveError::Workspace(format!("matrix items source '{source}' has no recorded path"))
        })?;
        let text = std::fs::read_to_string(&path).map_err(|e| {
            WaveError::Workspace(format!("matrix items source unreadable at {}: {e}", path.display()))
        })?;
        let items: Vec<serde_json::Value> = serde_json::from_str(&text).map_err(|e| {
            WaveError::Contract(format!("matrix items source is not a JSON array: {e}"))
        })?;
        Ok(items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect())
    }

    // === shared plumbing ===

    fn stored_attempt(&self, step_id: &StepId) -> Result<u32, WaveError> {
        self.ctx
            .store
            .load_step(&self.run_id, step_id)
            .map(|record| record.attempt)
            .map_err(|e| WaveError::StateStore(e.to_string()))
    }

    fn resolve_artifact(&self, reference: &ArtifactRef) -> Option<PathBuf> {
        let records = self
            .ctx
            .store
            .load_artifacts(&self.run_id, &reference.step)
            .ok()?;
        records
            .into_iter()
            .find(|record| record.name == reference.name)
            .map(|record| record.path)
    }

    fn render_source(&self, step: &StepDef, vars: &wave_manifest::TemplateVars) -> Result<String, WaveError> {
        let template = match (&step.exec.source, &step.exec.source_path) {
            (Some(source), _) => source.clone(),
            (None, Some(path)) => {
                let resolved = self.ctx.manifest.resolve_path(path);
                std::fs::read_to_string(&resolved).map_err(|e| {
                    WaveError::Config(format!(
                        "exec source_path unreadable at {}: {e}",
                        resolved.display()
                    ))
                })?
            }
            (None, None) => {
                return Err(WaveError::Config(format!(
                    "step '{}' has no exec source",
                    step.id
                )))
            }
        };
        wave_manifest::render(&template, vars)
            .map_err(|e| WaveError::Config(format!("step '{}': {e}", step.id)))
    }

    fn build_request(
        &self,
        step: &StepDef,
        workspace: &std::path::Path,
        prompt: String,
    ) -> Result<InvokeRequest, WaveError> {
        let manifest = &self.ctx.manifest;
        let persona = manifest
            .persona(&step.persona)
            .map_err(|e| WaveError::Config(e.to_string()))?;
        let adapter = manifest
            .adapter(&persona.adapter)
            .map_err(|e| WaveError::Config(e.to_string()))?;
        let rules = manifest
            .effective_permissions(&step.persona)
            .map_err(|e| WaveError::Config(e.to_string()))?;

        let timeout_minutes = step
            .timeout_minutes
            .unwrap_or(manifest.runtime.default_timeout_minutes);
        let timeout = self
            .timeout_override
            .unwrap_or(Duration::from_secs(timeout_minutes * 60));

        let command_prompt = match step.exec.kind {
            ExecKind::Prompt => prompt,
            // Command steps wrap the rendered command for the adapter to
            // execute verbatim.
            ExecKind::Command => format!("Run this command and report the result:\n\n{prompt}"),
        };

        Ok(InvokeRequest {
            run_id: self.run_id.to_string(),
            step_id: step.id.to_string(),
            persona: step.persona.clone(),
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
            user_prompt: command_prompt,
            workspace: workspace.to_path_buf(),
            timeout,
            env_passthrough: adapter.env_passthrough.clone(),
            extra_env: vec![
                ("WAVE_PIPELINE_ID".to_string(), self.run_id.to_string()),
                ("WAVE_STEP_ID".to_string(), step.id.to_string()),
            ],
        })
    }

    // === transitions (store first, then event) ===

    fn mark_running(&self, step_id: &StepId, attempt: u32, retry_count: u32) -> Result<(), WaveError> {
        // First entry comes from ready; relay re-entries are handled by
        // the relay engine.
        self.ctx
            .store
            .transition_step(
                &self.run_id,
                step_id,
                StepState::Running,
                StepTransition::default()
                    .with_attempt(attempt)
                    .with_retry_count(retry_count)
                    .with_started_at(chrono::Utc::now()),
            )
            .map_err(|e| WaveError::StateStore(e.to_string()))?;
        let mut event = Event::step(self.run_id.clone(), step_id.clone(), StepState::Running)
            .with_message(format!("attempt {attempt}"));
        if retry_count > 0 {
            event = event.with_retry_count(retry_count);
        }
        self.ctx.bus.emit(event);
        Ok(())
    }

    fn mark_retrying(
        &self,
        step_id: &StepId,
        retry_count: u32,
        error: &WaveError,
        duration_ms: u64,
    ) -> Result<(), WaveError> {
        self.ctx
            .store
            .transition_step(
                &self.run_id,
                step_id,
                StepState::Retrying,
                StepTransition::default()
                    .with_retry_count(retry_count)
                    .with_error(error.to_string()),
            )
            .map_err(|e| WaveError::StateStore(e.to_string()))?;
        self.ctx.bus.emit(
            Event::step(self.run_id.clone(), step_id.clone(), StepState::Retrying)
                .with_retry_count(retry_count)
                .with_duration_ms(duration_ms)
                .with_error(error.to_string())
                .with_message("contract failed, retrying with a fresh workspace"),
        );
        // Back to ready for the next attempt; the re-entry emits no
        // second ready event.
        self.ctx
            .store
            .transition_step(
                &self.run_id,
                step_id,
                StepState::Ready,
                StepTransition::default(),
            )
            .map_err(|e| WaveError::StateStore(e.to_string()))?;
        Ok(())
    }

    fn finish_completed(
        &self,
        step: &StepDef,
        duration_ms: u64,
        tokens: TokenUsage,
        artifacts: Vec<ArtifactRecord>,
        warning: Option<String>,
        retry_count: u32,
    ) -> Result<StepReport, WaveError> {
        self.ctx
            .store
            .transition_step(
                &self.run_id,
                &step.id,
                StepState::Completed,
                StepTransition::default()
                    .with_ended_at(chrono::Utc::now())
                    .with_tokens_used(tokens.total()),
            )
            .map_err(|e| WaveError::StateStore(e.to_string()))?;

        let mut event = Event::step(self.run_id.clone(), step.id.clone(), StepState::Completed)
            .with_duration_ms(duration_ms)
            .with_message(warning.clone().unwrap_or_else(|| "step completed".to_string()));
        if retry_count > 0 {
            event = event.with_retry_count(retry_count);
        }
        if !artifacts.is_empty() {
            event = event.with_artifacts(artifacts);
        }
        if warning.is_some() {
            event = event.with_meta("warning", serde_json::json!(true));
        }
        self.ctx.bus.emit(event);

        Ok(StepReport {
            step_id: step.id.clone(),
            state: StepState::Completed,
            error: None,
        })
    }

    fn finish_failed(
        &self,
        step_id: &StepId,
        error: WaveError,
        duration_ms: u64,
        tokens: TokenUsage,
        retry_count: u32,
    ) -> Result<StepReport, WaveError> {
        self.ctx
            .store
            .transition_step(
                &self.run_id,
                step_id,
                StepState::Failed,
                StepTransition::default()
                    .with_ended_at(chrono::Utc::now())
                    .with_tokens_used(tokens.total())
                    .with_error(error.to_string()),
            )
            .map_err(|e| WaveError::StateStore(e.to_string()))?;

        let mut event = Event::step(self.run_id.clone(), step_id.clone(), StepState::Failed)
            .with_duration_ms(duration_ms)
            .with_error(error.to_string())
            .with_message("step failed");
        if retry_count > 0 {
            event = event.with_retry_count(retry_count);
        }
        self.ctx.bus.emit(event);

        Ok(StepReport {
            step_id: step_id.clone(),
            state: StepState::Failed,
            error: Some(error),
        })
    }

    fn finish_cancelled(&self, step_id: &StepId, duration_ms: u64) -> Result<StepReport, WaveError> {
        self.ctx
            .store
            .transition_step(
                &self.run_id,
                step_id,
                StepState::Cancelled,
                StepTransition::default().with_ended_at(chrono::Utc::now()),
            )
            .map_err(|e| WaveError::StateStore(e.to_string()))?;
        self.ctx.bus.emit(
            Event::step(self.run_id.clone(), step_id.clone(), StepState::Cancelled)
                .with_duration_ms(duration_ms)
                .with_message("step cancelled"),
        );
        Ok(StepReport {
            step_id: step_id.clone(),
            state: StepState::Cancelled,
            error: Some(WaveError::Cancelled),
        })
    }
}

fn fail(error: WaveError, tokens: TokenUsage) -> AttemptFailure {
    AttemptFailure {
        error,
        diagnostics: None,
        tokens,
    }
}

/// Matrix worker artifacts are namespaced per worker to avoid clobbering
/// sibling records.
fn artifact_name(name: &str, worker: Option<u32>) -> String {
    match worker {
        Some(index) => format!("{name}#w{index}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
#[path = "step_tests.rs"]
mod tests;
