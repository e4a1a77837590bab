// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-run orchestration
//!
//! Mints the run ID, seeds the state store, drives the scheduler, and
//! finalizes the run row. Run-level events frame the step stream: one
//! `running` at start, one terminal event at the end (carrying the
//! offending step and error when the run failed).

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::resume::ResumeCoordinator;
use crate::scheduler::DagScheduler;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wave_core::{Event, RunId, RunState, StepId, StepState};
use wave_manifest::Pipeline;
use wave_storage::{RunRecord, StepRecord};

#[derive(Clone, Default)]
pub struct RunOptions {
    /// Treat every step outside `from_step`'s downstream closure as
    /// already completed. Useful for re-entering a pipeline at a step
    /// whose predecessors need no artifacts.
    pub from_step: Option<StepId>,
    /// Overrides every step's timeout.
    pub timeout_override: Option<Duration>,
    pub cancel: CancellationToken,
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub state: RunState,
    pub steps: Vec<wave_storage::StepRecord>,
}

pub struct PipelineRunner {
    ctx: EngineContext,
}

impl PipelineRunner {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Execute a pipeline from scratch.
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        input: &str,
        options: RunOptions,
    ) -> Result<RunReport, EngineError> {
        if pipeline.metadata.disabled {
            return Err(EngineError::PipelineDisabled(pipeline.name().to_string()));
        }
        self.check_input(pipeline, input)?;

        let run_id = RunId::mint(pipeline.name(), chrono::Utc::now());
        let skipped = self.skipped_steps(pipeline, options.from_step.as_ref())?;

        self.ctx.store.create_run(&RunRecord {
            id: run_id.clone(),
            name: pipeline.name().to_string(),
            state: RunState::Running,
            input: input.to_string(),
            started_at: chrono::Utc::now(),
            ended_at: None,
            manifest_fingerprint: self.ctx.manifest_fingerprint.clone(),
        })?;

        let mut initial: HashMap<StepId, StepState> = HashMap::new();
        for step in &pipeline.steps {
            let state = if skipped.contains(&step.id) {
                StepState::Completed
            } else {
                StepState::Pending
            };
            let mut record =
                StepRecord::pending(run_id.clone(), step.id.clone(), step.persona.clone());
            record.state = state;
            self.ctx.store.init_step(&record)?;
            initial.insert(step.id.clone(), state);
        }

        self.drive(pipeline, run_id, input, initial, options).await
    }

    /// Resume an interrupted run.
    pub async fn resume(
        &self,
        run_id: &RunId,
        pipeline: &Pipeline,
        options: RunOptions,
    ) -> Result<RunReport, EngineError> {
        let snapshot = ResumeCoordinator::new(self.ctx.clone()).prepare(run_id, pipeline)?;
        self.ctx
            .store
            .update_run_state(run_id, RunState::Running, None)?;
        self.drive(
            pipeline,
            run_id.clone(),
            &snapshot.run.input.clone(),
            snapshot.initial,
            options,
        )
        .await
    }

    async fn drive(
        &self,
        pipeline: &Pipeline,
        run_id: RunId,
        input: &str,
        initial: HashMap<StepId, StepState>,
        options: RunOptions,
    ) -> Result<RunReport, EngineError> {
        let started = std::time::Instant::now();
        self.ctx.bus.emit(
            Event::run(run_id.clone(), RunState::Running)
                .with_message(format!("pipeline '{}' started", pipeline.name())),
        );

        let scheduler = DagScheduler::new(
            self.ctx.clone(),
            Arc::new(pipeline.clone()),
            run_id.clone(),
            input.to_string(),
            options.timeout_override,
            options.cancel.clone(),
        );
        let state = scheduler.run(&initial).await?;

        let ended_at = chrono::Utc::now();
        self.ctx.store.update_run_state(&run_id, state, Some(ended_at))?;

        let steps = self.ctx.store.load_steps(&run_id)?;
        let mut event = Event::run(run_id.clone(), state)
            .with_duration_ms(started.elapsed().as_millis() as u64)
            .with_message(format!("pipeline '{}' {}", pipeline.name(), state));
        if state == RunState::Failed {
            if let Some(failed) = steps.iter().find(|s| s.state == StepState::Failed) {
                event.step_id = Some(failed.step_id.clone());
                if let Some(error) = &failed.last_error {
                    event = event.with_error(error.clone());
                }
            }
        }
        self.ctx.bus.emit(event);

        Ok(RunReport {
            run_id,
            state,
            steps,
        })
    }

    /// Validate the input against the pipeline's declared input schema.
    /// Input that parses as JSON is validated as-is; anything else is
    /// treated as a JSON string.
    fn check_input(&self, pipeline: &Pipeline, input: &str) -> Result<(), EngineError> {
        let Some(schema_path) = pipeline.input.as_ref().and_then(|i| i.schema.as_ref()) else {
            return Ok(());
        };
        let resolved = self.ctx.manifest.resolve_path(schema_path);
        let schema_text = std::fs::read_to_string(&resolved).map_err(|e| {
            wave_manifest::ConfigError::invalid(
                "input.schema",
                format!("schema unreadable at {}: {e}", resolved.display()),
            )
        })?;
        let schema_value: serde_json::Value = serde_json::from_str(&schema_text)
            .map_err(|e| wave_manifest::ConfigError::invalid("input.schema", e.to_string()))?;
        let compiled = jsonschema::JSONSchema::options()
            .with_draft(jsonschema::Draft::Draft7)
            .compile(&schema_value)
            .map_err(|e| wave_manifest::ConfigError::invalid("input.schema", e.to_string()))?;

        let instance: serde_json::Value = serde_json::from_str(input)
            .unwrap_or_else(|_| serde_json::Value::String(input.to_string()));
        if let Err(errors) = compiled.validate(&instance) {
            let rendered = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            return Err(EngineError::Config(wave_manifest::ConfigError::invalid(
                "input",
                format!("does not match the pipeline input schema: {rendered}"),
            )));
        }
        Ok(())
    }

    /// Steps treated as already completed under `--from-step`.
    fn skipped_steps(
        &self,
        pipeline: &Pipeline,
        from_step: Option<&StepId>,
    ) -> Result<std::collections::HashSet<StepId>, EngineError> {
        let Some(from_step) = from_step else {
            return Ok(Default::default());
        };
        if pipeline.step(from_step.as_str()).is_none() {
            return Err(EngineError::UnknownFromStep(from_step.to_string()));
        }

        // Downstream closure of from_step; everything else is skipped.
        let mut affected: std::collections::HashSet<StepId> = Default::default();
        let mut queue = std::collections::VecDeque::from([from_step.clone()]);
        while let Some(current) = queue.pop_front() {
            if !affected.insert(current.clone()) {
                continue;
            }
            for dependent in pipeline.dependents_of(current.as_str()) {
                queue.push_back(dependent.id.clone());
            }
        }

        Ok(pipeline
            .steps
            .iter()
            .map(|s| s.id.clone())
            .filter(|id| !affected.contains(id))
            .collect())
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
