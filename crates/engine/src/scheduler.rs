// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The DAG scheduler
//!
//! Maintains the ready-set, dispatches step executors under the global
//! worker cap, and reacts to completions over a join set. A failed step
//! cancels its not-yet-started descendants while in-flight branches drain
//! to natural completion. External cancellation stops dispatch, signals
//! every executor, and marks the remaining steps cancelled.

use crate::context::EngineContext;
use crate::error::EngineError;
use crate::step::{StepExecutor, StepReport};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use wave_core::{Event, RunId, RunState, StepId, StepState};
use wave_manifest::Pipeline;
use wave_storage::StepTransition;

pub struct DagScheduler {
    ctx: EngineContext,
    pipeline: Arc<Pipeline>,
    run_id: RunId,
    input: String,
    timeout_override: Option<Duration>,
    cancel: CancellationToken,
}

impl DagScheduler {
    pub fn new(
        ctx: EngineContext,
        pipeline: Arc<Pipeline>,
        run_id: RunId,
        input: String,
        timeout_override: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            pipeline,
            run_id,
            input,
            timeout_override,
            cancel,
        }
    }

    /// Drive the DAG to quiescence. `initial` is the per-step state
    /// snapshot (all `pending` for a fresh run; terminal states survive a
    /// resume). Returns the terminal run state.
    pub async fn run(
        &self,
        initial: &HashMap<StepId, StepState>,
    ) -> Result<RunState, EngineError> {
        let mut completed: HashSet<StepId> = HashSet::new();
        let mut terminal: HashSet<StepId> = HashSet::new();
        let mut any_failed = false;

        for (step_id, state) in initial {
            match state {
                StepState::Completed => {
                    completed.insert(step_id.clone());
                    terminal.insert(step_id.clone());
                }
                StepState::Failed => {
                    any_failed = true;
                    terminal.insert(step_id.clone());
                }
                StepState::Cancelled => {
                    terminal.insert(step_id.clone());
                }
                _ => {}
            }
        }

        // Remaining dependency counts for schedulable steps.
        let mut pending_deps: HashMap<StepId, HashSet<StepId>> = HashMap::new();
        let mut dependents: HashMap<StepId, Vec<StepId>> = HashMap::new();
        for step in &self.pipeline.steps {
            if terminal.contains(&step.id) {
                continue;
            }
            let unsatisfied: HashSet<StepId> = step
                .dependencies
                .iter()
                .filter(|d| !completed.contains(*d))
                .cloned()
                .collect();
            for dep in &step.dependencies {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(step.id.clone());
            }
            pending_deps.insert(step.id.clone(), unsatisfied);
        }

        // Steps depending on an already-failed/cancelled step can never
        // run; cancel them up front (resume can produce this shape).
        let dead: Vec<StepId> = terminal
            .iter()
            .filter(|id| !completed.contains(*id))
            .cloned()
            .collect();
        for id in dead {
            self.cancel_descendants(&id, &dependents, &mut pending_deps, &mut terminal)?;
        }

        let mut ready: VecDeque<StepId> = VecDeque::new();
        for step in &self.pipeline.steps {
            if let Some(deps) = pending_deps.get(&step.id) {
                if deps.is_empty() {
                    self.mark_ready(&step.id)?;
                    ready.push_back(step.id.clone());
                }
            }
        }
        for id in &ready {
            pending_deps.remove(id);
        }

        let slots = Arc::new(Semaphore::new(
            self.ctx.manifest.runtime.max_concurrent_workers,
        ));
        let mut join_set: JoinSet<StepReport> = JoinSet::new();
        let mut cancel_handled = false;

        loop {
            // Dispatch as long as slots are free; the ready queue
            // preserves declaration order for determinism.
            if !self.cancel.is_cancelled() {
                while let Some(step_id) = ready.front().cloned() {
                    let Ok(permit) = Arc::clone(&slots).try_acquire_owned() else {
                        break;
                    };
                    ready.pop_front();
                    // Allow expect: validation guarantees every queued id exists
                    #[allow(clippy::expect_used)]
                    let step = self
                        .pipeline
                        .step(step_id.as_str())
                        .expect("scheduled step exists in the pipeline")
                        .clone();
                    let executor = StepExecutor::new(
                        self.ctx.clone(),
                        Arc::clone(&self.pipeline),
                        self.run_id.clone(),
                        self.input.clone(),
                        self.timeout_override,
                        Arc::clone(&slots),
                    );
                    let cancel = self.cancel.clone();
                    join_set.spawn(async move {
                        // A matrix parent only coordinates; its workers
                        // consume the global slots instead.
                        let permit = if step.is_matrix() { None } else { Some(permit) };
                        let report = executor.execute(&step, cancel).await;
                        drop(permit);
                        report
                    });
                }
            } else if !cancel_handled {
                cancel_handled = true;
                tracing::info!(run = %self.run_id, "cancellation requested; draining in-flight steps");
                // Everything not yet dispatched is cancelled outright.
                for step_id in ready.drain(..) {
                    self.mark_cancelled(&step_id)?;
                    terminal.insert(step_id);
                }
                for step_id in pending_deps.keys().cloned().collect::<Vec<_>>() {
                    self.mark_cancelled(&step_id)?;
                    terminal.insert(step_id);
                }
                pending_deps.clear();
            }

            if join_set.is_empty() && ready.is_empty() {
                break;
            }

            tokio::select! {
                joined = join_set.join_next() => {
                    let Some(joined) = joined else { continue };
                    let report = match joined {
                        Ok(report) => report,
                        Err(join_error) => {
                            tracing::error!(error = %join_error, "step task panicked");
                            any_failed = true;
                            continue;
                        }
                    };
                    terminal.insert(report.step_id.clone());
                    match report.state {
                        StepState::Completed => {
                            completed.insert(report.step_id.clone());
                            // Downstream readiness gates strictly on
                            // terminal completion.
                            for dependent in
                                dependents.get(&report.step_id).cloned().unwrap_or_default()
                            {
                                let Some(deps) = pending_deps.get_mut(&dependent) else {
                                    continue;
                                };
                                deps.remove(&report.step_id);
                                if deps.is_empty() {
                                    pending_deps.remove(&dependent);
                                    self.mark_ready(&dependent)?;
                                    ready.push_back(dependent);
                                }
                            }
                        }
                        StepState::Failed => {
                            any_failed = true;
                            self.cancel_descendants(
                                &report.step_id,
                                &dependents,
                                &mut pending_deps,
                                &mut terminal,
                            )?;
                        }
                        StepState::Cancelled => {
                            self.cancel_descendants(
                                &report.step_id,
                                &dependents,
                                &mut pending_deps,
                                &mut terminal,
                            )?;
                        }
                        other => {
                            tracing::error!(step = %report.step_id, state = %other, "executor returned a non-terminal state");
                            any_failed = true;
                        }
                    }
                }
                _ = self.cancel.cancelled(), if !cancel_handled => {
                    // Handled at the top of the loop.
                }
            }
        }

        // Anything still tracked at quiescence is unreachable.
        for step_id in pending_deps.keys().cloned().collect::<Vec<_>>() {
            self.mark_cancelled(&step_id)?;
        }

        Ok(if self.cancel.is_cancelled() {
            RunState::Cancelled
        } else if any_failed {
            RunState::Failed
        } else {
            RunState::Completed
        })
    }

    /// Cancel every transitive not-yet-started dependent of `step_id`.
    fn cancel_descendants(
        &self,
        step_id: &StepId,
        dependents: &HashMap<StepId, Vec<StepId>>,
        pending_deps: &mut HashMap<StepId, HashSet<StepId>>,
        terminal: &mut HashSet<StepId>,
    ) -> Result<(), EngineError> {
        let mut queue: VecDeque<StepId> = VecDeque::new();
        queue.push_back(step_id.clone());
        while let Some(current) = queue.pop_front() {
            for dependent in dependents.get(&current).cloned().unwrap_or_default() {
                if pending_deps.remove(&dependent).is_some() {
                    self.mark_cancelled(&dependent)?;
                    terminal.insert(dependent.clone());
                    queue.push_back(dependent);
                }
            }
        }
        Ok(())
    }

    fn mark_ready(&self, step_id: &StepId) -> Result<(), EngineError> {
        self.ctx.store.transition_step(
            &self.run_id,
            step_id,
            StepState::Ready,
            StepTransition::default(),
        )?;
        self.ctx.bus.emit(
            Event::step(self.run_id.clone(), step_id.clone(), StepState::Ready)
                .with_message("dependencies satisfied"),
        );
        Ok(())
    }

    fn mark_cancelled(&self, step_id: &StepId) -> Result<(), EngineError> {
        self.ctx.store.transition_step(
            &self.run_id,
            step_id,
            StepState::Cancelled,
            StepTransition::default().with_ended_at(chrono::Utc::now()),
        )?;
        self.ctx.bus.emit(
            Event::step(self.run_id.clone(), step_id.clone(), StepState::Cancelled)
                .with_message("cancelled before start"),
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
