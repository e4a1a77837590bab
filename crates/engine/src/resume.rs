// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The resume coordinator
//!
//! Rebuilds in-memory state for an interrupted run. Terminal steps are
//! preserved; anything caught mid-flight is demoted to `pending` and its
//! workspace destroyed, since an interrupted attempt cannot be trusted. A
//! `completed` step whose recorded artifacts are gone from disk is
//! demoted too, since dependents must never receive dangling paths.

use crate::context::EngineContext;
use crate::error::EngineError;
use std::collections::HashMap;
use wave_core::{RunId, StepId, StepState};
use wave_manifest::Pipeline;
use wave_storage::{RunRecord, StepRecord};

#[derive(Debug)]
pub struct ResumeSnapshot {
    pub run: RunRecord,
    pub initial: HashMap<StepId, StepState>,
}

pub struct ResumeCoordinator {
    ctx: EngineContext,
}

impl ResumeCoordinator {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Load the run and compute the initial scheduler snapshot.
    pub fn prepare(
        &self,
        run_id: &RunId,
        pipeline: &Pipeline,
    ) -> Result<ResumeSnapshot, EngineError> {
        let run = self.ctx.store.load_run(run_id)?;
        if run.manifest_fingerprint != self.ctx.manifest_fingerprint {
            tracing::warn!(
                run = %run_id,
                "manifest changed since this run was created; resuming against the current manifest"
            );
        }

        let records: HashMap<StepId, StepRecord> = self
            .ctx
            .store
            .load_steps(run_id)?
            .into_iter()
            .map(|r| (r.step_id.clone(), r))
            .collect();

        let mut initial = HashMap::new();
        for step in &pipeline.steps {
            let state = match records.get(&step.id) {
                Some(record) => self.effective_state(run_id, record)?,
                None => {
                    // The pipeline grew a step since the run was created.
                    self.ctx.store.init_step(&StepRecord::pending(
                        run_id.clone(),
                        step.id.clone(),
                        step.persona.clone(),
                    ))?;
                    StepState::Pending
                }
            };
            initial.insert(step.id.clone(), state);
        }

        Ok(ResumeSnapshot { run, initial })
    }

    fn effective_state(
        &self,
        run_id: &RunId,
        record: &StepRecord,
    ) -> Result<StepState, EngineError> {
        match record.state {
            StepState::Failed | StepState::Cancelled => Ok(record.state),
            StepState::Completed => {
                let artifacts = self.ctx.store.load_artifacts(run_id, &record.step_id)?;
                let intact = artifacts.iter().all(|a| a.path.exists());
                if intact {
                    Ok(StepState::Completed)
                } else {
                    tracing::warn!(
                        step = %record.step_id,
                        "completed step has missing artifacts; re-running it"
                    );
                    self.demote(run_id, &record.step_id)?;
                    Ok(StepState::Pending)
                }
            }
            // The interrupted attempt's workspace is invalid.
            StepState::Pending
            | StepState::Ready
            | StepState::Running
            | StepState::Retrying
            | StepState::Relaying => {
                self.demote(run_id, &record.step_id)?;
                Ok(StepState::Pending)
            }
        }
    }

    fn demote(&self, run_id: &RunId, step_id: &StepId) -> Result<(), EngineError> {
        let workspace = self.ctx.workspaces.step_dir(run_id, step_id, None);
        if let Err(e) = self.ctx.workspaces.destroy(&workspace) {
            tracing::warn!(step = %step_id, error = %e, "failed to remove stale workspace");
        }
        self.ctx.store.demote_step_for_resume(run_id, step_id)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "resume_tests.rs"]
mod tests;
