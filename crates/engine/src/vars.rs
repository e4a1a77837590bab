// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template variable assembly

use wave_core::{RunId, StepId};
use wave_manifest::TemplateVars;

/// Variables available while rendering one step's templates. `task` is
/// only populated for matrix workers.
pub fn step_vars(
    run_id: &RunId,
    pipeline_name: &str,
    step_id: &StepId,
    input: &str,
    task: Option<&str>,
) -> TemplateVars {
    let mut vars = TemplateVars::default()
        .with_pipeline_id(run_id.as_str())
        .with_pipeline_name(pipeline_name)
        .with_step_id(step_id.as_str())
        .with_input(input);
    if let Some(task) = task {
        vars = vars.with_task(task);
    }
    vars
}
