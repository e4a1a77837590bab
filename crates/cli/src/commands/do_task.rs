// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wave do`: ad-hoc two-step pipeline

use crate::commands::run::{spawn_signal_handler, summarize};
use crate::context;
use crate::exit::CommandError;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wave_engine::{PipelineRunner, RunOptions};
use wave_manifest::{validate, Loader, Manifest, Pipeline};

pub async fn execute(
    loader: &Loader,
    manifest_path: &Path,
    task: &str,
    persona: Option<&str>,
) -> Result<i32, CommandError> {
    let manifest = Arc::new(loader.load_manifest(manifest_path)?);
    let persona = pick_persona(&manifest, persona)?;
    let pipeline = adhoc_pipeline(&persona);
    validate::validate_pipeline(&pipeline, &manifest)?;

    let ctx = context::build_engine(Arc::clone(&manifest), manifest_path)?;
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let report = PipelineRunner::new(ctx)
        .run(
            &pipeline,
            task,
            RunOptions {
                cancel,
                ..Default::default()
            },
        )
        .await?;
    Ok(summarize(&report))
}

fn pick_persona(manifest: &Manifest, requested: Option<&str>) -> Result<String, CommandError> {
    if let Some(name) = requested {
        manifest.persona(name)?;
        return Ok(name.to_string());
    }
    // Default to the first declared persona.
    manifest
        .personas
        .keys()
        .next()
        .cloned()
        .ok_or_else(|| CommandError::Config("manifest declares no personas".to_string()))
}

/// Two steps: plan the task, then carry it out with the plan injected.
fn adhoc_pipeline(persona: &str) -> Pipeline {
    let yaml = format!(
        r#"
kind: WavePipeline
metadata:
  name: do
  description: Ad-hoc task pipeline
steps:
  - id: plan
    persona: {persona}
    exec:
      type: prompt
      source: |
        Plan how to accomplish this task. Write the plan to PLAN.md.

        Task: {{{{input}}}}
    output_artifacts:
      plan: PLAN.md
  - id: apply
    persona: {persona}
    dependencies: [plan]
    memory:
      inject_artifacts: ["plan/plan"]
    exec:
      type: prompt
      source: |
        Carry out this task. The plan from the previous step is in
        artifacts/plan_plan.

        Task: {{{{input}}}}
"#
    );
    // Allow expect: the template above is static apart from the persona name
    #[allow(clippy::expect_used)]
    serde_yaml::from_str(&yaml).expect("ad-hoc pipeline template is valid")
}
