// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wave run`

use crate::context;
use crate::exit::{CommandError, EXIT_FAILURE, EXIT_OK};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wave_core::{RunState, StepId};
use wave_engine::{PipelineRunner, RunOptions, RunReport};
use wave_manifest::{validate, Loader, Pipeline};

pub struct RunArgs {
    pub pipeline: String,
    pub input: String,
    pub dry_run: bool,
    pub from_step: Option<String>,
    pub timeout_minutes: Option<u64>,
}

pub async fn execute(
    loader: &Loader,
    manifest_path: &Path,
    args: RunArgs,
) -> Result<i32, CommandError> {
    let manifest = Arc::new(loader.load_manifest(manifest_path)?);
    let pipeline = context::resolve_pipeline(loader, &manifest, &args.pipeline)?;

    if args.dry_run {
        print_plan(&pipeline)?;
        return Ok(EXIT_OK);
    }

    let ctx = context::build_engine(Arc::clone(&manifest), manifest_path)?;
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let options = RunOptions {
        from_step: args.from_step.map(StepId::new),
        timeout_override: args.timeout_minutes.map(|m| Duration::from_secs(m * 60)),
        cancel,
    };

    let report = PipelineRunner::new(ctx)
        .run(&pipeline, &args.input, options)
        .await?;
    Ok(summarize(&report))
}

/// Ctrl-C triggers cooperative cancellation; the scheduler drains and the
/// run is committed as cancelled.
pub fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling run");
            cancel.cancel();
        }
    });
}

/// Final human-readable summary on stderr (stdout carries the NDJSON
/// stream), and the run's exit code.
pub fn summarize(report: &RunReport) -> i32 {
    eprintln!(
        "run {} finished: {} ({} step(s))",
        report.run_id,
        report.state,
        report.steps.len()
    );
    for step in &report.steps {
        let error = step
            .last_error
            .as_deref()
            .map(|e| format!(" ({e})"))
            .unwrap_or_default();
        eprintln!("  {:<24} {}{}", step.step_id.as_str(), step.state, error);
    }
    match report.state {
        RunState::Completed => EXIT_OK,
        _ => EXIT_FAILURE,
    }
}

fn print_plan(pipeline: &Pipeline) -> Result<(), CommandError> {
    let order = validate::execution_order(pipeline)?;
    println!("pipeline: {}", pipeline.name());
    for step_id in order {
        // Allow expect: execution_order only returns ids from the pipeline
        #[allow(clippy::expect_used)]
        let step = pipeline
            .step(step_id.as_str())
            .expect("ordered step exists");
        let deps = if step.dependencies.is_empty() {
            "-".to_string()
        } else {
            step.dependencies
                .iter()
                .map(|d| d.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let shape = if step.is_matrix() { " [matrix]" } else { "" };
        println!(
            "  {:<24} persona={:<16} deps={deps}{shape}",
            step.id.as_str(),
            step.persona
        );
    }
    Ok(())
}
