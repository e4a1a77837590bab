// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wave resume`

use crate::commands::run::{spawn_signal_handler, summarize};
use crate::context;
use crate::exit::CommandError;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wave_core::RunId;
use wave_engine::{PipelineRunner, RunOptions};
use wave_manifest::Loader;

pub async fn execute(
    loader: &Loader,
    manifest_path: &Path,
    pipeline_id: &str,
) -> Result<i32, CommandError> {
    let manifest = Arc::new(loader.load_manifest(manifest_path)?);
    let ctx = context::build_engine(Arc::clone(&manifest), manifest_path)?;

    // The run row names the pipeline; resolve its definition by name.
    let run_id = RunId::new(pipeline_id);
    let run = ctx.store.load_run(&run_id)?;
    let pipeline = context::resolve_pipeline(loader, &manifest, &run.name)?;

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let report = PipelineRunner::new(ctx)
        .resume(
            &run_id,
            &pipeline,
            RunOptions {
                cancel,
                ..Default::default()
            },
        )
        .await?;
    Ok(summarize(&report))
}
