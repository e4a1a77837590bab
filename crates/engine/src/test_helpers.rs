// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests

use crate::context::EngineContext;
use crate::events::{CollectSink, EventBus};
use std::sync::Arc;
use tempfile::TempDir;
use wave_adapters::FakeInvoker;
use wave_core::{RunId, RunState};
use wave_manifest::{Manifest, Pipeline};
use wave_storage::{RunRecord, StateStore, StepRecord};

/// Manifest with a json-output `claude` adapter (context window 100k) and
/// personas `navigator`, `craftsman`, `summarizer`. The workspace root
/// lives under the given temp dir.
pub(crate) fn test_manifest(dir: &TempDir) -> Manifest {
    let yaml = format!(
        r#"
apiVersion: wave/v1
kind: WaveManifest
metadata:
  name: test
adapters:
  claude:
    binary: claude
    mode: print
    output_format: json
    context_window: 100000
personas:
  navigator:
    adapter: claude
    system_prompt_file: personas/navigator.md
  craftsman:
    adapter: claude
    system_prompt_file: personas/craftsman.md
  summarizer:
    adapter: claude
    system_prompt_file: personas/summarizer.md
runtime:
  workspace_root: {}
"#,
        dir.path().join("workspaces").display()
    );
    let mut manifest: Manifest = serde_yaml::from_str(&yaml).expect("fixture manifest parses");
    manifest.base_dir = dir.path().to_path_buf();
    for persona in ["navigator", "craftsman", "summarizer"] {
        let path = dir.path().join(format!("personas/{persona}.md"));
        std::fs::create_dir_all(path.parent().expect("has parent")).expect("mkdir");
        std::fs::write(&path, format!("You are {persona}.\n")).expect("write prompt");
    }
    manifest
}

/// Engine context wired to a fake invoker, an in-memory store, and a
/// collecting event sink.
pub(crate) fn test_ctx(dir: &TempDir, fake: FakeInvoker) -> (EngineContext, CollectSink) {
    let sink = CollectSink::new();
    let ctx = EngineContext::new(
        Arc::new(test_manifest(dir)),
        Arc::new(StateStore::open_in_memory().expect("in-memory store")),
        Arc::new(EventBus::new().with_sink(sink.clone())),
        Arc::new(fake),
        "test-fingerprint".to_string(),
    );
    (ctx, sink)
}

pub(crate) fn parse_pipeline(yaml: &str) -> Pipeline {
    serde_yaml::from_str(yaml).expect("fixture pipeline parses")
}

/// Seed the store with a running run and pending rows for every step.
pub(crate) fn seed_run(ctx: &EngineContext, pipeline: &Pipeline, run_id: &str, input: &str) -> RunId {
    let run_id = RunId::new(run_id);
    ctx.store
        .create_run(&RunRecord {
            id: run_id.clone(),
            name: pipeline.name().to_string(),
            state: RunState::Running,
            input: input.to_string(),
            started_at: chrono::Utc::now(),
            ended_at: None,
            manifest_fingerprint: ctx.manifest_fingerprint.clone(),
        })
        .expect("create run");
    for step in &pipeline.steps {
        ctx.store
            .init_step(&StepRecord::pending(
                run_id.clone(),
                step.id.clone(),
                step.persona.clone(),
            ))
            .expect("init step");
    }
    run_id
}
