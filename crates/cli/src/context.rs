// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine context assembly for CLI commands

use crate::exit::CommandError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wave_adapters::{ProcessInvoker, TracedInvoker};
use wave_engine::{EngineContext, EventBus, NdjsonSink};
use wave_manifest::{Loader, Manifest, Pipeline};
use wave_storage::StateStore;

/// Location of the state database under the workspace root.
pub fn state_db_path(manifest: &Manifest) -> PathBuf {
    manifest.runtime.workspace_root.join("state.db")
}

/// Hex SHA-256 of the manifest file bytes; recorded on every run so a
/// resume can detect config drift.
pub fn manifest_fingerprint(path: &Path) -> Result<String, CommandError> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Wire the full engine: store (migrated per env policy), NDJSON event
/// bus, and the traced process invoker.
pub fn build_engine(
    manifest: Arc<Manifest>,
    manifest_path: &Path,
) -> Result<EngineContext, CommandError> {
    let store = StateStore::open(&state_db_path(&manifest))?;
    let bus = EventBus::new().with_sink(NdjsonSink);
    Ok(EngineContext::new(
        manifest,
        Arc::new(store),
        Arc::new(bus),
        Arc::new(TracedInvoker::new(ProcessInvoker::new())),
        manifest_fingerprint(manifest_path)?,
    ))
}

/// Resolve the `--pipeline` argument: an existing path wins, otherwise
/// the name is looked up under `<manifest-dir>/pipelines/`.
pub fn resolve_pipeline(
    loader: &Loader,
    manifest: &Manifest,
    reference: &str,
) -> Result<Pipeline, CommandError> {
    let direct = Path::new(reference);
    if direct.is_file() {
        return Ok(loader.load_pipeline(direct, manifest)?);
    }

    for candidate in pipeline_candidates(manifest, reference) {
        if candidate.is_file() {
            return Ok(loader.load_pipeline(&candidate, manifest)?);
        }
    }

    Err(CommandError::Config(format!(
        "pipeline '{reference}' not found (no such file, and no pipelines/{reference}.yaml under the manifest directory)"
    )))
}

/// Search locations for a pipeline referenced by name.
pub fn pipeline_candidates(manifest: &Manifest, name: &str) -> Vec<PathBuf> {
    let dir = manifest.base_dir.join("pipelines");
    vec![
        dir.join(format!("{name}.yaml")),
        dir.join(format!("{name}.yml")),
    ]
}

/// Every pipeline file under `<manifest-dir>/pipelines/`.
pub fn pipeline_files(manifest: &Manifest) -> Vec<PathBuf> {
    let dir = manifest.base_dir.join("pipelines");
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e == "yaml" || e == "yml")
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}
