// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wave clean`

use crate::exit::{CommandError, EXIT_OK};
use std::path::Path;
use wave_engine::WorkspaceManager;
use wave_manifest::Loader;

/// Remove the workspace root: every run workspace and the state database.
pub fn execute(loader: &Loader, manifest_path: &Path) -> Result<i32, CommandError> {
    let manifest = loader.load_manifest(manifest_path)?;
    let workspaces = WorkspaceManager::new(manifest.runtime.workspace_root.clone());
    workspaces
        .clean_all()
        .map_err(|e| CommandError::Other(anyhow::Error::new(e)))?;
    eprintln!("removed {}", manifest.runtime.workspace_root.display());
    Ok(EXIT_OK)
}
