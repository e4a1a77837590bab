// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-step workspace lifecycle
//!
//! Every step attempt runs inside `<workspace_root>/<run-id>/<step-dir>/`,
//! populated from the step's declared mounts and injected artifacts.
//! Workspaces for different (run, step) pairs share no filesystem state;
//! injected artifacts are copies, never references.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use wave_core::{ArtifactRef, RunId, StepId};
use wave_manifest::{render, MountDef, MountMode, TemplateError, TemplateVars};

/// Directories never copied into a workspace.
const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    "__pycache__",
    ".venv",
    "dist",
    "build",
    ".next",
    ".cache",
];

/// Files above this size are skipped to keep workspaces lean.
const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Subdirectory receiving injected artifacts.
const ARTIFACTS_DIR: &str = "artifacts";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("mount source does not exist: {0}")]
    MountMissing(PathBuf),

    #[error("workspace I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact {reference} has no recorded path")]
    ArtifactUnresolved { reference: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

fn io_err(path: &Path, source: std::io::Error) -> WorkspaceError {
    WorkspaceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Creates, populates, and destroys step workspaces under one root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_root(&self, run_id: &RunId) -> PathBuf {
        self.root.join(run_id.as_str())
    }

    /// Workspace directory for a step (or one matrix worker of it).
    pub fn step_dir(&self, run_id: &RunId, step_id: &StepId, worker: Option<u32>) -> PathBuf {
        let leaf = match worker {
            Some(index) => format!("{step_id}-w{index}"),
            None => step_id.to_string(),
        };
        self.run_root(run_id).join(leaf)
    }

    /// Create a fresh workspace and copy each declared mount into it.
    ///
    /// Mount `source`/`target` strings are rendered with the template
    /// variables first. Readonly mounts are chmodded after the copy so
    /// the copy itself is not blocked by the permission change.
    pub fn create(
        &self,
        run_id: &RunId,
        step_id: &StepId,
        worker: Option<u32>,
        mounts: &[MountDef],
        vars: &TemplateVars,
    ) -> Result<PathBuf, WorkspaceError> {
        let workspace = self.step_dir(run_id, step_id, worker);
        if workspace.exists() {
            fs::remove_dir_all(&workspace).map_err(|e| io_err(&workspace, e))?;
        }
        fs::create_dir_all(&workspace).map_err(|e| io_err(&workspace, e))?;

        for mount in mounts {
            let source = PathBuf::from(render(&mount.source, vars)?);
            let target = workspace.join(render(&mount.target, vars)?);

            if !source.exists() {
                return Err(WorkspaceError::MountMissing(source));
            }

            copy_recursive(&source, &target)?;
            if mount.mode == MountMode::Readonly {
                set_readonly_recursive(&target)?;
            }
        }

        Ok(workspace)
    }

    /// Copy referenced artifacts into `<workspace>/artifacts/`, named
    /// `<source_step>_<sanitized_name>`. `resolve` maps a reference to
    /// the producing step's recorded absolute path.
    pub fn inject_artifacts<F>(
        &self,
        workspace: &Path,
        refs: &[ArtifactRef],
        resolve: F,
    ) -> Result<Vec<PathBuf>, WorkspaceError>
    where
        F: Fn(&ArtifactRef) -> Option<PathBuf>,
    {
        if refs.is_empty() {
            return Ok(Vec::new());
        }
        let dir = workspace.join(ARTIFACTS_DIR);
        fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;

        let mut injected = Vec::with_capacity(refs.len());
        for reference in refs {
            let source = resolve(reference).ok_or_else(|| WorkspaceError::ArtifactUnresolved {
                reference: reference.to_string(),
            })?;
            if !source.exists() {
                return Err(WorkspaceError::ArtifactUnresolved {
                    reference: reference.to_string(),
                });
            }
            let target = dir.join(reference.sanitized_target());
            copy_recursive(&source, &target)?;
            injected.push(target);
        }
        Ok(injected)
    }

    /// Destroy one step workspace (retry contamination control).
    pub fn destroy(&self, workspace: &Path) -> Result<(), WorkspaceError> {
        if !workspace.starts_with(&self.root) {
            // Containment invariant; a path outside the root is a bug.
            return Ok(());
        }
        if workspace.exists() {
            // Readonly mounts block removal unless re-opened first.
            set_writable_recursive(workspace)?;
            fs::remove_dir_all(workspace).map_err(|e| io_err(workspace, e))?;
        }
        Ok(())
    }

    /// Remove a whole run's workspace tree.
    pub fn clean_run(&self, run_id: &RunId) -> Result<(), WorkspaceError> {
        let dir = self.run_root(run_id);
        if dir.exists() {
            set_writable_recursive(&dir)?;
            fs::remove_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        }
        Ok(())
    }

    /// Remove the entire workspace root.
    pub fn clean_all(&self) -> Result<(), WorkspaceError> {
        if self.root.exists() {
            set_writable_recursive(&self.root)?;
            fs::remove_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;
        }
        Ok(())
    }

    /// Run directories under the root, oldest first. Retention policies
    /// walk this list.
    pub fn list_sorted_by_time(&self) -> Result<Vec<(PathBuf, SystemTime)>, WorkspaceError> {
        let mut entries = Vec::new();
        if !self.root.exists() {
            return Ok(entries);
        }
        for entry in fs::read_dir(&self.root).map_err(|e| io_err(&self.root, e))? {
            let entry = entry.map_err(|e| io_err(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            entries.push((path, modified));
        }
        entries.sort_by_key(|(_, t)| *t);
        Ok(entries)
    }
}

/// Copy a file or directory tree, skipping heavyweight directories and
/// files larger than [`MAX_FILE_SIZE`].
fn copy_recursive(source: &Path, target: &Path) -> Result<(), WorkspaceError> {
    let meta = fs::metadata(source).map_err(|e| io_err(source, e))?;

    if meta.is_file() {
        if meta.len() > MAX_FILE_SIZE {
            tracing::debug!(path = %source.display(), size = meta.len(), "skipping oversized file");
            return Ok(());
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        fs::copy(source, target).map_err(|e| io_err(source, e))?;
        return Ok(());
    }

    fs::create_dir_all(target).map_err(|e| io_err(target, e))?;
    for entry in fs::read_dir(source).map_err(|e| io_err(source, e))? {
        let entry = entry.map_err(|e| io_err(source, e))?;
        let name = entry.file_name();
        if let Some(name_str) = name.to_str() {
            if entry.path().is_dir() && SKIP_DIRS.contains(&name_str) {
                continue;
            }
        }
        copy_recursive(&entry.path(), &target.join(&name))?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode_recursive(path: &Path, file_mode: u32, dir_mode: u32) -> Result<(), WorkspaceError> {
    use std::os::unix::fs::PermissionsExt;

    let meta = fs::symlink_metadata(path).map_err(|e| io_err(path, e))?;
    if meta.file_type().is_symlink() {
        return Ok(());
    }
    if meta.is_dir() {
        for entry in fs::read_dir(path).map_err(|e| io_err(path, e))? {
            let entry = entry.map_err(|e| io_err(path, e))?;
            set_mode_recursive(&entry.path(), file_mode, dir_mode)?;
        }
        fs::set_permissions(path, fs::Permissions::from_mode(dir_mode))
            .map_err(|e| io_err(path, e))?;
    } else {
        fs::set_permissions(path, fs::Permissions::from_mode(file_mode))
            .map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

#[cfg(unix)]
fn set_readonly_recursive(path: &Path) -> Result<(), WorkspaceError> {
    set_mode_recursive(path, 0o444, 0o555)
}

#[cfg(unix)]
fn set_writable_recursive(path: &Path) -> Result<(), WorkspaceError> {
    set_mode_recursive(path, 0o644, 0o755)
}

#[cfg(not(unix))]
fn set_readonly_recursive(_path: &Path) -> Result<(), WorkspaceError> {
    Ok(())
}

#[cfg(not(unix))]
fn set_writable_recursive(_path: &Path) -> Result<(), WorkspaceError> {
    Ok(())
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
