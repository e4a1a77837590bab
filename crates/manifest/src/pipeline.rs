// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline definitions
//!
//! A pipeline is a named DAG of steps. Steps reference personas from the
//! manifest, declare dependencies on other steps, and describe what to
//! execute, which artifacts they produce, and how their output is gated.

use crate::contract::ContractDef;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use wave_core::{ArtifactRef, StepId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub release: bool,
    #[serde(default)]
    pub disabled: bool,
}

/// Where the pipeline input comes from and how it is validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDef {
    /// `cli` (the `--input` flag) is the only source in this revision.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<PathBuf>,
}

/// Cross-step conversation memory is never carried; each attempt starts
/// fresh. Declared explicitly so pipelines read unambiguously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryStrategy {
    #[default]
    Fresh,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDef {
    #[serde(default)]
    pub strategy: MemoryStrategy,
    /// Artifacts copied into this step's workspace before it runs.
    #[serde(default)]
    pub inject_artifacts: Vec<ArtifactRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecKind {
    /// `source` is a prompt template rendered and sent to the adapter.
    Prompt,
    /// `source` is a shell command run in the workspace.
    Command,
}

/// What a step executes: an inline `source` or a `source_path` file,
/// exactly one of the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecDef {
    #[serde(rename = "type")]
    pub kind: ExecKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountMode {
    #[default]
    Readonly,
    Readwrite,
}

/// A host path copied into the step workspace before execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountDef {
    /// Host path; supports template variables.
    pub source: String,
    /// Path within the workspace; supports template variables.
    pub target: String,
    #[serde(default)]
    pub mode: MountMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDef {
    #[serde(default)]
    pub mount: Vec<MountDef>,
}

/// Relay (compaction) overrides for one step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactionDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_threshold_percent: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarizer_persona: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
}

/// The handover gate between a step's execution and its terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<ContractDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compaction: Option<CompactionDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Matrix,
}

fn default_matrix_concurrency() -> usize {
    2
}

/// Parallel fanout: one worker per item of a JSON-array artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyDef {
    #[serde(rename = "type")]
    pub kind: StrategyKind,
    /// `<step>/<artifact>` whose content is a JSON array of items.
    pub items_source: ArtifactRef,
    #[serde(default = "default_matrix_concurrency")]
    pub max_concurrency: usize,
}

/// One node of the pipeline DAG.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDef {
    pub id: StepId,
    pub persona: String,
    #[serde(default)]
    pub dependencies: Vec<StepId>,
    #[serde(default)]
    pub memory: MemoryDef,
    pub exec: ExecDef,
    /// Artifact name → path within the workspace.
    #[serde(default)]
    pub output_artifacts: IndexMap<String, PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handover: Option<HandoverDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<WorkspaceDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<StrategyDef>,
    /// Per-step timeout override, minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u64>,
}

impl StepDef {
    pub fn contract(&self) -> Option<&ContractDef> {
        self.handover.as_ref().and_then(|h| h.contract.as_ref())
    }

    pub fn compaction(&self) -> Option<&CompactionDef> {
        self.handover.as_ref().and_then(|h| h.compaction.as_ref())
    }

    pub fn mounts(&self) -> &[MountDef] {
        self.workspace.as_ref().map(|w| w.mount.as_slice()).unwrap_or(&[])
    }

    pub fn is_matrix(&self) -> bool {
        self.strategy.is_some()
    }
}

/// A parsed pipeline file (`kind: WavePipeline`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub kind: String,
    pub metadata: PipelineMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<InputDef>,
    #[serde(default)]
    pub steps: Vec<StepDef>,
}

impl Pipeline {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn step(&self, id: &str) -> Option<&StepDef> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Steps that depend (directly) on `id`.
    pub fn dependents_of(&self, id: &str) -> Vec<&StepDef> {
        self.steps
            .iter()
            .filter(|s| s.dependencies.iter().any(|d| d == id))
            .collect()
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
