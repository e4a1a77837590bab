// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handover contract definitions
//!
//! A contract is the validation predicate gating a step's completion. The
//! validator (wave-engine) interprets these definitions; this module only
//! models and parses them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What to do when a `must_pass` contract fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnFailure {
    /// Destroy the workspace and re-attempt with diagnostics appended,
    /// up to `max_retries` times.
    #[default]
    Retry,
    /// Fail the step immediately.
    Halt,
}

/// The contract variant and its inputs. Paths are workspace-relative for
/// artifacts and manifest-relative for schema/spec files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContractKind {
    /// Validate an artifact against a JSON Schema.
    JsonSchema {
        /// `schema_path` is the deprecated spelling; both parse, this
        /// field is the canonical one.
        #[serde(alias = "schema_path")]
        schema: PathBuf,
        artifact: PathBuf,
    },
    /// Type-check (or at minimum syntactically check) a TypeScript file.
    TypescriptInterface {
        path: PathBuf,
        #[serde(default = "default_true")]
        type_check: bool,
    },
    /// Run a command; exit code 0 passes.
    TestSuite {
        command: String,
        /// Empty → workspace; `project_root` → git root of the manifest
        /// dir; absolute → as-is; relative → under the workspace.
        #[serde(default)]
        workdir: Option<String>,
    },
    /// Check required headings and heading hierarchy of a markdown file.
    MarkdownSpec {
        path: PathBuf,
        #[serde(default)]
        required_headings: Vec<String>,
    },
}

impl ContractKind {
    /// Short name used in diagnostics and events.
    pub fn name(&self) -> &'static str {
        match self {
            ContractKind::JsonSchema { .. } => "json_schema",
            ContractKind::TypescriptInterface { .. } => "typescript_interface",
            ContractKind::TestSuite { .. } => "test_suite",
            ContractKind::MarkdownSpec { .. } => "markdown_spec",
        }
    }
}

/// A contract plus its failure policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDef {
    #[serde(flatten)]
    pub kind: ContractKind,
    /// When false, a failure logs a warning but the step still completes.
    #[serde(default = "default_true")]
    pub must_pass: bool,
    #[serde(default)]
    pub on_failure: OnFailure,
    /// Retries after the first failed attempt; 0 means any failure is
    /// immediately terminal.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    2
}

#[cfg(test)]
#[path = "contract_tests.rs"]
mod tests;
