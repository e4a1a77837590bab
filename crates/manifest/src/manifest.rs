// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process-wide manifest: adapters, personas, runtime settings
//!
//! Loaded once at startup and immutable thereafter. Lookups return
//! `ConfigError` naming the missing reference rather than `Option`, since
//! by the time the engine runs, validation has already resolved every name
//! and a miss is a configuration bug worth a precise message.

use crate::error::ConfigError;
use crate::permissions::PermissionRules;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default context window assumed when an adapter does not declare one.
pub const DEFAULT_CONTEXT_WINDOW: u64 = 200_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
}

/// How an adapter reports its output on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Plain text; stdout is the primary artifact, no usage reporting.
    #[default]
    Text,
    /// One JSON event per line: usage, artifacts, compaction requests.
    Json,
}

/// An external LLM CLI registered with Wave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterDef {
    /// Binary name or path.
    pub binary: String,
    /// Invocation mode understood by the binary (e.g. `print`, `repl`).
    pub mode: String,
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Rules merged under every persona using this adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_permissions: Option<PermissionRules>,
    /// Environment variables forwarded from the ambient environment to the
    /// child process (credentials never touch disk).
    #[serde(default)]
    pub env_passthrough: Vec<String>,
    /// Context window used for relay-threshold math.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,
    /// Shared protocol preamble prepended to every persona prompt for this
    /// adapter. Declared-but-unreadable is a fatal invocation error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_protocol_file: Option<PathBuf>,
}

impl AdapterDef {
    pub fn context_window(&self) -> u64 {
        self.context_window.unwrap_or(DEFAULT_CONTEXT_WINDOW)
    }

    /// Whether this adapter can report token usage to the relay engine.
    pub fn reports_usage(&self) -> bool {
        self.output_format == OutputFormat::Json
    }
}

/// A named behavioral profile: adapter + system prompt + sampling +
/// permissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDef {
    pub adapter: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub system_prompt_file: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub permissions: PermissionRules,
    /// Hook name → command. Parsed and validated for shape; enforcement is
    /// the adapter's contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<bool>,
}

/// Relay (context compaction) settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Percentage of the adapter context window that triggers a relay.
    #[serde(default = "default_token_threshold")]
    pub token_threshold_percent: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// Persona invoked to produce the checkpoint.
    #[serde(default = "default_summarizer")]
    pub summarizer_persona: String,
    /// Maximum relay chain length per attempt before `RelayExhausted`.
    #[serde(default = "default_relay_depth")]
    pub max_depth: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            token_threshold_percent: default_token_threshold(),
            strategy: None,
            summarizer_persona: default_summarizer(),
            max_depth: default_relay_depth(),
        }
    }
}

/// Budgets for meta-pipelines (pipelines that spawn pipelines) and for
/// per-run token ceilings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaPipelineConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_steps: Option<u32>,
    /// Per-run cap across all invocations, relays included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Root directory for run workspaces and the state database.
    pub workspace_root: PathBuf,
    #[serde(default = "default_max_workers")]
    pub max_concurrent_workers: usize,
    #[serde(default = "default_timeout_minutes")]
    pub default_timeout_minutes: u64,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit: Option<AuditConfig>,
    #[serde(default)]
    pub meta_pipeline: MetaPipelineConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<bool>,
    /// Free-form model-routing hints passed through to adapters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<IndexMap<String, String>>,
}

/// A mount shared into step workspaces (also used for `skill_mounts`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMount {
    pub source: String,
    pub target: String,
}

/// The process-wide configuration, loaded from `wave.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: Metadata,
    #[serde(default)]
    pub adapters: IndexMap<String, AdapterDef>,
    #[serde(default)]
    pub personas: IndexMap<String, PersonaDef>,
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub skill_mounts: Vec<SkillMount>,
    /// Skill name → path. Declared, mounted via `skill_mounts`, otherwise
    /// inert to the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<IndexMap<String, String>>,
    /// Directory the manifest was loaded from; relative paths inside the
    /// manifest resolve against it. Not part of the file format.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Manifest {
    pub fn persona(&self, name: &str) -> Result<&PersonaDef, ConfigError> {
        self.personas.get(name).ok_or_else(|| ConfigError::Invalid {
            location: format!("personas.{name}"),
            message: "persona is not defined in the manifest".to_string(),
        })
    }

    pub fn adapter(&self, name: &str) -> Result<&AdapterDef, ConfigError> {
        self.adapters.get(name).ok_or_else(|| ConfigError::Invalid {
            location: format!("adapters.{name}"),
            message: "adapter is not defined in the manifest".to_string(),
        })
    }

    /// The adapter behind a persona.
    pub fn adapter_for(&self, persona_name: &str) -> Result<&AdapterDef, ConfigError> {
        let persona = self.persona(persona_name)?;
        self.adapter(&persona.adapter)
    }

    /// Resolve a manifest-relative path.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Effective permission rules for a persona: persona rules layered
    /// over the adapter's defaults.
    pub fn effective_permissions(&self, persona_name: &str) -> Result<PermissionRules, ConfigError> {
        let persona = self.persona(persona_name)?;
        let adapter = self.adapter(&persona.adapter)?;
        Ok(match &adapter.default_permissions {
            Some(defaults) => persona.permissions.layered_over(defaults),
            None => persona.permissions.clone(),
        })
    }
}

fn default_token_threshold() -> u8 {
    80
}

fn default_summarizer() -> String {
    "summarizer".to_string()
}

fn default_relay_depth() -> u32 {
    2
}

fn default_max_workers() -> usize {
    5
}

fn default_timeout_minutes() -> u64 {
    30
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
