// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wave-manifest: declarative configuration for Wave
//!
//! Typed models of the manifest (`wave.yaml`) and pipeline files, the
//! strict YAML loader, structural validation, template rendering, and the
//! persona permission rules.

pub mod contract;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod permissions;
pub mod pipeline;
pub mod template;
pub mod validate;

pub use contract::{ContractDef, ContractKind, OnFailure};
pub use error::ConfigError;
pub use loader::Loader;
pub use manifest::{
    AdapterDef, Manifest, Metadata, MetaPipelineConfig, OutputFormat, PersonaDef, RelayConfig,
    RuntimeConfig, SkillMount,
};
pub use permissions::{PermissionDecision, PermissionRules};
pub use pipeline::{
    ExecDef, ExecKind, HandoverDef, MemoryDef, MountDef, MountMode, Pipeline, PipelineMetadata,
    StepDef, StrategyDef,
};
pub use template::{render, TemplateError, TemplateVars};
