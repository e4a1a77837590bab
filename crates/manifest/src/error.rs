// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration errors with precise locations

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating manifest and pipeline files.
///
/// Location strings are dotted YAML paths (`personas.navigator.temperature`)
/// so a failing key can be found without line numbers.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{location}: unknown key '{key}'")]
    UnknownKey { location: String, key: String },

    #[error("{location}: {message}")]
    Invalid { location: String, message: String },

    #[error("pipeline '{pipeline}': duplicate step id '{step}'")]
    DuplicateStep { pipeline: String, step: String },

    #[error("pipeline '{pipeline}': step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency {
        pipeline: String,
        step: String,
        dependency: String,
    },

    #[error("pipeline '{pipeline}': dependency cycle involving steps: {steps}")]
    DependencyCycle { pipeline: String, steps: String },

    #[error("step '{step}' references unknown persona '{persona}'")]
    UnknownPersona { step: String, persona: String },

    #[error("persona '{persona}' references unknown adapter '{adapter}'")]
    UnknownAdapter { persona: String, adapter: String },

    #[error("persona '{persona}': system prompt file not found: {path}")]
    MissingSystemPrompt { persona: String, path: PathBuf },

    #[error(
        "pipeline '{pipeline}': step '{step}' injects '{first}' and '{second}', \
         which both resolve to workspace target '{target}'"
    )]
    ArtifactTargetCollision {
        pipeline: String,
        step: String,
        first: String,
        second: String,
        target: String,
    },

    #[error("template error in {location}: {source}")]
    Template {
        location: String,
        #[source]
        source: crate::template::TemplateError,
    },
}

impl ConfigError {
    /// Shorthand for the common invalid-value case.
    pub fn invalid(location: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            location: location.into(),
            message: message.into(),
        }
    }
}
