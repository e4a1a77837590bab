// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact references and records

use crate::id::StepId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtifactRefError {
    #[error("artifact reference '{0}' must be '<step>/<name>'")]
    MissingSeparator(String),
    #[error("artifact reference '{0}' has an empty step or name")]
    EmptyComponent(String),
}

/// Reference to an artifact produced by another step, written as
/// `<step>/<name>` in pipeline files (`inject_artifacts`, `items_source`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactRef {
    pub step: StepId,
    pub name: String,
}

impl ArtifactRef {
    pub fn new(step: impl Into<StepId>, name: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            name: name.into(),
        }
    }

    /// Parse the `<step>/<name>` form. The name may itself contain `/`
    /// (artifacts can be paths within the producing workspace).
    pub fn parse(s: &str) -> Result<Self, ArtifactRefError> {
        let (step, name) = s
            .split_once('/')
            .ok_or_else(|| ArtifactRefError::MissingSeparator(s.to_string()))?;
        if step.is_empty() || name.is_empty() {
            return Err(ArtifactRefError::EmptyComponent(s.to_string()));
        }
        Ok(Self::new(step, name))
    }

    /// Filesystem-safe injection target: `<step>_<name>` with `/` → `_`.
    pub fn sanitized_target(&self) -> String {
        format!("{}_{}", self.step, self.name.replace('/', "_"))
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.step, self.name)
    }
}

impl TryFrom<String> for ArtifactRef {
    type Error = ArtifactRefError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ArtifactRef> for String {
    fn from(r: ArtifactRef) -> Self {
        r.to_string()
    }
}

/// A produced artifact: declared name plus its resolved absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub name: String,
    pub path: PathBuf,
}

impl ArtifactRecord {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[cfg(test)]
#[path = "artifact_tests.rs"]
mod tests;
