// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Template variable rendering
//!
//! Rendering is a pure function over a closed variable set. Placeholders
//! use `{{name}}` syntax. Unknown names and variables that are not
//! populated in the current context are errors, never silent empty
//! substitutions.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Regex pattern for `{{variable_name}}` placeholders.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}")
        .expect("constant regex pattern is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template variable '{{{{{0}}}}}'")]
    UnknownVariable(String),
    #[error("template variable '{{{{{0}}}}}' is not available in this context")]
    Unavailable(String),
}

/// The enumerated variable set available to templates.
///
/// `input` is the pipeline input, `task` the matrix item (matrix steps
/// only), the rest identify the run and step being rendered.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    pub input: Option<String>,
    pub task: Option<String>,
    pub pipeline_id: Option<String>,
    pub step_id: Option<String>,
    pub pipeline_name: Option<String>,
}

impl TemplateVars {
    /// Look up a variable. `Ok(None)` means the name is known but not
    /// populated in this context.
    fn get(&self, name: &str) -> Result<Option<&str>, TemplateError> {
        match name {
            "input" => Ok(self.input.as_deref()),
            "task" => Ok(self.task.as_deref()),
            "pipeline_id" => Ok(self.pipeline_id.as_deref()),
            "step_id" => Ok(self.step_id.as_deref()),
            "pipeline_name" => Ok(self.pipeline_name.as_deref()),
            other => Err(TemplateError::UnknownVariable(other.to_string())),
        }
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    pub fn with_pipeline_id(mut self, id: impl Into<String>) -> Self {
        self.pipeline_id = Some(id.into());
        self
    }

    pub fn with_step_id(mut self, id: impl Into<String>) -> Self {
        self.step_id = Some(id.into());
        self
    }

    pub fn with_pipeline_name(mut self, name: impl Into<String>) -> Self {
        self.pipeline_name = Some(name.into());
        self
    }
}

/// Substitute every `{{name}}` placeholder in `template`.
pub fn render(template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut last_end = 0;

    for caps in VAR_PATTERN.captures_iter(template) {
        // Allow expect: group 0 always exists for a match
        #[allow(clippy::expect_used)]
        let whole = caps.get(0).expect("match has a full capture");
        let name = &caps[1];

        let value = vars
            .get(name)?
            .ok_or_else(|| TemplateError::Unavailable(name.to_string()))?;

        result.push_str(&template[last_end..whole.start()]);
        result.push_str(value);
        last_end = whole.end();
    }

    result.push_str(&template[last_end..]);
    Ok(result)
}

/// Collect the distinct variable names referenced by a template, without
/// rendering. Used by validation to reject unknown names at load time.
pub fn referenced_variables(template: &str) -> Vec<String> {
    let mut names: Vec<String> = VAR_PATTERN
        .captures_iter(template)
        .map(|c| c[1].to_string())
        .collect();
    names.sort();
    names.dedup();
    names
}

/// The closed set of valid variable names.
pub const VARIABLE_NAMES: &[&str] = &["input", "task", "pipeline_id", "step_id", "pipeline_name"];

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
