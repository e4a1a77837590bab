// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persona permission rules
//!
//! Patterns are glob-style over tool names with an optional parenthesized
//! argument matcher: `Write(*.go)`, `Bash(git commit*)`, `Read`. Evaluation
//! is deny-first, then allow, default block. Enforcement belongs to the
//! adapter; Wave projects these rules into the adapter's settings file and
//! exposes [`PermissionRules::evaluate`] so projections stay testable.

use glob::Pattern;
use serde::{Deserialize, Serialize};

/// Outcome of evaluating one tool call against the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionDecision {
    /// Matched an allow pattern and no deny pattern.
    Allowed,
    /// Matched a deny pattern (deny always wins).
    Denied { pattern: String },
    /// Matched nothing; blocked by default.
    Unmatched,
}

impl PermissionDecision {
    pub fn permits(&self) -> bool {
        matches!(self, PermissionDecision::Allowed)
    }
}

/// Allow/deny pattern lists carried by a persona (or adapter defaults).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRules {
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

impl PermissionRules {
    /// Evaluate a tool call. `argument` is the adapter's rendering of the
    /// call's primary argument (a path for file tools, the command line
    /// for shell tools); pass `""` for argument-less calls.
    pub fn evaluate(&self, tool: &str, argument: &str) -> PermissionDecision {
        for pattern in &self.deny {
            if pattern_matches(pattern, tool, argument) {
                return PermissionDecision::Denied {
                    pattern: pattern.clone(),
                };
            }
        }
        for pattern in &self.allowed_tools {
            if pattern_matches(pattern, tool, argument) {
                return PermissionDecision::Allowed;
            }
        }
        PermissionDecision::Unmatched
    }

    /// Validate that every pattern parses; returns the first bad pattern.
    pub fn check_patterns(&self) -> Result<(), String> {
        for raw in self.allowed_tools.iter().chain(self.deny.iter()) {
            let (tool, argument) = split_pattern(raw);
            Pattern::new(tool).map_err(|e| format!("bad pattern '{raw}': {e}"))?;
            if let Some(arg) = argument {
                Pattern::new(arg).map_err(|e| format!("bad pattern '{raw}': {e}"))?;
            }
        }
        Ok(())
    }

    /// Merge adapter defaults under persona rules. Persona entries come
    /// first so its deny patterns are reported as the matching rule.
    pub fn layered_over(&self, defaults: &PermissionRules) -> PermissionRules {
        let mut merged = self.clone();
        merged
            .allowed_tools
            .extend(defaults.allowed_tools.iter().cloned());
        merged.deny.extend(defaults.deny.iter().cloned());
        merged
    }
}

/// Split `Tool(arg-matcher)` into its tool and argument globs.
fn split_pattern(raw: &str) -> (&str, Option<&str>) {
    match raw.split_once('(') {
        Some((tool, rest)) => (tool, Some(rest.strip_suffix(')').unwrap_or(rest))),
        None => (raw, None),
    }
}

fn pattern_matches(raw: &str, tool: &str, argument: &str) -> bool {
    let (tool_glob, arg_glob) = split_pattern(raw);

    let tool_ok = Pattern::new(tool_glob)
        .map(|p| p.matches(tool))
        .unwrap_or(false);
    if !tool_ok {
        return false;
    }

    match arg_glob {
        // A bare tool pattern matches any argument
        None => true,
        Some(glob) => Pattern::new(glob)
            .map(|p| p.matches(argument))
            .unwrap_or(false),
    }
}

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod tests;
