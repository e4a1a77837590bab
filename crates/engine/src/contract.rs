// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Contract validation
//!
//! Checks a step's output against its declared contract and reports
//! pass/fail with diagnostics. Whether a failure retries or halts is the
//! step executor's decision, not the validator's.

use jsonschema::{Draft, JSONSchema};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::process::Command;
use wave_manifest::ContractKind;

/// One validation finding, rendered into the retry prompt on failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Where the finding points: a JSON instance path, a file, a command.
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Outcome of validating one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub passed: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            diagnostics: Vec::new(),
        }
    }

    pub fn fail(diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            passed: false,
            diagnostics,
        }
    }

    pub fn fail_with(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::fail(vec![Diagnostic::new(path, message)])
    }

    /// Diagnostics as prompt-ready text.
    pub fn render_diagnostics(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| format!("- {d}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Validate a contract against a step's workspace. Schema and spec paths
/// resolve against `manifest_dir`; artifact paths against `workspace`.
pub async fn validate(
    contract: &ContractKind,
    workspace: &Path,
    manifest_dir: &Path,
) -> ValidationOutcome {
    match contract {
        ContractKind::JsonSchema { schema, artifact } => {
            validate_json_schema(&resolve(manifest_dir, schema), &workspace.join(artifact))
        }
        ContractKind::TypescriptInterface { path, type_check } => {
            validate_typescript(&workspace.join(path), *type_check).await
        }
        ContractKind::TestSuite { command, workdir } => {
            validate_test_suite(command, workdir.as_deref(), workspace, manifest_dir).await
        }
        ContractKind::MarkdownSpec {
            path,
            required_headings,
        } => validate_markdown(&workspace.join(path), required_headings),
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn validate_json_schema(schema_path: &Path, artifact_path: &Path) -> ValidationOutcome {
    let schema_text = match std::fs::read_to_string(schema_path) {
        Ok(text) => text,
        Err(e) => {
            return ValidationOutcome::fail_with(
                schema_path.display().to_string(),
                format!("schema unreadable: {e}"),
            )
        }
    };
    let schema_value: serde_json::Value = match serde_json::from_str(&schema_text) {
        Ok(value) => value,
        Err(e) => {
            return ValidationOutcome::fail_with(
                schema_path.display().to_string(),
                format!("schema is not valid JSON: {e}"),
            )
        }
    };

    let artifact_text = match std::fs::read_to_string(artifact_path) {
        Ok(text) => text,
        Err(e) => {
            return ValidationOutcome::fail_with(
                artifact_path.display().to_string(),
                format!("artifact unreadable: {e}"),
            )
        }
    };
    let instance: serde_json::Value = match serde_json::from_str(&artifact_text) {
        Ok(value) => value,
        Err(e) => {
            return ValidationOutcome::fail_with(
                artifact_path.display().to_string(),
                format!("artifact is not valid JSON: {e}"),
            )
        }
    };

    let compiled = match JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema_value)
    {
        Ok(compiled) => compiled,
        Err(e) => {
            return ValidationOutcome::fail_with(
                schema_path.display().to_string(),
                format!("schema does not compile: {e}"),
            )
        }
    };

    let outcome = match compiled.validate(&instance) {
        Ok(()) => ValidationOutcome::pass(),
        Err(errors) => ValidationOutcome::fail(
            errors
                .map(|e| Diagnostic::new(e.instance_path.to_string(), e.to_string()))
                .collect(),
        ),
    };
    outcome
}

/// Probe for a TypeScript compiler once per process.
fn tsc_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        std::process::Command::new("tsc")
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    })
}

async fn validate_typescript(path: &Path, type_check: bool) -> ValidationOutcome {
    if !path.is_file() {
        return ValidationOutcome::fail_with(
            path.display().to_string(),
            "typescript file not found",
        );
    }

    if type_check && tsc_available() {
        let output = Command::new("tsc")
            .arg("--noEmit")
            .arg("--strict")
            .arg(path)
            .output()
            .await;
        return match output {
            Ok(output) if output.status.success() => ValidationOutcome::pass(),
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let diagnostics = stdout
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .take(20)
                    .map(|l| Diagnostic::new("", l))
                    .collect();
                ValidationOutcome::fail(diagnostics)
            }
            Err(e) => ValidationOutcome::fail_with("tsc", format!("failed to run: {e}")),
        };
    }

    if type_check {
        tracing::warn!(
            path = %path.display(),
            "tsc not available; degrading to a syntactic check"
        );
    }
    syntactic_check(path)
}

/// Minimal syntactic check: bracket balance outside strings and comments.
fn syntactic_check(path: &Path) -> ValidationOutcome {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            return ValidationOutcome::fail_with(path.display().to_string(), format!("{e}"))
        }
    };

    let mut stack: Vec<char> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut in_string: Option<char> = None;
    let mut in_line_comment = false;
    let mut in_block_comment = false;

    while let Some(c) = chars.next() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
            }
            continue;
        }
        if in_block_comment {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block_comment = false;
            }
            continue;
        }
        if let Some(quote) = in_string {
            if c == '\\' {
                chars.next();
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => in_string = Some(c),
            '/' if chars.peek() == Some(&'/') => in_line_comment = true,
            '/' if chars.peek() == Some(&'*') => in_block_comment = true,
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.pop() != Some(expected) {
                    return ValidationOutcome::fail_with(
                        path.display().to_string(),
                        format!("unbalanced '{c}'"),
                    );
                }
            }
            _ => {}
        }
    }

    if stack.is_empty() {
        ValidationOutcome::pass()
    } else {
        ValidationOutcome::fail_with(
            path.display().to_string(),
            format!("{} unclosed bracket(s)", stack.len()),
        )
    }
}

async fn validate_test_suite(
    command: &str,
    workdir: Option<&str>,
    workspace: &Path,
    manifest_dir: &Path,
) -> ValidationOutcome {
    let cwd = match workdir {
        None | Some("") => workspace.to_path_buf(),
        Some("project_root") => git_root(manifest_dir)
            .await
            .unwrap_or_else(|| manifest_dir.to_path_buf()),
        Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
        Some(dir) => workspace.join(dir),
    };

    let wrapped = format!("set -euo pipefail\n{command}");
    let output = Command::new("bash")
        .arg("-c")
        .arg(&wrapped)
        .current_dir(&cwd)
        .output()
        .await;

    match output {
        Ok(output) if output.status.success() => ValidationOutcome::pass(),
        Ok(output) => {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(10).collect();
            let mut diagnostics = vec![Diagnostic::new(
                command,
                format!("exited with code {code}"),
            )];
            diagnostics.extend(
                tail.into_iter()
                    .rev()
                    .map(|line| Diagnostic::new("stderr", line)),
            );
            ValidationOutcome::fail(diagnostics)
        }
        Err(e) => ValidationOutcome::fail_with(command, format!("failed to run: {e}")),
    }
}

async fn git_root(dir: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .arg("rev-parse")
        .arg("--show-toplevel")
        .current_dir(dir)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

fn validate_markdown(path: &Path, required_headings: &[String]) -> ValidationOutcome {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            return ValidationOutcome::fail_with(
                path.display().to_string(),
                format!("markdown file unreadable: {e}"),
            )
        }
    };

    let headings: Vec<(usize, String)> = text
        .lines()
        .filter(|line| line.starts_with('#'))
        .map(|line| {
            let level = line.chars().take_while(|c| *c == '#').count();
            let title = line.trim_start_matches('#').trim().to_string();
            (level, title)
        })
        .collect();

    let mut diagnostics = Vec::new();

    for required in required_headings {
        if !headings.iter().any(|(_, title)| title == required) {
            diagnostics.push(Diagnostic::new(
                path.display().to_string(),
                format!("missing required heading '{required}'"),
            ));
        }
    }

    // Hierarchy check: a heading may go at most one level deeper than its
    // predecessor.
    let mut previous_level = 0usize;
    for (level, title) in &headings {
        if previous_level > 0 && *level > previous_level + 1 {
            diagnostics.push(Diagnostic::new(
                path.display().to_string(),
                format!("heading '{title}' jumps from level {previous_level} to {level}"),
            ));
        }
        previous_level = *level;
    }

    if headings.is_empty() {
        diagnostics.push(Diagnostic::new(
            path.display().to_string(),
            "document has no headings",
        ));
    }

    if diagnostics.is_empty() {
        ValidationOutcome::pass()
    } else {
        ValidationOutcome::fail(diagnostics)
    }
}

#[cfg(test)]
#[path = "contract_tests.rs"]
mod tests;
