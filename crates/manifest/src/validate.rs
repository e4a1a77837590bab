// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural validation for manifests and pipelines
//!
//! Everything here rejects at load time; the engine assumes a validated
//! model and never re-checks these invariants.

use crate::error::ConfigError;
use crate::manifest::Manifest;
use crate::pipeline::{Pipeline, StepDef};
use crate::template;
use std::collections::{HashMap, HashSet, VecDeque};
use wave_core::StepId;

/// Expected `kind` value for pipeline files.
pub const PIPELINE_KIND: &str = "WavePipeline";

/// Validate the manifest after parsing.
pub fn validate_manifest(manifest: &Manifest) -> Result<(), ConfigError> {
    if manifest.metadata.name.trim().is_empty() {
        return Err(ConfigError::invalid("metadata.name", "must not be empty"));
    }
    if manifest.runtime.workspace_root.as_os_str().is_empty() {
        return Err(ConfigError::invalid(
            "runtime.workspace_root",
            "must not be empty",
        ));
    }
    if manifest.runtime.relay.token_threshold_percent > 100 {
        return Err(ConfigError::invalid(
            "runtime.relay.token_threshold_percent",
            "must be between 0 and 100",
        ));
    }
    if manifest.runtime.max_concurrent_workers == 0 {
        return Err(ConfigError::invalid(
            "runtime.max_concurrent_workers",
            "must be at least 1",
        ));
    }

    for (name, adapter) in &manifest.adapters {
        if adapter.binary.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("adapters.{name}.binary"),
                "must not be empty",
            ));
        }
        if adapter.mode.trim().is_empty() {
            return Err(ConfigError::invalid(
                format!("adapters.{name}.mode"),
                "must not be empty",
            ));
        }
        if let Some(rules) = &adapter.default_permissions {
            rules.check_patterns().map_err(|message| {
                ConfigError::invalid(format!("adapters.{name}.default_permissions"), message)
            })?;
        }
    }

    for (name, persona) in &manifest.personas {
        if !manifest.adapters.contains_key(&persona.adapter) {
            return Err(ConfigError::UnknownAdapter {
                persona: name.clone(),
                adapter: persona.adapter.clone(),
            });
        }
        let prompt_path = manifest.resolve_path(&persona.system_prompt_file);
        if !prompt_path.is_file() {
            return Err(ConfigError::MissingSystemPrompt {
                persona: name.clone(),
                path: prompt_path,
            });
        }
        if let Some(t) = persona.temperature {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::invalid(
                    format!("personas.{name}.temperature"),
                    format!("{t} is outside [0.0, 1.0]"),
                ));
            }
        }
        persona.permissions.check_patterns().map_err(|message| {
            ConfigError::invalid(format!("personas.{name}.permissions"), message)
        })?;
    }

    let summarizer = &manifest.runtime.relay.summarizer_persona;
    if !manifest.personas.contains_key(summarizer) {
        tracing::warn!(
            persona = %summarizer,
            "relay summarizer persona is not defined; relays will fail if triggered"
        );
    }

    Ok(())
}

/// Validate a pipeline against the manifest it will run under.
pub fn validate_pipeline(pipeline: &Pipeline, manifest: &Manifest) -> Result<(), ConfigError> {
    let name = pipeline.name();

    if pipeline.kind != PIPELINE_KIND {
        return Err(ConfigError::invalid(
            "kind",
            format!("expected '{PIPELINE_KIND}', got '{}'", pipeline.kind),
        ));
    }
    if name.trim().is_empty() {
        return Err(ConfigError::invalid("metadata.name", "must not be empty"));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for step in &pipeline.steps {
        if !seen.insert(step.id.as_str()) {
            return Err(ConfigError::DuplicateStep {
                pipeline: name.to_string(),
                step: step.id.to_string(),
            });
        }
    }

    for step in &pipeline.steps {
        validate_step(pipeline, manifest, step)?;
    }

    // Cycle check doubles as the topological-order builder.
    execution_order(pipeline)?;

    Ok(())
}

fn validate_step(
    pipeline: &Pipeline,
    manifest: &Manifest,
    step: &StepDef,
) -> Result<(), ConfigError> {
    let pipeline_name = pipeline.name();
    let location = |field: &str| format!("steps.{}.{}", step.id, field);

    for dep in &step.dependencies {
        if pipeline.step(dep.as_str()).is_none() {
            return Err(ConfigError::UnknownDependency {
                pipeline: pipeline_name.to_string(),
                step: step.id.to_string(),
                dependency: dep.to_string(),
            });
        }
        if dep == &step.id {
            return Err(ConfigError::DependencyCycle {
                pipeline: pipeline_name.to_string(),
                steps: step.id.to_string(),
            });
        }
    }

    if !manifest.personas.contains_key(&step.persona) {
        return Err(ConfigError::UnknownPersona {
            step: step.id.to_string(),
            persona: step.persona.clone(),
        });
    }

    match (&step.exec.source, &step.exec.source_path) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::invalid(
                location("exec"),
                "source and source_path are mutually exclusive",
            ));
        }
        (None, None) => {
            return Err(ConfigError::invalid(
                location("exec"),
                "one of source or source_path is required",
            ));
        }
        _ => {}
    }

    if let Some(source) = &step.exec.source {
        check_template_refs(&location("exec.source"), source, step.is_matrix())?;
    }
    for (i, mount) in step.mounts().iter().enumerate() {
        check_template_refs(
            &format!("steps.{}.workspace.mount[{i}].source", step.id),
            &mount.source,
            step.is_matrix(),
        )?;
        check_template_refs(
            &format!("steps.{}.workspace.mount[{i}].target", step.id),
            &mount.target,
            step.is_matrix(),
        )?;
        check_workspace_relative(
            &format!("steps.{}.workspace.mount[{i}].target", step.id),
            &mount.target,
        )?;
    }

    for (artifact_name, path) in &step.output_artifacts {
        check_workspace_relative(
            &format!("steps.{}.output_artifacts.{artifact_name}", step.id),
            &path.to_string_lossy(),
        )?;
    }

    // Injected artifacts must come from declared dependencies and may not
    // collide once sanitized to workspace targets.
    let deps: HashSet<&str> = step.dependencies.iter().map(|d| d.as_str()).collect();
    let mut targets: HashMap<String, String> = HashMap::new();
    for artifact in &step.memory.inject_artifacts {
        if !deps.contains(artifact.step.as_str()) {
            return Err(ConfigError::invalid(
                location("memory.inject_artifacts"),
                format!(
                    "artifact '{artifact}' comes from '{}', which is not a declared dependency",
                    artifact.step
                ),
            ));
        }
        let target = artifact.sanitized_target();
        if let Some(first) = targets.insert(target.clone(), artifact.to_string()) {
            return Err(ConfigError::ArtifactTargetCollision {
                pipeline: pipeline_name.to_string(),
                step: step.id.to_string(),
                first,
                second: artifact.to_string(),
                target,
            });
        }
    }

    if let Some(strategy) = &step.strategy {
        if strategy.max_concurrency == 0 {
            return Err(ConfigError::invalid(
                location("strategy.max_concurrency"),
                "must be at least 1",
            ));
        }
        if !deps.contains(strategy.items_source.step.as_str()) {
            return Err(ConfigError::invalid(
                location("strategy.items_source"),
                format!(
                    "items come from '{}', which is not a declared dependency",
                    strategy.items_source.step
                ),
            ));
        }
    }

    Ok(())
}

/// Reject templates referencing unknown variables at load time, and
/// `{{task}}` outside matrix steps.
fn check_template_refs(location: &str, text: &str, is_matrix: bool) -> Result<(), ConfigError> {
    for var in template::referenced_variables(text) {
        if !template::VARIABLE_NAMES.contains(&var.as_str()) {
            return Err(ConfigError::invalid(
                location,
                format!("unknown template variable '{{{{{var}}}}}'"),
            ));
        }
        if var == "task" && !is_matrix {
            return Err(ConfigError::invalid(
                location,
                "{{task}} is only available in matrix steps",
            ));
        }
    }
    Ok(())
}

/// Workspace-internal paths must stay inside the workspace.
fn check_workspace_relative(location: &str, path: &str) -> Result<(), ConfigError> {
    if path.starts_with('/') {
        return Err(ConfigError::invalid(location, "path must be relative"));
    }
    let escapes = std::path::Path::new(path)
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir));
    if escapes {
        return Err(ConfigError::invalid(
            location,
            "path may not escape the workspace via '..'",
        ));
    }
    Ok(())
}

/// Topological order of the steps (Kahn's algorithm), or the cycle that
/// prevents one. Ties resolve in declaration order, so the result is
/// deterministic.
pub fn execution_order(pipeline: &Pipeline) -> Result<Vec<StepId>, ConfigError> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for step in &pipeline.steps {
        in_degree.insert(step.id.as_str(), step.dependencies.len());
        for dep in &step.dependencies {
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(step.id.as_str());
        }
    }

    let mut queue: VecDeque<&str> = pipeline
        .steps
        .iter()
        .filter(|s| s.dependencies.is_empty())
        .map(|s| s.id.as_str())
        .collect();

    let mut order = Vec::with_capacity(pipeline.steps.len());
    while let Some(id) = queue.pop_front() {
        order.push(StepId::new(id));
        for dependent in dependents.get(id).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if order.len() != pipeline.steps.len() {
        let ordered: HashSet<&str> = order.iter().map(|s| s.as_str()).collect();
        let mut stuck: Vec<&str> = pipeline
            .steps
            .iter()
            .map(|s| s.id.as_str())
            .filter(|id| !ordered.contains(id))
            .collect();
        stuck.sort_unstable();
        return Err(ConfigError::DependencyCycle {
            pipeline: pipeline.name().to_string(),
            steps: stuck.join(", "),
        });
    }

    Ok(order)
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
