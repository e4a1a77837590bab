// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Strict YAML loading
//!
//! Files are parsed to a `serde_yaml::Value` first so unknown keys can be
//! reported with dotted-path locations before typed deserialization. The
//! key tables below are the sealed schema; strict mode (the default)
//! rejects unknown keys, lenient mode downgrades them to warnings.

use crate::error::ConfigError;
use crate::manifest::Manifest;
use crate::pipeline::Pipeline;
use crate::validate;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// Schema node for the unknown-key walker.
enum KeySchema {
    /// Mapping with a fixed key set.
    Map(&'static [(&'static str, KeySchema)]),
    /// Mapping with arbitrary keys, each value checked against one schema.
    AnyMap(&'static KeySchema),
    /// Sequence, each element checked against one schema.
    Seq(&'static KeySchema),
    /// Scalar or free-form structure; not descended into.
    Any,
}

const ANY: KeySchema = KeySchema::Any;

const PERMISSIONS: KeySchema = KeySchema::Map(&[
    ("allowed_tools", KeySchema::Seq(&ANY)),
    ("deny", KeySchema::Seq(&ANY)),
]);

const ADAPTER: KeySchema = KeySchema::Map(&[
    ("binary", ANY),
    ("mode", ANY),
    ("output_format", ANY),
    ("default_permissions", PERMISSIONS),
    ("env_passthrough", KeySchema::Seq(&ANY)),
    ("context_window", ANY),
    ("base_protocol_file", ANY),
]);

const PERSONA: KeySchema = KeySchema::Map(&[
    ("adapter", ANY),
    ("description", ANY),
    ("system_prompt_file", ANY),
    ("temperature", ANY),
    ("model", ANY),
    ("permissions", PERMISSIONS),
    ("hooks", KeySchema::AnyMap(&ANY)),
    ("sandbox", ANY),
]);

const RELAY: KeySchema = KeySchema::Map(&[
    ("token_threshold_percent", ANY),
    ("strategy", ANY),
    ("summarizer_persona", ANY),
    ("max_depth", ANY),
]);

const META_PIPELINE: KeySchema = KeySchema::Map(&[
    ("max_depth", ANY),
    ("max_total_steps", ANY),
    ("max_total_tokens", ANY),
    ("timeout_minutes", ANY),
]);

const RUNTIME: KeySchema = KeySchema::Map(&[
    ("workspace_root", ANY),
    ("max_concurrent_workers", ANY),
    ("default_timeout_minutes", ANY),
    ("relay", RELAY),
    ("audit", KeySchema::Map(&[("enabled", ANY)])),
    ("meta_pipeline", META_PIPELINE),
    ("sandbox", ANY),
    ("routing", KeySchema::AnyMap(&ANY)),
]);

const MANIFEST: KeySchema = KeySchema::Map(&[
    ("apiVersion", ANY),
    ("kind", ANY),
    (
        "metadata",
        KeySchema::Map(&[("name", ANY), ("description", ANY), ("repo", ANY)]),
    ),
    ("adapters", KeySchema::AnyMap(&ADAPTER)),
    ("personas", KeySchema::AnyMap(&PERSONA)),
    ("runtime", RUNTIME),
    (
        "skill_mounts",
        KeySchema::Seq(&KeySchema::Map(&[("source", ANY), ("target", ANY)])),
    ),
    ("skills", KeySchema::AnyMap(&ANY)),
]);

// Contract keys are the union of all variant fields; the tagged enum
// rejects fields that do not belong to the declared `type`.
const CONTRACT: KeySchema = KeySchema::Map(&[
    ("type", ANY),
    ("schema", ANY),
    ("schema_path", ANY),
    ("artifact", ANY),
    ("path", ANY),
    ("type_check", ANY),
    ("command", ANY),
    ("workdir", ANY),
    ("required_headings", KeySchema::Seq(&ANY)),
    ("must_pass", ANY),
    ("on_failure", ANY),
    ("max_retries", ANY),
]);

const STEP: KeySchema = KeySchema::Map(&[
    ("id", ANY),
    ("persona", ANY),
    ("dependencies", KeySchema::Seq(&ANY)),
    (
        "memory",
        KeySchema::Map(&[("strategy", ANY), ("inject_artifacts", KeySchema::Seq(&ANY))]),
    ),
    (
        "exec",
        KeySchema::Map(&[("type", ANY), ("source", ANY), ("source_path", ANY)]),
    ),
    ("output_artifacts", KeySchema::AnyMap(&ANY)),
    (
        "handover",
        KeySchema::Map(&[
            ("contract", CONTRACT),
            (
                "compaction",
                KeySchema::Map(&[
                    ("token_threshold_percent", ANY),
                    ("summarizer_persona", ANY),
                    ("max_depth", ANY),
                ]),
            ),
        ]),
    ),
    (
        "workspace",
        KeySchema::Map(&[(
            "mount",
            KeySchema::Seq(&KeySchema::Map(&[
                ("source", ANY),
                ("target", ANY),
                ("mode", ANY),
            ])),
        )]),
    ),
    (
        "strategy",
        KeySchema::Map(&[
            ("type", ANY),
            ("items_source", ANY),
            ("max_concurrency", ANY),
        ]),
    ),
    ("timeout_minutes", ANY),
]);

const PIPELINE: KeySchema = KeySchema::Map(&[
    ("kind", ANY),
    (
        "metadata",
        KeySchema::Map(&[
            ("name", ANY),
            ("description", ANY),
            ("release", ANY),
            ("disabled", ANY),
        ]),
    ),
    ("input", KeySchema::Map(&[("source", ANY), ("schema", ANY)])),
    ("steps", KeySchema::Seq(&STEP)),
]);

/// Loads and validates manifest and pipeline files.
#[derive(Debug, Clone, Copy)]
pub struct Loader {
    strict: bool,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    /// Strict loader: unknown keys are errors.
    pub fn new() -> Self {
        Self { strict: true }
    }

    /// Lenient loader: unknown keys log a warning and are ignored.
    pub fn lenient() -> Self {
        Self { strict: false }
    }

    pub fn load_manifest(&self, path: &Path) -> Result<Manifest, ConfigError> {
        let text = read(path)?;
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        self.manifest_from_str(&text, &base_dir, path)
    }

    /// Parse a manifest from a string; `origin` only labels errors.
    pub fn manifest_from_str(
        &self,
        yaml: &str,
        base_dir: &Path,
        origin: &Path,
    ) -> Result<Manifest, ConfigError> {
        let value = parse_value(yaml, origin)?;
        self.check_keys(&value, &MANIFEST, "manifest")?;
        let mut manifest: Manifest =
            serde_yaml::from_value(value).map_err(|source| ConfigError::Yaml {
                path: origin.to_path_buf(),
                source,
            })?;
        manifest.base_dir = base_dir.to_path_buf();
        validate::validate_manifest(&manifest)?;
        Ok(manifest)
    }

    pub fn load_pipeline(&self, path: &Path, manifest: &Manifest) -> Result<Pipeline, ConfigError> {
        let text = read(path)?;
        self.pipeline_from_str(&text, manifest, path)
    }

    /// Parse a pipeline from a string; `origin` only labels errors.
    pub fn pipeline_from_str(
        &self,
        yaml: &str,
        manifest: &Manifest,
        origin: &Path,
    ) -> Result<Pipeline, ConfigError> {
        let value = parse_value(yaml, origin)?;
        self.check_keys(&value, &PIPELINE, "pipeline")?;
        let pipeline: Pipeline =
            serde_yaml::from_value(value).map_err(|source| ConfigError::Yaml {
                path: origin.to_path_buf(),
                source,
            })?;
        validate::validate_pipeline(&pipeline, manifest)?;
        Ok(pipeline)
    }

    fn check_keys(&self, value: &Value, schema: &KeySchema, path: &str) -> Result<(), ConfigError> {
        match schema {
            KeySchema::Any => Ok(()),
            KeySchema::Seq(element) => {
                let Value::Sequence(items) = value else {
                    return Ok(());
                };
                for (i, item) in items.iter().enumerate() {
                    self.check_keys(item, element, &format!("{path}[{i}]"))?;
                }
                Ok(())
            }
            KeySchema::AnyMap(element) => {
                let Value::Mapping(map) = value else {
                    return Ok(());
                };
                for (key, inner) in map {
                    if let Value::String(name) = key {
                        self.check_keys(inner, element, &format!("{path}.{name}"))?;
                    }
                }
                Ok(())
            }
            KeySchema::Map(fields) => {
                let Value::Mapping(map) = value else {
                    return Ok(());
                };
                for (key, inner) in map {
                    let Value::String(name) = key else {
                        continue;
                    };
                    match fields.iter().find(|(field, _)| *field == name.as_str()) {
                        Some((_, field_schema)) => {
                            self.check_keys(inner, field_schema, &format!("{path}.{name}"))?;
                        }
                        None if self.strict => {
                            return Err(ConfigError::UnknownKey {
                                location: path.to_string(),
                                key: name.clone(),
                            });
                        }
                        None => {
                            tracing::warn!(location = %path, key = %name, "ignoring unknown key");
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_value(yaml: &str, origin: &Path) -> Result<Value, ConfigError> {
    serde_yaml::from_str(yaml).map_err(|source| ConfigError::Yaml {
        path: origin.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
