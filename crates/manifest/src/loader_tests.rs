// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

fn write_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("personas")).unwrap();
    for persona in ["navigator", "craftsman"] {
        std::fs::write(
            dir.path().join(format!("personas/{persona}.md")),
            "prompt\n",
        )
        .unwrap();
    }
    std::fs::write(
        dir.path().join("wave.yaml"),
        r#"
apiVersion: wave/v1
kind: WaveManifest
metadata:
  name: demo
adapters:
  claude:
    binary: claude
    mode: print
personas:
  navigator:
    adapter: claude
    system_prompt_file: personas/navigator.md
  craftsman:
    adapter: claude
    system_prompt_file: personas/craftsman.md
runtime:
  workspace_root: /tmp/wave
"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("review.yaml"),
        r#"
kind: WavePipeline
metadata:
  name: review
steps:
  - id: plan
    persona: navigator
    exec: { type: prompt, source: "plan {{input}}" }
  - id: apply
    persona: craftsman
    dependencies: [plan]
    exec: { type: prompt, source: "apply" }
"#,
    )
    .unwrap();
    dir
}

#[test]
fn loads_manifest_and_pipeline_from_disk() {
    let dir = write_fixture();
    let loader = Loader::new();
    let manifest = loader.load_manifest(&dir.path().join("wave.yaml")).unwrap();
    assert_eq!(manifest.metadata.name, "demo");
    assert_eq!(manifest.base_dir, dir.path());

    let pipeline = loader
        .load_pipeline(&dir.path().join("review.yaml"), &manifest)
        .unwrap();
    assert_eq!(pipeline.name(), "review");
    assert_eq!(pipeline.steps.len(), 2);
}

#[test]
fn missing_file_reports_the_path() {
    let dir = write_fixture();
    let err = Loader::new()
        .load_manifest(&dir.path().join("ghost.yaml"))
        .unwrap_err();
    assert!(err.to_string().contains("ghost.yaml"), "{err}");
}

#[test]
fn unknown_top_level_key_is_rejected_with_location() {
    let dir = write_fixture();
    let yaml = r#"
apiVersion: wave/v1
kind: WaveManifest
metadata: { name: demo }
runtime: { workspace_root: /tmp/wave }
adaptors: {}
"#;
    let err = Loader::new()
        .manifest_from_str(yaml, dir.path(), Path::new("wave.yaml"))
        .unwrap_err();
    match err {
        ConfigError::UnknownKey { location, key } => {
            assert_eq!(location, "manifest");
            assert_eq!(key, "adaptors");
        }
        other => panic!("expected UnknownKey, got {other}"),
    }
}

#[test]
fn unknown_nested_key_reports_dotted_path() {
    let dir = write_fixture();
    let yaml = r#"
apiVersion: wave/v1
kind: WaveManifest
metadata: { name: demo }
adapters:
  claude:
    binary: claude
    mode: print
personas:
  navigator:
    adapter: claude
    system_prompt_file: personas/navigator.md
    temprature: 0.2
runtime: { workspace_root: /tmp/wave }
"#;
    let err = Loader::new()
        .manifest_from_str(yaml, dir.path(), Path::new("wave.yaml"))
        .unwrap_err();
    match err {
        ConfigError::UnknownKey { location, key } => {
            assert_eq!(location, "manifest.personas.navigator");
            assert_eq!(key, "temprature");
        }
        other => panic!("expected UnknownKey, got {other}"),
    }
}

#[test]
fn lenient_loader_ignores_unknown_keys() {
    let dir = write_fixture();
    let yaml = r#"
apiVersion: wave/v1
kind: WaveManifest
metadata: { name: demo }
adapters:
  claude:
    binary: claude
    mode: print
    legacy_flag: true
runtime: { workspace_root: /tmp/wave }
"#;
    let manifest = Loader::lenient()
        .manifest_from_str(yaml, dir.path(), Path::new("wave.yaml"))
        .unwrap();
    assert_eq!(manifest.adapters["claude"].binary, "claude");
}

#[test]
fn unknown_step_key_reports_sequence_index() {
    let dir = write_fixture();
    let loader = Loader::new();
    let manifest = loader.load_manifest(&dir.path().join("wave.yaml")).unwrap();
    let yaml = r#"
kind: WavePipeline
metadata: { name: p }
steps:
  - id: plan
    persona: navigator
    exec: { type: prompt, source: "x" }
    retries: 3
"#;
    let err = loader
        .pipeline_from_str(yaml, &manifest, Path::new("p.yaml"))
        .unwrap_err();
    match err {
        ConfigError::UnknownKey { location, key } => {
            assert_eq!(location, "pipeline.steps[0]");
            assert_eq!(key, "retries");
        }
        other => panic!("expected UnknownKey, got {other}"),
    }
}

#[test]
fn contract_schema_path_alias_loads() {
    let dir = write_fixture();
    let loader = Loader::new();
    let manifest = loader.load_manifest(&dir.path().join("wave.yaml")).unwrap();
    let yaml = r#"
kind: WavePipeline
metadata: { name: p }
steps:
  - id: plan
    persona: navigator
    exec: { type: prompt, source: "x" }
    handover:
      contract:
        type: json_schema
        schema_path: schemas/tasks.json
        artifact: tasks.json
"#;
    let pipeline = loader
        .pipeline_from_str(yaml, &manifest, Path::new("p.yaml"))
        .unwrap();
    let contract = pipeline.step("plan").unwrap().contract().unwrap();
    match &contract.kind {
        crate::contract::ContractKind::JsonSchema { schema, .. } => {
            assert_eq!(schema.to_string_lossy(), "schemas/tasks.json");
        }
        other => panic!("wrong kind: {other:?}"),
    }
}

#[test]
fn malformed_yaml_is_a_yaml_error() {
    let dir = write_fixture();
    let err = Loader::new()
        .manifest_from_str(": not yaml [", dir.path(), Path::new("wave.yaml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Yaml { .. }), "{err}");
}

#[test]
fn structural_validation_runs_after_parse() {
    let dir = write_fixture();
    // navigator's prompt file exists but the persona references a missing
    // adapter: the loader must surface the validation error.
    let yaml = r#"
apiVersion: wave/v1
kind: WaveManifest
metadata: { name: demo }
personas:
  navigator:
    adapter: ghost
    system_prompt_file: personas/navigator.md
runtime: { workspace_root: /tmp/wave }
"#;
    let err = Loader::new()
        .manifest_from_str(yaml, dir.path(), Path::new("wave.yaml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownAdapter { .. }), "{err}");
}
