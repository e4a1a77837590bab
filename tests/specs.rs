// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI-level specs: drive the `wave` binary against a scaffolded project
//! with a stub adapter script standing in for the LLM CLI.

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const TASKS_SCHEMA: &str = r#"{
  "type": "array",
  "items": {
    "type": "object",
    "required": ["task"],
    "properties": { "task": { "type": "string" } }
  }
}"#;

/// Scaffold a project: manifest, personas, schema, pipelines, and an
/// executable stub adapter that writes `tasks.json` and reports events.
fn scaffold() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let root = dir.path();

    std::fs::create_dir_all(root.join("personas")).expect("mkdir personas");
    std::fs::create_dir_all(root.join("pipelines")).expect("mkdir pipelines");
    std::fs::create_dir_all(root.join("schemas")).expect("mkdir schemas");
    for persona in ["navigator", "craftsman", "summarizer"] {
        std::fs::write(
            root.join(format!("personas/{persona}.md")),
            format!("You are {persona}.\n"),
        )
        .expect("write persona");
    }
    std::fs::write(root.join("schemas/tasks.json"), TASKS_SCHEMA).expect("write schema");

    let adapter = root.join("stub-adapter");
    std::fs::write(
        &adapter,
        r#"#!/usr/bin/env bash
cat > tasks.json <<'EOF'
[{"task":"alpha"},{"task":"beta"}]
EOF
echo '{"type":"usage","input_tokens":120,"output_tokens":30}'
echo '{"type":"message","content":"worked on it"}'
echo '{"type":"result","text":"done"}'
"#,
    )
    .expect("write stub adapter");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&adapter, std::fs::Permissions::from_mode(0o755))
            .expect("chmod stub adapter");
    }

    std::fs::write(
        root.join("wave.yaml"),
        format!(
            r#"
apiVersion: wave/v1
kind: WaveManifest
metadata:
  name: specs
adapters:
  stub:
    binary: {}
    mode: print
    output_format: json
personas:
  navigator:
    adapter: stub
    system_prompt_file: personas/navigator.md
  craftsman:
    adapter: stub
    system_prompt_file: personas/craftsman.md
  summarizer:
    adapter: stub
    system_prompt_file: personas/summarizer.md
runtime:
  workspace_root: {}
"#,
            adapter.display(),
            root.join("workspaces").display()
        ),
    )
    .expect("write manifest");

    std::fs::write(
        root.join("pipelines/demo.yaml"),
        r#"
kind: WavePipeline
metadata:
  name: demo
  description: Two-step demo
steps:
  - id: plan
    persona: navigator
    exec:
      type: prompt
      source: "Plan the work for: {{input}}"
    output_artifacts:
      tasks: tasks.json
    handover:
      contract:
        type: json_schema
        schema: schemas/tasks.json
        artifact: tasks.json
  - id: apply
    persona: craftsman
    dependencies: [plan]
    memory:
      inject_artifacts: ["plan/tasks"]
    exec:
      type: prompt
      source: "Apply the plan"
"#,
    )
    .expect("write pipeline");

    dir
}

fn wave(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wave").expect("wave binary");
    cmd.current_dir(root).arg("--manifest").arg("wave.yaml");
    cmd
}

fn ndjson_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| l.starts_with('{'))
        .map(|l| serde_json::from_str(l).expect("event line parses"))
        .collect()
}

#[test]
fn validate_reports_ok_for_a_sound_project() {
    let dir = scaffold();
    wave(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicates::str::contains("manifest: ok"))
        .stdout(predicates::str::contains("pipeline demo: ok"));
}

#[test]
fn validate_fails_on_unknown_keys() {
    let dir = scaffold();
    let manifest_path = dir.path().join("wave.yaml");
    let mut text = std::fs::read_to_string(&manifest_path).expect("read manifest");
    text.push_str("\nunexpected_key: true\n");
    std::fs::write(&manifest_path, text).expect("write manifest");

    let assert = wave(dir.path()).arg("validate").assert().code(1);
    assert.stdout(predicates::str::contains("unexpected_key"));
}

#[test]
fn run_executes_the_pipeline_and_streams_ndjson() {
    let dir = scaffold();
    let assert = wave(dir.path())
        .args(["run", "--pipeline", "demo", "--input", "hello"])
        .assert()
        .success();

    let events = ndjson_lines(&assert.get_output().stdout);
    assert!(!events.is_empty());

    // Every event carries the run id and a timestamp with timezone.
    let run_id = events[0]["pipeline_id"].as_str().expect("run id");
    assert!(run_id.starts_with("demo-"), "{run_id}");
    for event in &events {
        assert_eq!(event["pipeline_id"].as_str(), Some(run_id));
        let ts = event["timestamp"].as_str().expect("timestamp");
        assert!(ts.ends_with('Z') || ts.contains('+'), "{ts}");
    }

    // plan walked ready → running → completed before apply's ready.
    let step_states: Vec<(String, String)> = events
        .iter()
        .filter_map(|e| {
            Some((
                e.get("step_id")?.as_str()?.to_string(),
                e["state"].as_str()?.to_string(),
            ))
        })
        .collect();
    let pos = |step: &str, state: &str| {
        step_states
            .iter()
            .position(|(s, st)| s == step && st == state)
            .unwrap_or_else(|| panic!("missing {step}/{state} in {step_states:?}"))
    };
    assert!(pos("plan", "ready") < pos("plan", "running"));
    assert!(pos("plan", "running") < pos("plan", "completed"));
    assert!(pos("plan", "completed") < pos("apply", "ready"));

    // The final event is the run-level terminal state.
    let last = events.last().expect("events non-empty");
    assert!(last.get("step_id").is_none());
    assert_eq!(last["state"].as_str(), Some("completed"));

    // The injected artifact reached apply's workspace as a copy.
    let injected = dir
        .path()
        .join("workspaces")
        .join(run_id)
        .join("apply/artifacts/plan_tasks");
    assert!(injected.is_file(), "missing {}", injected.display());
}

#[test]
fn run_with_unknown_pipeline_is_a_config_error() {
    let dir = scaffold();
    wave(dir.path())
        .args(["run", "--pipeline", "ghost", "--input", "x"])
        .assert()
        .code(2);
}

#[test]
fn run_with_broken_manifest_is_a_config_error() {
    let dir = scaffold();
    std::fs::write(dir.path().join("wave.yaml"), "kind: [broken").expect("write manifest");
    wave(dir.path())
        .args(["run", "--pipeline", "demo", "--input", "x"])
        .assert()
        .code(2);
}

#[test]
fn failing_contract_fails_the_run_with_exit_one() {
    let dir = scaffold();
    // Stub that produces schema-invalid output.
    let adapter = dir.path().join("stub-adapter");
    std::fs::write(
        &adapter,
        "#!/usr/bin/env bash\necho '[{\"task\":1}]' > tasks.json\n",
    )
    .expect("write stub");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&adapter, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");
    }

    let assert = wave(dir.path())
        .args(["run", "--pipeline", "demo", "--input", "x"])
        .assert()
        .code(1);

    let events = ndjson_lines(&assert.get_output().stdout);
    let last = events.last().expect("events");
    assert_eq!(last["state"].as_str(), Some("failed"));
    assert_eq!(last["step_id"].as_str(), Some("plan"));
    assert!(last["error"]
        .as_str()
        .expect("error field")
        .contains("ContractFailure"));

    // Retries happened: default max_retries 2 → retry events present.
    assert!(events
        .iter()
        .any(|e| e["state"].as_str() == Some("retrying")));
}

#[test]
fn dry_run_prints_the_plan_without_executing() {
    let dir = scaffold();
    wave(dir.path())
        .args(["run", "--pipeline", "demo", "--input", "x", "--dry-run"])
        .assert()
        .success()
        .stdout(predicates::str::contains("pipeline: demo"))
        .stdout(predicates::str::contains("plan"))
        .stdout(predicates::str::contains("apply"));

    // Nothing was created.
    assert!(!dir.path().join("workspaces").exists());
}

#[test]
fn resume_of_unknown_run_fails() {
    let dir = scaffold();
    wave(dir.path())
        .args(["resume", "--pipeline-id", "ghost-123"])
        .assert()
        .code(1);
}

#[test]
fn migrate_up_status_and_down() {
    let dir = scaffold();
    wave(dir.path())
        .args(["migrate", "up"])
        .assert()
        .success()
        .stdout(predicates::str::contains("applied v1"));

    wave(dir.path())
        .args(["migrate", "status"])
        .assert()
        .success()
        .stdout(predicates::str::contains("applied"));

    wave(dir.path())
        .args(["migrate", "validate"])
        .assert()
        .success();

    wave(dir.path())
        .args(["migrate", "down"])
        .assert()
        .code(1)
        .stderr(predicates::str::contains("not supported"));
}

#[test]
fn list_personas_and_pipelines() {
    let dir = scaffold();
    wave(dir.path())
        .args(["list", "personas"])
        .assert()
        .success()
        .stdout(predicates::str::contains("navigator"))
        .stdout(predicates::str::contains("summarizer"));

    wave(dir.path())
        .args(["list", "pipelines"])
        .assert()
        .success()
        .stdout(predicates::str::contains("demo"));
}

#[test]
fn clean_removes_the_workspace_root() {
    let dir = scaffold();
    wave(dir.path())
        .args(["run", "--pipeline", "demo", "--input", "x"])
        .assert()
        .success();
    assert!(dir.path().join("workspaces").exists());

    wave(dir.path()).arg("clean").assert().success();
    assert!(!dir.path().join("workspaces").exists());
}
