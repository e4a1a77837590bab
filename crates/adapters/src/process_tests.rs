// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::AdapterInvoker;
use std::time::Duration;
use tempfile::TempDir;

/// Write an executable stub adapter script and return its path.
fn stub_adapter(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("stub-adapter");
    std::fs::write(&path, format!("#!/usr/bin/env bash\n{body}\n")).unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }
    path
}

fn request(dir: &TempDir, binary: &Path) -> InvokeRequest {
    let workspace = dir.path().join("ws");
    std::fs::create_dir_all(&workspace).unwrap();
    let prompt_file = dir.path().join("persona.md");
    std::fs::write(&prompt_file, "You are the navigator.").unwrap();

    InvokeRequest {
        run_id: "r1".to_string(),
        step_id: "plan".to_string(),
        persona: "navigator".to_string(),
        binary: binary.to_string_lossy().to_string(),
        mode: "print".to_string(),
        model: None,
        temperature: None,
        json_output: true,
        system_prompt_file: prompt_file,
        base_protocol_file: None,
        allowed_tools: vec!["Read".to_string(), "Write(*.md)".to_string()],
        deny: vec!["Bash(rm*)".to_string()],
        user_prompt: "plan the work".to_string(),
        workspace,
        timeout: Duration::from_secs(10),
        env_passthrough: vec![],
        extra_env: vec![],
    }
}

#[tokio::test]
async fn collects_events_from_json_stdout() {
    let dir = TempDir::new().unwrap();
    let binary = stub_adapter(
        &dir,
        r#"
echo '{"type":"message","content":"starting"}'
echo '{"type":"usage","input_tokens":100,"output_tokens":20}'
echo '{"type":"artifact","name":"tasks","path":"tasks.json"}'
echo 'free-form log line'
echo '{"type":"result","text":"all done"}'
"#,
    );
    let req = request(&dir, &binary);
    let workspace = req.workspace.clone();

    let result = ProcessInvoker::new()
        .invoke(req, InvokeControl::detached())
        .await
        .unwrap();

    assert!(result.success());
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.tokens_used, TokenUsage::new(100, 20));
    assert_eq!(result.artifacts.len(), 1);
    assert_eq!(result.artifacts[0].name, "tasks");
    assert_eq!(result.artifacts[0].path, workspace.join("tasks.json"));
    assert_eq!(result.transcript, vec!["starting", "all done"]);
    assert!(result.stdout.contains("free-form log line"));
}

#[tokio::test]
async fn nonzero_exit_is_reported_not_an_error() {
    let dir = TempDir::new().unwrap();
    let binary = stub_adapter(&dir, "echo 'boom' >&2\nexit 3");
    let result = ProcessInvoker::new()
        .invoke(request(&dir, &binary), InvokeControl::detached())
        .await
        .unwrap();
    assert_eq!(result.exit_code, 3);
    assert!(!result.success());
    assert!(result.stderr.contains("boom"));
}

#[tokio::test]
async fn missing_binary_is_binary_not_found() {
    let dir = TempDir::new().unwrap();
    let mut req = request(&dir, Path::new("/definitely/not/here"));
    req.binary = "/definitely/not/here".to_string();
    let err = ProcessInvoker::new()
        .invoke(req, InvokeControl::detached())
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::BinaryNotFound(_)), "{err}");
}

#[tokio::test]
async fn timeout_kills_the_child() {
    let dir = TempDir::new().unwrap();
    let binary = stub_adapter(&dir, "sleep 30");
    let mut req = request(&dir, &binary);
    req.timeout = Duration::from_millis(200);
    let started = std::time::Instant::now();
    let err = ProcessInvoker::new()
        .invoke(req, InvokeControl::detached())
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::Timeout(_)), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn cancellation_stops_with_partial_output() {
    let dir = TempDir::new().unwrap();
    let binary = stub_adapter(
        &dir,
        r#"
echo '{"type":"message","content":"before cancel"}'
sleep 30
"#,
    );
    let ctl = InvokeControl::detached();
    let cancel = ctl.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        cancel.cancel();
    });

    let result = ProcessInvoker::new()
        .invoke(request(&dir, &binary), ctl)
        .await
        .unwrap();
    assert_eq!(result.stop, StopReason::Cancelled);
    assert_eq!(result.transcript, vec!["before cancel"]);
}

#[tokio::test]
async fn relay_stop_is_distinguished_from_cancel() {
    let dir = TempDir::new().unwrap();
    let binary = stub_adapter(&dir, "sleep 30");
    let ctl = InvokeControl::detached();
    let relay = ctl.relay_stop.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        relay.cancel();
    });

    let result = ProcessInvoker::new()
        .invoke(request(&dir, &binary), ctl)
        .await
        .unwrap();
    assert_eq!(result.stop, StopReason::Relay);
}

#[tokio::test]
async fn usage_signals_reach_the_channel() {
    let dir = TempDir::new().unwrap();
    let binary = stub_adapter(
        &dir,
        r#"
echo '{"type":"usage","input_tokens":50,"output_tokens":5}'
echo '{"type":"compaction_request"}'
"#,
    );
    let (tx, mut rx) = tokio::sync::mpsc::channel(8);
    let ctl = InvokeControl {
        signals: Some(tx),
        ..InvokeControl::detached()
    };
    ProcessInvoker::new()
        .invoke(request(&dir, &binary), ctl)
        .await
        .unwrap();

    assert_eq!(
        rx.recv().await,
        Some(AdapterSignal::Usage(TokenUsage::new(50, 5)))
    );
    assert_eq!(rx.recv().await, Some(AdapterSignal::CompactionRequested));
}

#[tokio::test]
async fn system_prompt_is_assembled_with_base_protocol() {
    let dir = TempDir::new().unwrap();
    let binary = stub_adapter(&dir, "cat \"$6\"");
    let base = dir.path().join("protocol.md");
    std::fs::write(&base, "Base protocol.").unwrap();
    let mut req = request(&dir, &binary);
    req.base_protocol_file = Some(base);

    let workspace = req.workspace.clone();
    ProcessInvoker::new()
        .invoke(req, InvokeControl::detached())
        .await
        .unwrap();

    let assembled =
        std::fs::read_to_string(workspace.join(".wave/system_prompt.md")).unwrap();
    let parts: Vec<&str> = assembled.split("\n\n---\n\n").collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "Base protocol.");
    assert_eq!(parts[1], "You are the navigator.");
    assert!(parts[2].contains("## Permission Rules"));
    assert!(parts[2].contains("- Write(*.md)"));
    assert!(parts[2].contains("- Bash(rm*)"));
}

#[tokio::test]
async fn unreadable_base_protocol_is_fatal() {
    let dir = TempDir::new().unwrap();
    let binary = stub_adapter(&dir, "true");
    let mut req = request(&dir, &binary);
    req.base_protocol_file = Some(dir.path().join("missing-protocol.md"));
    let err = ProcessInvoker::new()
        .invoke(req, InvokeControl::detached())
        .await
        .unwrap_err();
    assert!(matches!(err, InvokeError::BaseProtocolUnreadable(_)), "{err}");
}

#[tokio::test]
async fn settings_project_the_permission_rules() {
    let dir = TempDir::new().unwrap();
    let binary = stub_adapter(&dir, "true");
    let req = request(&dir, &binary);
    let workspace = req.workspace.clone();
    ProcessInvoker::new()
        .invoke(req, InvokeControl::detached())
        .await
        .unwrap();

    let settings: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(workspace.join(".wave/settings.json")).unwrap())
            .unwrap();
    assert_eq!(settings["permissions"]["allow"][0], "Read");
    assert_eq!(settings["permissions"]["deny"][0], "Bash(rm*)");
}

#[tokio::test]
async fn child_env_is_filtered() {
    let dir = TempDir::new().unwrap();
    let binary = stub_adapter(&dir, "echo \"var=$WAVE_EXTRA_VAR\"");
    let mut req = request(&dir, &binary);
    req.json_output = false;
    req.extra_env = vec![("WAVE_EXTRA_VAR".to_string(), "forwarded".to_string())];
    let result = ProcessInvoker::new()
        .invoke(req, InvokeControl::detached())
        .await
        .unwrap();
    assert!(result.stdout.contains("var=forwarded"), "{}", result.stdout);
}

#[test]
fn restriction_section_lists_rules() {
    let section = restriction_section(
        &["Read".to_string(), "Write(*.go)".to_string()],
        &["Bash(git push*)".to_string()],
    );
    assert!(section.starts_with("## Permission Rules"));
    assert!(section.contains("- Read\n"));
    assert!(section.contains("- Write(*.go)"));
    assert!(section.contains("- Bash(git push*)"));
}

#[test]
fn empty_allow_list_reads_as_no_tools() {
    let section = restriction_section(&[], &[]);
    assert!(section.contains("No tools are allowed."));
}
