// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The production adapter invoker
//!
//! Adapter CLI contract: the binary is spawned with the step workspace as
//! cwd, stdin closed, and the arguments
//!
//! ```text
//! <binary> --mode <mode> --settings <file> --system-prompt <file>
//!          [--model <m>] [--temperature <t>] [--output-format json]
//!          <user prompt>
//! ```
//!
//! The settings file projects the persona's permission rules; the adapter
//! is responsible for honoring them; Wave does not sandbox syscalls. The
//! system prompt file is assembled here from the adapter's base protocol
//! (when declared), the persona prompt, and a restriction section
//! enumerating the permission rules.

use crate::stream::{parse_line, AdapterEvent};
use crate::{
    env, AdapterInvoker, AdapterSignal, InvokeControl, InvokeError, InvokeRequest, InvokeResult,
    StopReason,
};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use wave_core::{ArtifactRecord, TokenUsage};

/// Directory inside the workspace holding the per-invocation config.
const CONFIG_DIR: &str = ".wave";

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessInvoker;

impl ProcessInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AdapterInvoker for ProcessInvoker {
    async fn invoke(
        &self,
        request: InvokeRequest,
        ctl: InvokeControl,
    ) -> Result<InvokeResult, InvokeError> {
        let config_dir = request.workspace.join(CONFIG_DIR);
        tokio::fs::create_dir_all(&config_dir).await?;

        let settings_path = write_settings(&config_dir, &request).await?;
        let prompt_path = write_system_prompt(&config_dir, &request).await?;

        let mut cmd = Command::new(&request.binary);
        cmd.arg("--mode")
            .arg(&request.mode)
            .arg("--settings")
            .arg(&settings_path)
            .arg("--system-prompt")
            .arg(&prompt_path);
        if let Some(model) = &request.model {
            cmd.arg("--model").arg(model);
        }
        if let Some(temperature) = request.temperature {
            cmd.arg("--temperature").arg(temperature.to_string());
        }
        if request.json_output {
            cmd.arg("--output-format").arg("json");
        }
        cmd.arg(&request.user_prompt);

        cmd.current_dir(&request.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .envs(env::filtered_env(
                &request.env_passthrough,
                &request.extra_env,
            ))
            .kill_on_drop(true);

        // Own process group so a timeout kill does not hit Wave itself.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                InvokeError::BinaryNotFound(request.binary.clone())
            } else {
                InvokeError::Spawn(e.to_string())
            }
        })?;

        // Allow expect: piped stdio was requested three lines above
        #[allow(clippy::expect_used)]
        let stdout = child.stdout.take().expect("stdout was piped");
        #[allow(clippy::expect_used)]
        let stderr = child.stderr.take().expect("stderr was piped");
        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();

        let mut collector = OutputCollector::new(&request);
        let mut exit_status = None;
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut stop = StopReason::Completed;

        let deadline = tokio::time::sleep(request.timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                line = out_lines.next_line(), if stdout_open => {
                    match line? {
                        Some(line) => collector.stdout_line(&line, &ctl).await,
                        None => stdout_open = false,
                    }
                }
                line = err_lines.next_line(), if stderr_open => {
                    match line? {
                        Some(line) => collector.stderr_line(&line),
                        None => stderr_open = false,
                    }
                }
                status = child.wait(), if exit_status.is_none() => {
                    exit_status = Some(status?);
                }
                _ = &mut deadline => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    tracing::warn!(
                        step = %request.step_id,
                        persona = %request.persona,
                        timeout_secs = request.timeout.as_secs(),
                        "adapter timed out"
                    );
                    return Err(InvokeError::Timeout(request.timeout));
                }
                _ = ctl.cancel.cancelled() => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    stop = StopReason::Cancelled;
                    break;
                }
                _ = ctl.relay_stop.cancelled() => {
                    let _ = child.start_kill();
                    let _ = child.wait().await;
                    stop = StopReason::Relay;
                    break;
                }
            }

            if !stdout_open && !stderr_open && exit_status.is_some() {
                break;
            }
        }

        let exit_code = match (stop, exit_status) {
            (StopReason::Completed, Some(status)) => status.code().unwrap_or(-1),
            _ => -1,
        };

        Ok(collector.finish(exit_code, stop))
    }
}

/// Accumulates streamed output and adapter events for one invocation.
struct OutputCollector {
    workspace: PathBuf,
    json_output: bool,
    stdout: String,
    stderr: String,
    usage: TokenUsage,
    artifacts: Vec<ArtifactRecord>,
    transcript: Vec<String>,
}

impl OutputCollector {
    fn new(request: &InvokeRequest) -> Self {
        Self {
            workspace: request.workspace.clone(),
            json_output: request.json_output,
            stdout: String::new(),
            stderr: String::new(),
            usage: TokenUsage::default(),
            artifacts: Vec::new(),
            transcript: Vec::new(),
        }
    }

    async fn stdout_line(&mut self, line: &str, ctl: &InvokeControl) {
        self.stdout.push_str(line);
        self.stdout.push('\n');

        if !self.json_output {
            return;
        }
        let Some(event) = parse_line(line) else {
            return;
        };
        match event {
            AdapterEvent::Usage { .. } => {
                // Usage events carry cumulative totals; keep the latest.
                if let Some(usage) = event.usage() {
                    self.usage = usage;
                    if let Some(tx) = &ctl.signals {
                        let _ = tx.send(AdapterSignal::Usage(usage)).await;
                    }
                }
            }
            AdapterEvent::Artifact { name, path } => {
                let path = Path::new(&path);
                let absolute = if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    self.workspace.join(path)
                };
                self.artifacts.push(ArtifactRecord::new(name, absolute));
            }
            AdapterEvent::CompactionRequest { reason } => {
                tracing::info!(reason = reason.as_deref(), "adapter requested compaction");
                if let Some(tx) = &ctl.signals {
                    let _ = tx.send(AdapterSignal::CompactionRequested).await;
                }
            }
            AdapterEvent::Message { content } => {
                self.transcript.push(content);
            }
            AdapterEvent::Result { text } => {
                self.transcript.push(text);
            }
        }
    }

    fn stderr_line(&mut self, line: &str) {
        self.stderr.push_str(line);
        self.stderr.push('\n');
    }

    fn finish(self, exit_code: i32, stop: StopReason) -> InvokeResult {
        InvokeResult {
            stdout: self.stdout,
            stderr: self.stderr,
            exit_code,
            tokens_used: self.usage,
            artifacts: self.artifacts,
            transcript: self.transcript,
            stop,
        }
    }
}

async fn write_settings(
    config_dir: &Path,
    request: &InvokeRequest,
) -> Result<PathBuf, InvokeError> {
    let settings = json!({
        "permissions": {
            "allow": request.allowed_tools,
            "deny": request.deny,
        }
    });
    let path = config_dir.join("settings.json");
    let rendered =
        serde_json::to_string_pretty(&settings).unwrap_or_else(|_| "{}".to_string());
    tokio::fs::write(&path, rendered).await?;
    Ok(path)
}

/// Assemble the synthesized system prompt: base protocol (when declared),
/// persona prompt, and the permission restriction section, separated by
/// `\n\n---\n\n`.
async fn write_system_prompt(
    config_dir: &Path,
    request: &InvokeRequest,
) -> Result<PathBuf, InvokeError> {
    let mut sections: Vec<String> = Vec::new();

    if let Some(base) = &request.base_protocol_file {
        // Fail-secure: a declared protocol that cannot be read must stop
        // the invocation rather than run without it.
        let text = tokio::fs::read_to_string(base)
            .await
            .map_err(|_| InvokeError::BaseProtocolUnreadable(base.clone()))?;
        sections.push(text.trim_end().to_string());
    }

    let persona_prompt = tokio::fs::read_to_string(&request.system_prompt_file)
        .await
        .map_err(|_| InvokeError::SystemPromptUnreadable(request.system_prompt_file.clone()))?;
    sections.push(persona_prompt.trim_end().to_string());

    sections.push(restriction_section(&request.allowed_tools, &request.deny));

    let path = config_dir.join("system_prompt.md");
    tokio::fs::write(&path, sections.join("\n\n---\n\n")).await?;
    Ok(path)
}

fn restriction_section(allowed: &[String], deny: &[String]) -> String {
    let mut section = String::from("## Permission Rules\n");
    if allowed.is_empty() {
        section.push_str("\nNo tools are allowed.\n");
    } else {
        section.push_str("\nYou may only use tools matching:\n");
        for pattern in allowed {
            section.push_str(&format!("- {pattern}\n"));
        }
    }
    if !deny.is_empty() {
        section.push_str("\nAlways refused, regardless of the allow list:\n");
        for pattern in deny {
            section.push_str(&format!("- {pattern}\n"));
        }
    }
    section.trim_end().to_string()
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
