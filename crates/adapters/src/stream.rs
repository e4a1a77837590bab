// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structured adapter output parsing
//!
//! Adapters with `output_format: json` emit one JSON event per stdout
//! line. Unknown event types and non-JSON lines are tolerated (adapters
//! interleave free-form logging), so parsing returns `Option`.

use serde::Deserialize;
use wave_core::TokenUsage;

/// One NDJSON event from an adapter's stdout.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterEvent {
    /// Cumulative usage for the invocation so far.
    Usage {
        #[serde(default)]
        input_tokens: u64,
        #[serde(default)]
        output_tokens: u64,
    },
    /// The adapter produced an artifact at `path` (workspace-relative or
    /// absolute).
    Artifact { name: String, path: String },
    /// The adapter wants its context compacted.
    CompactionRequest {
        #[serde(default)]
        reason: Option<String>,
    },
    /// An assistant turn's text.
    Message {
        #[serde(default)]
        content: String,
    },
    /// Final result text of the invocation.
    Result {
        #[serde(default)]
        text: String,
    },
}

impl AdapterEvent {
    pub fn usage(&self) -> Option<TokenUsage> {
        match self {
            AdapterEvent::Usage {
                input_tokens,
                output_tokens,
            } => Some(TokenUsage::new(*input_tokens, *output_tokens)),
            _ => None,
        }
    }
}

/// Parse one stdout line. `None` for blank lines, non-JSON lines, and
/// unknown event types.
pub fn parse_line(line: &str) -> Option<AdapterEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.starts_with('{') {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
