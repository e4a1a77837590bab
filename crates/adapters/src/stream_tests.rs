// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn usage_event_parses() {
    let event = parse_line(r#"{"type":"usage","input_tokens":1200,"output_tokens":340}"#).unwrap();
    assert_eq!(event.usage(), Some(TokenUsage::new(1200, 340)));
}

#[test]
fn usage_fields_default_to_zero() {
    let event = parse_line(r#"{"type":"usage"}"#).unwrap();
    assert_eq!(event.usage(), Some(TokenUsage::default()));
}

#[test]
fn artifact_event_parses() {
    let event = parse_line(r#"{"type":"artifact","name":"tasks","path":"tasks.json"}"#).unwrap();
    assert_eq!(
        event,
        AdapterEvent::Artifact {
            name: "tasks".to_string(),
            path: "tasks.json".to_string()
        }
    );
}

#[test]
fn compaction_request_parses_with_and_without_reason() {
    assert_eq!(
        parse_line(r#"{"type":"compaction_request"}"#).unwrap(),
        AdapterEvent::CompactionRequest { reason: None }
    );
    assert_eq!(
        parse_line(r#"{"type":"compaction_request","reason":"context at 92%"}"#).unwrap(),
        AdapterEvent::CompactionRequest {
            reason: Some("context at 92%".to_string())
        }
    );
}

#[test]
fn message_and_result_events_parse() {
    assert_eq!(
        parse_line(r#"{"type":"message","content":"working on it"}"#).unwrap(),
        AdapterEvent::Message {
            content: "working on it".to_string()
        }
    );
    assert_eq!(
        parse_line(r#"{"type":"result","text":"done"}"#).unwrap(),
        AdapterEvent::Result {
            text: "done".to_string()
        }
    );
}

#[parameterized(
    blank = { "" },
    whitespace = { "   " },
    free_text = { "thinking about the problem..." },
    unknown_type = { r#"{"type":"heartbeat"}"# },
    malformed_json = { r#"{"type":"usage","#  },
)]
fn tolerated_lines_yield_none(line: &str) {
    assert_eq!(parse_line(line), None);
}

#[test]
fn non_usage_events_have_no_usage() {
    let event = parse_line(r#"{"type":"result","text":"x"}"#).unwrap();
    assert_eq!(event.usage(), None);
}
