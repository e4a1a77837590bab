// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

#[test]
fn short_id_truncates() {
    let id = RunId::new("abcdefgh");
    assert_eq!(id.short(4), "abcd");
    assert_eq!(id.short(100), "abcdefgh");
}

#[test]
fn run_id_display_round_trips() {
    let id = RunId::new("review-20260115083000-ab12cd34");
    assert_eq!(id.to_string(), "review-20260115083000-ab12cd34");
    assert_eq!(id.as_str(), "review-20260115083000-ab12cd34");
}

#[test]
fn mint_with_nonce_is_deterministic() {
    let now = Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).unwrap();
    let id = RunId::mint_with_nonce("Code Review", now, "ab12cd34");
    assert_eq!(id.as_str(), "code-review-20260115083000-ab12cd34");
}

#[test]
fn mint_nonce_is_eight_hex_chars() {
    let now = Utc::now();
    let id = RunId::mint("p", now);
    let nonce = id.as_str().rsplit('-').next().unwrap();
    assert_eq!(nonce.len(), 8);
    assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
}

#[parameterized(
    plain = { "review", "review" },
    uppercase = { "Review", "review" },
    spaces = { "code review run", "code-review-run" },
    punctuation = { "a//b__c", "a-b-c" },
    collapses_hyphens = { "a---b", "a-b" },
    empty = { "", "pipeline" },
    all_symbols = { "///", "pipeline" },
)]
fn sanitize_name_cases(input: &str, expected: &str) {
    assert_eq!(sanitize_name(input), expected);
}

#[test]
fn step_id_borrows_as_str() {
    use std::collections::HashMap;
    let mut map: HashMap<StepId, u32> = HashMap::new();
    map.insert(StepId::new("plan"), 1);
    assert_eq!(map.get("plan"), Some(&1));
}
