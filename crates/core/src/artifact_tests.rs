// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn parse_splits_on_first_slash() {
    let r = ArtifactRef::parse("plan/tasks.json").unwrap();
    assert_eq!(r.step, "plan");
    assert_eq!(r.name, "tasks.json");
}

#[test]
fn parse_keeps_nested_paths_in_name() {
    let r = ArtifactRef::parse("build/out/report.md").unwrap();
    assert_eq!(r.step, "build");
    assert_eq!(r.name, "out/report.md");
}

#[parameterized(
    no_separator = { "tasks.json" },
    empty_step = { "/tasks.json" },
    empty_name = { "plan/" },
)]
fn parse_rejects_malformed(input: &str) {
    assert!(ArtifactRef::parse(input).is_err());
}

#[test]
fn sanitized_target_replaces_slashes() {
    let r = ArtifactRef::parse("build/out/report.md").unwrap();
    assert_eq!(r.sanitized_target(), "build_out_report.md");
}

#[test]
fn sanitized_targets_can_collide() {
    // Validation rejects this at pipeline load; the law documented here is
    // that two distinct refs may map to one target.
    let a = ArtifactRef::parse("plan/a/b").unwrap();
    let b = ArtifactRef::parse("plan/a_b").unwrap();
    assert_ne!(a, b);
    assert_eq!(a.sanitized_target(), b.sanitized_target());
}

#[test]
fn serde_round_trips_the_string_form() {
    let r: ArtifactRef = serde_json::from_str("\"plan/tasks.json\"").unwrap();
    assert_eq!(r, ArtifactRef::new("plan", "tasks.json"));
    assert_eq!(
        serde_json::to_string(&r).unwrap(),
        "\"plan/tasks.json\""
    );
}

#[test]
fn serde_rejects_malformed_reference() {
    let result: Result<ArtifactRef, _> = serde_json::from_str("\"no-slash\"");
    assert!(result.is_err());
}
