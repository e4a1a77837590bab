// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn rules(allow: &[&str], deny: &[&str]) -> PermissionRules {
    PermissionRules {
        allowed_tools: allow.iter().map(|s| s.to_string()).collect(),
        deny: deny.iter().map(|s| s.to_string()).collect(),
    }
}

#[test]
fn bare_tool_pattern_matches_any_argument() {
    let r = rules(&["Read"], &[]);
    assert!(r.evaluate("Read", "src/main.go").permits());
    assert!(r.evaluate("Read", "").permits());
}

#[test]
fn argument_matcher_constrains_the_match() {
    let r = rules(&["Write(*.go)"], &[]);
    assert!(r.evaluate("Write", "main.go").permits());
    assert!(!r.evaluate("Write", "main.rs").permits());
}

#[test]
fn shell_prefix_pattern() {
    let r = rules(&["Bash(git commit*)"], &[]);
    assert!(r.evaluate("Bash", "git commit -m 'x'").permits());
    assert!(!r.evaluate("Bash", "git push").permits());
}

#[test]
fn deny_wins_over_allow() {
    let r = rules(&["Bash(*)"], &["Bash(git push*)"]);
    assert!(r.evaluate("Bash", "git status").permits());
    let decision = r.evaluate("Bash", "git push origin main");
    assert_eq!(
        decision,
        PermissionDecision::Denied {
            pattern: "Bash(git push*)".to_string()
        }
    );
}

#[test]
fn unmatched_tool_is_blocked_by_default() {
    let r = rules(&["Read"], &[]);
    assert_eq!(r.evaluate("Write", "x"), PermissionDecision::Unmatched);
    assert!(!PermissionDecision::Unmatched.permits());
}

#[test]
fn tool_name_glob() {
    let r = rules(&["mcp__*"], &[]);
    assert!(r.evaluate("mcp__search", "").permits());
    assert!(!r.evaluate("Bash", "").permits());
}

#[parameterized(
    empty_rules = { rules(&[], &[]) },
    deny_only = { rules(&[], &["Bash(*)"]) },
)]
fn nothing_permits_without_an_allow_match(r: PermissionRules) {
    assert!(!r.evaluate("Bash", "ls").permits());
}

#[test]
fn layered_defaults_extend_persona_rules() {
    let persona = rules(&["Write(*.md)"], &[]);
    let defaults = rules(&["Read"], &["Bash(rm*)"]);
    let merged = persona.layered_over(&defaults);
    assert!(merged.evaluate("Write", "notes.md").permits());
    assert!(merged.evaluate("Read", "x").permits());
    assert!(!merged.evaluate("Bash", "rm -rf /").permits());
}

#[test]
fn check_patterns_flags_invalid_globs() {
    let r = rules(&["Write([bad"], &[]);
    assert!(r.check_patterns().is_err());
    assert!(rules(&["Write(*.go)", "Bash(git *)"], &["*"])
        .check_patterns()
        .is_ok());
}

#[test]
fn serde_defaults_to_empty_lists() {
    let r: PermissionRules = serde_yaml::from_str("{}").unwrap();
    assert!(r.allowed_tools.is_empty());
    assert!(r.deny.is_empty());
}
