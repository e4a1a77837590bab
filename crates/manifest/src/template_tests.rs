// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn full_vars() -> TemplateVars {
    TemplateVars::default()
        .with_input("hello")
        .with_task("item-a")
        .with_pipeline_id("p1-20260115083000-ab12cd34")
        .with_step_id("plan")
        .with_pipeline_name("p1")
}

#[test]
fn renders_all_variables() {
    let out = render(
        "{{pipeline_name}}/{{step_id}} for {{pipeline_id}}: {{input}} ({{task}})",
        &full_vars(),
    )
    .unwrap();
    assert_eq!(
        out,
        "p1/plan for p1-20260115083000-ab12cd34: hello (item-a)"
    );
}

#[test]
fn whitespace_inside_braces_is_tolerated() {
    let out = render("{{ input }} and {{  task  }}", &full_vars()).unwrap();
    assert_eq!(out, "hello and item-a");
}

#[test]
fn text_without_placeholders_passes_through() {
    let out = render("no variables here", &TemplateVars::default()).unwrap();
    assert_eq!(out, "no variables here");
}

#[test]
fn unknown_variable_is_an_error() {
    let err = render("{{workspace}}", &full_vars()).unwrap_err();
    assert_eq!(err, TemplateError::UnknownVariable("workspace".to_string()));
}

#[test]
fn unavailable_variable_is_an_error_not_empty() {
    let vars = TemplateVars::default().with_input("x");
    let err = render("do {{task}}", &vars).unwrap_err();
    assert_eq!(err, TemplateError::Unavailable("task".to_string()));
}

#[test]
fn repeated_placeholders_render_each_occurrence() {
    let vars = TemplateVars::default().with_input("x");
    assert_eq!(render("{{input}}{{input}}", &vars).unwrap(), "xx");
}

#[test]
fn substituted_values_are_not_rescanned() {
    // A value containing placeholder syntax must not be expanded again.
    let vars = TemplateVars::default().with_input("{{task}}");
    assert_eq!(render("{{input}}", &vars).unwrap(), "{{task}}");
}

#[parameterized(
    single_braces = { "{input}" },
    unclosed = { "{{input" },
    digit_start = { "{{1bad}}" },
)]
fn non_placeholder_syntax_is_left_alone(template: &str) {
    let out = render(template, &full_vars()).unwrap();
    assert_eq!(out, template);
}

#[test]
fn referenced_variables_are_sorted_and_deduped() {
    let names = referenced_variables("{{task}} {{input}} {{task}} {{bogus}}");
    assert_eq!(names, vec!["bogus", "input", "task"]);
}
