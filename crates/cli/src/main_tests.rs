// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::CommandFactory;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn run_arguments_parse() {
    let cli = Cli::parse_from([
        "wave",
        "run",
        "--pipeline",
        "review",
        "--input",
        "hello",
        "--from-step",
        "apply",
        "--timeout",
        "10",
        "--dry-run",
    ]);
    match cli.command {
        Commands::Run {
            pipeline,
            input,
            dry_run,
            from_step,
            timeout,
        } => {
            assert_eq!(pipeline, "review");
            assert_eq!(input, "hello");
            assert!(dry_run);
            assert_eq!(from_step.as_deref(), Some("apply"));
            assert_eq!(timeout, Some(10));
        }
        _ => panic!("expected run"),
    }
}

#[test]
fn manifest_flag_is_global_with_default() {
    let cli = Cli::parse_from(["wave", "validate"]);
    assert_eq!(cli.manifest, PathBuf::from("wave.yaml"));
    assert!(!cli.lenient);

    let cli = Cli::parse_from(["wave", "--manifest", "/etc/wave.yaml", "--lenient", "clean"]);
    assert_eq!(cli.manifest, PathBuf::from("/etc/wave.yaml"));
    assert!(cli.lenient);
}

#[test]
fn migrate_subcommands_parse() {
    for (arg, expected) in [
        ("up", "up"),
        ("down", "down"),
        ("status", "status"),
        ("validate", "validate"),
    ] {
        let cli = Cli::parse_from(["wave", "migrate", arg]);
        let Commands::Migrate { direction } = cli.command else {
            panic!("expected migrate");
        };
        let name = match direction {
            MigrateCommand::Up => "up",
            MigrateCommand::Down => "down",
            MigrateCommand::Status => "status",
            MigrateCommand::Validate => "validate",
        };
        assert_eq!(name, expected);
    }
}

#[test]
fn do_takes_a_positional_task() {
    let cli = Cli::parse_from(["wave", "do", "fix the tests", "--persona", "craftsman"]);
    match cli.command {
        Commands::Do { task, persona } => {
            assert_eq!(task, "fix the tests");
            assert_eq!(persona.as_deref(), Some("craftsman"));
        }
        _ => panic!("expected do"),
    }
}

#[test]
fn list_requires_a_target() {
    assert!(Cli::try_parse_from(["wave", "list"]).is_err());
    let cli = Cli::parse_from(["wave", "list", "personas"]);
    assert!(matches!(
        cli.command,
        Commands::List {
            what: ListTarget::Personas
        }
    ));
}
