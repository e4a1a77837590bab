// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! wave - declarative orchestrator for agentic pipelines

mod commands;
mod context;
mod exit;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use exit::{EXIT_CONFIG_ERROR, EXIT_FAILURE};

#[derive(Parser)]
#[command(
    name = "wave",
    version,
    about = "Wave - declarative orchestrator for multi-step agentic workflows"
)]
struct Cli {
    /// Path to the manifest file
    #[arg(long, global = true, default_value = "wave.yaml", value_name = "FILE")]
    manifest: PathBuf,

    /// Ignore unknown config keys instead of rejecting them
    #[arg(long, global = true)]
    lenient: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a pipeline
    Run {
        /// Pipeline file path, or a name resolved under <manifest-dir>/pipelines/
        #[arg(long, value_name = "PATH-OR-NAME")]
        pipeline: String,
        /// Pipeline input value
        #[arg(long, default_value = "")]
        input: String,
        /// Print the execution plan without running anything
        #[arg(long)]
        dry_run: bool,
        /// Treat steps outside this step's downstream closure as completed
        #[arg(long, value_name = "ID")]
        from_step: Option<String>,
        /// Override every step timeout, in minutes
        #[arg(long, value_name = "MIN")]
        timeout: Option<u64>,
    },
    /// Resume an interrupted run
    Resume {
        #[arg(long, value_name = "ID")]
        pipeline_id: String,
    },
    /// Run an ad-hoc two-step pipeline for a task
    Do {
        /// The task to perform
        task: String,
        /// Persona to run both steps under
        #[arg(long)]
        persona: Option<String>,
    },
    /// Structurally check the manifest and pipelines
    Validate {
        #[arg(long)]
        verbose: bool,
    },
    /// Remove the workspace root (runs, workspaces, state database)
    Clean,
    /// Enumerate configured personas or pipelines
    List {
        #[command(subcommand)]
        what: ListTarget,
    },
    /// Schema migrations for the state database
    Migrate {
        #[command(subcommand)]
        direction: MigrateCommand,
    },
}

#[derive(Subcommand)]
enum ListTarget {
    Personas,
    Pipelines,
}

#[derive(Subcommand)]
enum MigrateCommand {
    /// Apply pending migrations
    Up,
    /// Not supported in this revision
    Down,
    /// Show applied and pending migrations
    Status,
    /// Validate migration checksums against the database
    Validate,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("WAVE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // Diagnostics go to stderr; stdout is reserved for the NDJSON event
    // stream.
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(exit::CommandError::Config(message)) => {
            eprintln!("error: {message}");
            EXIT_CONFIG_ERROR
        }
        Err(exit::CommandError::Other(error)) => {
            eprintln!("error: {error:#}");
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> Result<i32, exit::CommandError> {
    let loader = if cli.lenient {
        wave_manifest::Loader::lenient()
    } else {
        wave_manifest::Loader::new()
    };

    match cli.command {
        Commands::Run {
            pipeline,
            input,
            dry_run,
            from_step,
            timeout,
        } => {
            commands::run::execute(
                &loader,
                &cli.manifest,
                commands::run::RunArgs {
                    pipeline,
                    input,
                    dry_run,
                    from_step,
                    timeout_minutes: timeout,
                },
            )
            .await
        }
        Commands::Resume { pipeline_id } => {
            commands::resume::execute(&loader, &cli.manifest, &pipeline_id).await
        }
        Commands::Do { task, persona } => {
            commands::do_task::execute(&loader, &cli.manifest, &task, persona.as_deref()).await
        }
        Commands::Validate { verbose } => {
            commands::validate::execute(&loader, &cli.manifest, verbose)
        }
        Commands::Clean => commands::clean::execute(&loader, &cli.manifest),
        Commands::List { what } => match what {
            ListTarget::Personas => commands::list::personas(&loader, &cli.manifest),
            ListTarget::Pipelines => commands::list::pipelines(&loader, &cli.manifest),
        },
        Commands::Migrate { direction } => {
            let direction = match direction {
                MigrateCommand::Up => commands::migrate::Direction::Up,
                MigrateCommand::Down => commands::migrate::Direction::Down,
                MigrateCommand::Status => commands::migrate::Direction::Status,
                MigrateCommand::Validate => commands::migrate::Direction::Validate,
            };
            commands::migrate::execute(&loader, &cli.manifest, direction)
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
