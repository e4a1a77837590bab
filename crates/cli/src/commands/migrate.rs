// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `wave migrate`

use crate::context;
use crate::exit::{CommandError, EXIT_FAILURE, EXIT_OK};
use std::path::Path;
use wave_manifest::Loader;
use wave_storage::{migrations, MigrateOptions};

pub enum Direction {
    Up,
    Down,
    Status,
    Validate,
}

pub fn execute(
    loader: &Loader,
    manifest_path: &Path,
    direction: Direction,
) -> Result<i32, CommandError> {
    let manifest = loader.load_manifest(manifest_path)?;
    let db_path = context::state_db_path(&manifest);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn = rusqlite::Connection::open(&db_path)
        .map_err(|e| CommandError::Other(anyhow::Error::new(e)))?;

    match direction {
        Direction::Up => {
            let applied = migrations::apply_pending(&mut conn, &MigrateOptions::from_env())?;
            if applied.is_empty() {
                println!("database is up to date");
            } else {
                for version in applied {
                    println!("applied v{version}");
                }
            }
            Ok(EXIT_OK)
        }
        Direction::Down => {
            // Advisory in this revision; the storage layer has no down
            // path.
            match migrations::apply_down(&mut conn) {
                Err(err) => {
                    eprintln!("error: {err}");
                    Ok(EXIT_FAILURE)
                }
                Ok(()) => Ok(EXIT_OK),
            }
        }
        Direction::Status => {
            for status in migrations::status(&conn)? {
                let mark = if status.applied { "applied" } else { "pending" };
                println!("v{:<4} {mark:<8} {}", status.version, status.description);
            }
            Ok(EXIT_OK)
        }
        Direction::Validate => match migrations::validate(&conn) {
            Ok(()) => {
                println!("migration history is consistent");
                Ok(EXIT_OK)
            }
            Err(err) => {
                eprintln!("error: {err}");
                Ok(EXIT_FAILURE)
            }
        },
    }
}
