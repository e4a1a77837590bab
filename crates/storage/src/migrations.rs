// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Schema migrations
//!
//! An append-only list of versioned SQL migrations. A `schema_migrations`
//! table records applied versions with a SHA-256 checksum of the SQL that
//! was run; a mismatch on an already-applied version means the binary and
//! the database disagree about history and is an error unless validation
//! is explicitly skipped. Each migration applies inside its own
//! transaction. There is no down path.

use crate::error::StateStoreError;
use rusqlite::Connection;
use sha2::{Digest, Sha256};

/// A single schema migration.
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

impl Migration {
    /// Hex SHA-256 of the migration SQL.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.up_sql.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// All known migrations, in version order. Append only.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "initial schema: runs, steps, artifacts, checkpoints",
        up_sql: r#"
CREATE TABLE pipeline_runs (
    id                   TEXT PRIMARY KEY,
    name                 TEXT NOT NULL,
    state                TEXT NOT NULL,
    input                TEXT NOT NULL,
    started_at           TEXT NOT NULL,
    ended_at             TEXT,
    manifest_fingerprint TEXT NOT NULL
);

CREATE TABLE step_runs (
    run_id      TEXT NOT NULL REFERENCES pipeline_runs(id) ON DELETE CASCADE,
    step_id     TEXT NOT NULL,
    state       TEXT NOT NULL,
    attempt     INTEGER NOT NULL DEFAULT 0,
    retry_count INTEGER NOT NULL DEFAULT 0,
    started_at  TEXT,
    ended_at    TEXT,
    tokens_used INTEGER NOT NULL DEFAULT 0,
    persona     TEXT NOT NULL,
    last_error  TEXT,
    PRIMARY KEY (run_id, step_id)
);

CREATE TABLE step_artifacts (
    run_id  TEXT NOT NULL,
    step_id TEXT NOT NULL,
    name    TEXT NOT NULL,
    path    TEXT NOT NULL,
    PRIMARY KEY (run_id, step_id, name),
    FOREIGN KEY (run_id, step_id)
        REFERENCES step_runs(run_id, step_id) ON DELETE CASCADE
);

CREATE TABLE step_checkpoints (
    run_id          TEXT NOT NULL,
    step_id         TEXT NOT NULL,
    attempt         INTEGER NOT NULL,
    checkpoint_text TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    PRIMARY KEY (run_id, step_id, attempt)
);
"#,
    },
    Migration {
        version: 2,
        description: "indexes for resume and cleanup scans",
        up_sql: r#"
CREATE INDEX idx_step_runs_state ON step_runs(run_id, state);
CREATE INDEX idx_pipeline_runs_state ON pipeline_runs(state, started_at);
"#,
    },
];

/// Options controlling how far migration goes and how strictly history is
/// validated. The defaults apply everything and validate checksums.
#[derive(Debug, Clone, Default)]
pub struct MigrateOptions {
    /// Skip checksum validation of already-applied migrations.
    pub skip_validation: bool,
    /// Do not apply versions above this (None = no cap).
    pub max_version: Option<u32>,
}

impl MigrateOptions {
    /// Read `WAVE_SKIP_MIGRATION_VALIDATION` and
    /// `WAVE_MAX_MIGRATION_VERSION` from the environment.
    pub fn from_env() -> Self {
        let skip_validation = std::env::var("WAVE_SKIP_MIGRATION_VALIDATION")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        let max_version = std::env::var("WAVE_MAX_MIGRATION_VERSION")
            .ok()
            .and_then(|v| v.parse().ok());
        Self {
            skip_validation,
            max_version,
        }
    }
}

/// Status row for `wave migrate status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: u32,
    pub description: String,
    pub applied: bool,
}

fn ensure_tracking_table(conn: &Connection) -> Result<(), StateStoreError> {
    conn.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version     INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    checksum    TEXT NOT NULL,
    applied_at  TEXT NOT NULL
);
"#,
    )?;
    Ok(())
}

/// Highest applied version, 0 when none.
pub fn current_version(conn: &Connection) -> Result<u32, StateStoreError> {
    ensure_tracking_table(conn)?;
    let version: Option<u32> = conn.query_row(
        "SELECT MAX(version) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version.unwrap_or(0))
}

/// Validate checksums of every applied migration against this binary's
/// list. Also rejects databases whose head is newer than the binary.
pub fn validate(conn: &Connection) -> Result<(), StateStoreError> {
    ensure_tracking_table(conn)?;
    let head = current_version(conn)?;
    let supported = MIGRATIONS.last().map(|m| m.version).unwrap_or(0);
    if head > supported {
        return Err(StateStoreError::SchemaTooNew {
            found: head,
            supported,
        });
    }

    let mut stmt = conn.prepare("SELECT version, checksum FROM schema_migrations")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        let (version, recorded) = row?;
        if let Some(migration) = MIGRATIONS.iter().find(|m| m.version == version) {
            let computed = migration.checksum();
            if computed != recorded {
                return Err(StateStoreError::ChecksumMismatch {
                    version,
                    recorded,
                    computed,
                });
            }
        }
    }
    Ok(())
}

/// Apply every pending migration (subject to `options`), each in its own
/// transaction. Returns the versions applied.
pub fn apply_pending(
    conn: &mut Connection,
    options: &MigrateOptions,
) -> Result<Vec<u32>, StateStoreError> {
    ensure_tracking_table(conn)?;
    if !options.skip_validation {
        validate(conn)?;
    }

    let head = current_version(conn)?;
    let mut applied = Vec::new();

    for migration in MIGRATIONS {
        if migration.version <= head {
            continue;
        }
        if let Some(max) = options.max_version {
            if migration.version > max {
                break;
            }
        }

        let tx = conn.transaction()?;
        tx.execute_batch(migration.up_sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, description, checksum, applied_at) \
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                migration.version,
                migration.description,
                migration.checksum(),
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "applied migration"
        );
        applied.push(migration.version);
    }

    Ok(applied)
}

/// Status of every known migration against a database.
pub fn status(conn: &Connection) -> Result<Vec<MigrationStatus>, StateStoreError> {
    let head = current_version(conn)?;
    Ok(MIGRATIONS
        .iter()
        .map(|m| MigrationStatus {
            version: m.version,
            description: m.description.to_string(),
            applied: m.version <= head,
        })
        .collect())
}

/// The down path is deliberately absent; the command surface still exists
/// and reports this error.
pub fn apply_down(_conn: &mut Connection) -> Result<(), StateStoreError> {
    Err(StateStoreError::DownNotSupported)
}

#[cfg(test)]
#[path = "migrations_tests.rs"]
mod tests;
