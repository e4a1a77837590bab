// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State store errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("migration v{version} checksum mismatch: recorded {recorded}, computed {computed}")]
    ChecksumMismatch {
        version: u32,
        recorded: String,
        computed: String,
    },

    #[error("database schema v{found} is newer than this binary supports (v{supported})")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("down-migrations are not supported")]
    DownNotSupported,

    #[error("database at {path} has pending migrations; run 'wave migrate up'")]
    PendingMigrations { path: String },

    #[error("pipeline run not found: {0}")]
    RunNotFound(String),

    #[error("step not found: {run_id}/{step_id}")]
    StepNotFound { run_id: String, step_id: String },

    #[error("illegal step transition {from} -> {to} for {run_id}/{step_id}")]
    IllegalTransition {
        run_id: String,
        step_id: String,
        from: String,
        to: String,
    },

    #[error("corrupt record in {table}: {message}")]
    Corrupt { table: String, message: String },
}
