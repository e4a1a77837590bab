// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state store
//!
//! Single-writer access to the run database. All methods take `&self`;
//! the connection lives behind a mutex and every method holds it for one
//! statement or one transaction, never across an await point.

use crate::error::StateStoreError;
use crate::migrations::{self, MigrateOptions};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;
use wave_core::{ArtifactRecord, RunId, RunState, StepId, StepState};

/// One `pipeline_runs` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub id: RunId,
    pub name: String,
    pub state: RunState,
    pub input: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub manifest_fingerprint: String,
}

/// One `step_runs` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub run_id: RunId,
    pub step_id: StepId,
    pub state: StepState,
    pub attempt: u32,
    pub retry_count: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub tokens_used: u64,
    pub persona: String,
    pub last_error: Option<String>,
}

impl StepRecord {
    /// Fresh pending record for a step about to enter the scheduler.
    pub fn pending(run_id: RunId, step_id: StepId, persona: impl Into<String>) -> Self {
        Self {
            run_id,
            step_id,
            state: StepState::Pending,
            attempt: 0,
            retry_count: 0,
            started_at: None,
            ended_at: None,
            tokens_used: 0,
            persona: persona.into(),
            last_error: None,
        }
    }
}

/// One `step_checkpoints` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub run_id: RunId,
    pub step_id: StepId,
    pub attempt: u32,
    pub checkpoint_text: String,
    pub created_at: DateTime<Utc>,
}

/// Field updates accompanying a step state transition.
#[derive(Debug, Clone, Default)]
pub struct StepTransition {
    pub attempt: Option<u32>,
    pub retry_count: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub tokens_used: Option<u64>,
    pub last_error: Option<Option<String>>,
}

impl StepTransition {
    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = Some(attempt);
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = Some(retry_count);
        self
    }

    pub fn with_started_at(mut self, at: DateTime<Utc>) -> Self {
        self.started_at = Some(at);
        self
    }

    pub fn with_ended_at(mut self, at: DateTime<Utc>) -> Self {
        self.ended_at = Some(at);
        self
    }

    pub fn with_tokens_used(mut self, tokens: u64) -> Self {
        self.tokens_used = Some(tokens);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(Some(error.into()));
        self
    }

    pub fn clearing_error(mut self) -> Self {
        self.last_error = Some(None);
        self
    }
}

/// Durable record of pipeline runs, backed by one SQLite file.
#[derive(Debug)]
pub struct StateStore {
    conn: Arc<Mutex<Connection>>,
}

impl StateStore {
    /// Open (creating if needed) the database at `path`, honoring the
    /// `WAVE_MIGRATION_ENABLED`, `WAVE_AUTO_MIGRATE`,
    /// `WAVE_SKIP_MIGRATION_VALIDATION`, and `WAVE_MAX_MIGRATION_VERSION`
    /// environment variables.
    pub fn open(path: &Path) -> Result<Self, StateStoreError> {
        let migration_enabled = env_flag("WAVE_MIGRATION_ENABLED", true);
        let auto_migrate = env_flag("WAVE_AUTO_MIGRATE", true);
        Self::open_with(path, migration_enabled, auto_migrate, &MigrateOptions::from_env())
    }

    pub fn open_with(
        path: &Path,
        migration_enabled: bool,
        auto_migrate: bool,
        options: &MigrateOptions,
    ) -> Result<Self, StateStoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StateStoreError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        let mut conn = Connection::open(path)?;
        configure(&conn)?;

        if migration_enabled {
            if auto_migrate {
                migrations::apply_pending(&mut conn, options)?;
            } else {
                if !options.skip_validation {
                    migrations::validate(&conn)?;
                }
                let head = migrations::current_version(&conn)?;
                let supported = crate::MIGRATIONS.last().map(|m| m.version).unwrap_or(0);
                if head < supported {
                    return Err(StateStoreError::PendingMigrations {
                        path: path.display().to_string(),
                    });
                }
            }
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StateStoreError> {
        let mut conn = Connection::open_in_memory()?;
        configure(&conn)?;
        migrations::apply_pending(&mut conn, &MigrateOptions::default())?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    // === runs ===

    pub fn create_run(&self, record: &RunRecord) -> Result<(), StateStoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO pipeline_runs \
             (id, name, state, input, started_at, ended_at, manifest_fingerprint) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.as_str(),
                record.name,
                record.state.as_str(),
                record.input,
                record.started_at.to_rfc3339(),
                record.ended_at.map(|t| t.to_rfc3339()),
                record.manifest_fingerprint,
            ],
        )?;
        Ok(())
    }

    pub fn update_run_state(
        &self,
        id: &RunId,
        state: RunState,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<(), StateStoreError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE pipeline_runs SET state = ?2, ended_at = COALESCE(?3, ended_at) \
             WHERE id = ?1",
            params![
                id.as_str(),
                state.as_str(),
                ended_at.map(|t| t.to_rfc3339())
            ],
        )?;
        if changed == 0 {
            return Err(StateStoreError::RunNotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn load_run(&self, id: &RunId) -> Result<RunRecord, StateStoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, name, state, input, started_at, ended_at, manifest_fingerprint \
             FROM pipeline_runs WHERE id = ?1",
            [id.as_str()],
            run_from_row,
        )
        .optional()?
        .ok_or_else(|| StateStoreError::RunNotFound(id.to_string()))
    }

    pub fn list_runs(&self) -> Result<Vec<RunRecord>, StateStoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, state, input, started_at, ended_at, manifest_fingerprint \
             FROM pipeline_runs ORDER BY started_at DESC, id DESC",
        )?;
        let rows = stmt.query_map([], run_from_row)?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(row?);
        }
        Ok(runs)
    }

    /// Remove a run and everything hanging off it.
    pub fn delete_run(&self, id: &RunId) -> Result<(), StateStoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM step_checkpoints WHERE run_id = ?1",
            [id.as_str()],
        )?;
        tx.execute("DELETE FROM pipeline_runs WHERE id = ?1", [id.as_str()])?;
        tx.commit()?;
        Ok(())
    }

    // === steps ===

    /// Insert the initial (pending) row for a step.
    pub fn init_step(&self, record: &StepRecord) -> Result<(), StateStoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO step_runs \
             (run_id, step_id, state, attempt, retry_count, started_at, ended_at, \
              tokens_used, persona, last_error) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.run_id.as_str(),
                record.step_id.as_str(),
                record.state.as_str(),
                record.attempt,
                record.retry_count,
                record.started_at.map(|t| t.to_rfc3339()),
                record.ended_at.map(|t| t.to_rfc3339()),
                record.tokens_used as i64,
                record.persona,
                record.last_error,
            ],
        )?;
        Ok(())
    }

    /// Apply a state transition, enforcing the step state machine.
    pub fn transition_step(
        &self,
        run_id: &RunId,
        step_id: &StepId,
        to: StepState,
        update: StepTransition,
    ) -> Result<(), StateStoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let from: StepState = {
            let state_str: Option<String> = tx
                .query_row(
                    "SELECT state FROM step_runs WHERE run_id = ?1 AND step_id = ?2",
                    params![run_id.as_str(), step_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            let state_str = state_str.ok_or_else(|| StateStoreError::StepNotFound {
                run_id: run_id.to_string(),
                step_id: step_id.to_string(),
            })?;
            StepState::parse(&state_str).ok_or_else(|| StateStoreError::Corrupt {
                table: "step_runs".to_string(),
                message: format!("unknown state '{state_str}'"),
            })?
        };

        if !from.can_transition_to(to) {
            return Err(StateStoreError::IllegalTransition {
                run_id: run_id.to_string(),
                step_id: step_id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        apply_step_update(&tx, run_id, step_id, to, &update)?;
        tx.commit()?;
        Ok(())
    }

    /// Resume-time demotion back to `pending`, bypassing the state
    /// machine (a crash can leave a step in any non-terminal state).
    pub fn demote_step_for_resume(
        &self,
        run_id: &RunId,
        step_id: &StepId,
    ) -> Result<(), StateStoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE step_runs SET state = ?3, started_at = NULL, ended_at = NULL \
             WHERE run_id = ?1 AND step_id = ?2",
            params![
                run_id.as_str(),
                step_id.as_str(),
                StepState::Pending.as_str()
            ],
        )?;
        Ok(())
    }

    pub fn load_step(
        &self,
        run_id: &RunId,
        step_id: &StepId,
    ) -> Result<StepRecord, StateStoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT run_id, step_id, state, attempt, retry_count, started_at, ended_at, \
                    tokens_used, persona, last_error \
             FROM step_runs WHERE run_id = ?1 AND step_id = ?2",
            params![run_id.as_str(), step_id.as_str()],
            step_from_row,
        )
        .optional()?
        .ok_or_else(|| StateStoreError::StepNotFound {
            run_id: run_id.to_string(),
            step_id: step_id.to_string(),
        })
    }

    pub fn load_steps(&self, run_id: &RunId) -> Result<Vec<StepRecord>, StateStoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT run_id, step_id, state, attempt, retry_count, started_at, ended_at, \
                    tokens_used, persona, last_error \
             FROM step_runs WHERE run_id = ?1 ORDER BY step_id",
        )?;
        let rows = stmt.query_map([run_id.as_str()], step_from_row)?;
        let mut steps = Vec::new();
        for row in rows {
            steps.push(row?);
        }
        Ok(steps)
    }

    // === artifacts ===

    pub fn record_artifacts(
        &self,
        run_id: &RunId,
        step_id: &StepId,
        artifacts: &[ArtifactRecord],
    ) -> Result<(), StateStoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for artifact in artifacts {
            tx.execute(
                "INSERT OR REPLACE INTO step_artifacts (run_id, step_id, name, path) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    run_id.as_str(),
                    step_id.as_str(),
                    artifact.name,
                    artifact.path.to_string_lossy(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_artifacts(
        &self,
        run_id: &RunId,
        step_id: &StepId,
    ) -> Result<Vec<ArtifactRecord>, StateStoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT name, path FROM step_artifacts \
             WHERE run_id = ?1 AND step_id = ?2 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![run_id.as_str(), step_id.as_str()], |row| {
            Ok(ArtifactRecord::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;
        let mut artifacts = Vec::new();
        for row in rows {
            artifacts.push(row?);
        }
        Ok(artifacts)
    }

    // === checkpoints ===

    pub fn save_checkpoint(&self, record: &CheckpointRecord) -> Result<(), StateStoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO step_checkpoints \
             (run_id, step_id, attempt, checkpoint_text, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.run_id.as_str(),
                record.step_id.as_str(),
                record.attempt,
                record.checkpoint_text,
                record.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Latest checkpoint for a step, across attempts.
    pub fn load_checkpoint(
        &self,
        run_id: &RunId,
        step_id: &StepId,
    ) -> Result<Option<CheckpointRecord>, StateStoreError> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT run_id, step_id, attempt, checkpoint_text, created_at \
                 FROM step_checkpoints WHERE run_id = ?1 AND step_id = ?2 \
                 ORDER BY attempt DESC LIMIT 1",
                params![run_id.as_str(), step_id.as_str()],
                |row| {
                    Ok(CheckpointRecord {
                        run_id: RunId::new(row.get::<_, String>(0)?),
                        step_id: StepId::new(row.get::<_, String>(1)?),
                        attempt: row.get(2)?,
                        checkpoint_text: row.get(3)?,
                        created_at: parse_ts_row(row, 4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }
}

fn configure(conn: &Connection) -> Result<(), StateStoreError> {
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    // journal_mode returns a row; pragma_update handles both shapes.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => !(v == "0" || v.eq_ignore_ascii_case("false")),
        Err(_) => default,
    }
}

fn apply_step_update(
    conn: &Connection,
    run_id: &RunId,
    step_id: &StepId,
    to: StepState,
    update: &StepTransition,
) -> Result<(), StateStoreError> {
    conn.execute(
        "UPDATE step_runs SET \
             state = ?3, \
             attempt = COALESCE(?4, attempt), \
             retry_count = COALESCE(?5, retry_count), \
             started_at = COALESCE(?6, started_at), \
             ended_at = COALESCE(?7, ended_at), \
             tokens_used = COALESCE(?8, tokens_used), \
             last_error = CASE WHEN ?9 THEN ?10 ELSE last_error END \
         WHERE run_id = ?1 AND step_id = ?2",
        params![
            run_id.as_str(),
            step_id.as_str(),
            to.as_str(),
            update.attempt,
            update.retry_count,
            update.started_at.map(|t| t.to_rfc3339()),
            update.ended_at.map(|t| t.to_rfc3339()),
            update.tokens_used.map(|t| t as i64),
            update.last_error.is_some(),
            update.last_error.clone().flatten(),
        ],
    )?;
    Ok(())
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn parse_ts_row(row: &Row<'_>, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let s: String = row.get(idx)?;
    parse_ts(&s)
}

fn parse_opt_ts_row(row: &Row<'_>, idx: usize) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| parse_ts(&s)).transpose()
}

fn run_from_row(row: &Row<'_>) -> Result<RunRecord, rusqlite::Error> {
    let state_str: String = row.get(2)?;
    Ok(RunRecord {
        id: RunId::new(row.get::<_, String>(0)?),
        name: row.get(1)?,
        state: RunState::parse(&state_str).unwrap_or(RunState::Failed),
        input: row.get(3)?,
        started_at: parse_ts_row(row, 4)?,
        ended_at: parse_opt_ts_row(row, 5)?,
        manifest_fingerprint: row.get(6)?,
    })
}

fn step_from_row(row: &Row<'_>) -> Result<StepRecord, rusqlite::Error> {
    let state_str: String = row.get(2)?;
    Ok(StepRecord {
        run_id: RunId::new(row.get::<_, String>(0)?),
        step_id: StepId::new(row.get::<_, String>(1)?),
        state: StepState::parse(&state_str).unwrap_or(StepState::Failed),
        attempt: row.get(3)?,
        retry_count: row.get(4)?,
        started_at: parse_opt_ts_row(row, 5)?,
        ended_at: parse_opt_ts_row(row, 6)?,
        tokens_used: row.get::<_, i64>(7)? as u64,
        persona: row.get(8)?,
        last_error: row.get(9)?,
    })
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
