// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn memory_conn() -> Connection {
    Connection::open_in_memory().unwrap()
}

#[test]
fn versions_are_strictly_increasing() {
    let mut prev = 0;
    for m in MIGRATIONS {
        assert!(m.version > prev, "v{} after v{}", m.version, prev);
        prev = m.version;
    }
}

#[test]
fn apply_pending_applies_everything_once() {
    let mut conn = memory_conn();
    let applied = apply_pending(&mut conn, &MigrateOptions::default()).unwrap();
    assert_eq!(applied, vec![1, 2]);

    // Idempotent on a second run.
    let again = apply_pending(&mut conn, &MigrateOptions::default()).unwrap();
    assert!(again.is_empty());
    assert_eq!(
        current_version(&conn).unwrap(),
        MIGRATIONS.last().unwrap().version
    );
}

#[test]
fn schema_tables_exist_after_migration() {
    let mut conn = memory_conn();
    apply_pending(&mut conn, &MigrateOptions::default()).unwrap();
    for table in [
        "pipeline_runs",
        "step_runs",
        "step_artifacts",
        "step_checkpoints",
        "schema_migrations",
    ] {
        let count: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1, "missing table {table}");
    }
}

#[test]
fn max_version_caps_how_far_up_goes() {
    let mut conn = memory_conn();
    let options = MigrateOptions {
        max_version: Some(1),
        ..Default::default()
    };
    let applied = apply_pending(&mut conn, &options).unwrap();
    assert_eq!(applied, vec![1]);
    assert_eq!(current_version(&conn).unwrap(), 1);

    // Lifting the cap applies the rest.
    let applied = apply_pending(&mut conn, &MigrateOptions::default()).unwrap();
    assert_eq!(applied, vec![2]);
}

#[test]
fn checksum_mismatch_is_detected() {
    let mut conn = memory_conn();
    apply_pending(&mut conn, &MigrateOptions::default()).unwrap();
    conn.execute(
        "UPDATE schema_migrations SET checksum = 'tampered' WHERE version = 1",
        [],
    )
    .unwrap();

    let err = validate(&conn).unwrap_err();
    assert!(matches!(
        err,
        StateStoreError::ChecksumMismatch { version: 1, .. }
    ));

    // apply_pending refuses unless validation is skipped.
    assert!(apply_pending(&mut conn, &MigrateOptions::default()).is_err());
    let options = MigrateOptions {
        skip_validation: true,
        ..Default::default()
    };
    apply_pending(&mut conn, &options).unwrap();
}

#[test]
fn newer_database_than_binary_is_rejected() {
    let mut conn = memory_conn();
    apply_pending(&mut conn, &MigrateOptions::default()).unwrap();
    conn.execute(
        "INSERT INTO schema_migrations (version, description, checksum, applied_at) \
         VALUES (999, 'future', 'x', 'now')",
        [],
    )
    .unwrap();
    let err = validate(&conn).unwrap_err();
    assert!(matches!(err, StateStoreError::SchemaTooNew { found: 999, .. }));
}

#[test]
fn status_reports_applied_flags() {
    let mut conn = memory_conn();
    let options = MigrateOptions {
        max_version: Some(1),
        ..Default::default()
    };
    apply_pending(&mut conn, &options).unwrap();
    let statuses = status(&conn).unwrap();
    assert_eq!(statuses.len(), MIGRATIONS.len());
    assert!(statuses[0].applied);
    assert!(!statuses[1].applied);
}

#[test]
fn down_is_not_supported() {
    let mut conn = memory_conn();
    apply_pending(&mut conn, &MigrateOptions::default()).unwrap();
    assert!(matches!(
        apply_down(&mut conn).unwrap_err(),
        StateStoreError::DownNotSupported
    ));
}

#[test]
fn checksums_are_stable_hex_sha256() {
    let checksum = MIGRATIONS[0].checksum();
    assert_eq!(checksum.len(), 64);
    assert!(checksum.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(checksum, MIGRATIONS[0].checksum());
}
