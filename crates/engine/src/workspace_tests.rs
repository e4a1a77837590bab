// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::Path;
use tempfile::TempDir;

fn manager(dir: &TempDir) -> WorkspaceManager {
    WorkspaceManager::new(dir.path().join("workspaces"))
}

fn vars() -> TemplateVars {
    TemplateVars::default()
        .with_pipeline_id("r1")
        .with_step_id("plan")
        .with_pipeline_name("review")
        .with_input("x")
}

fn mount(source: &Path, target: &str, mode: MountMode) -> MountDef {
    MountDef {
        source: source.to_string_lossy().to_string(),
        target: target.to_string(),
        mode,
    }
}

#[test]
fn create_makes_partitioned_directories() {
    let dir = TempDir::new().unwrap();
    let ws = manager(&dir);
    let a = ws
        .create(&RunId::new("r1"), &StepId::new("plan"), None, &[], &vars())
        .unwrap();
    let b = ws
        .create(&RunId::new("r1"), &StepId::new("apply"), None, &[], &vars())
        .unwrap();
    assert_ne!(a, b);
    assert!(a.ends_with("r1/plan"));
    assert!(b.ends_with("r1/apply"));
}

#[test]
fn matrix_workers_get_distinct_directories() {
    let dir = TempDir::new().unwrap();
    let ws = manager(&dir);
    let w0 = ws
        .create(&RunId::new("r1"), &StepId::new("exec"), Some(0), &[], &vars())
        .unwrap();
    let w1 = ws
        .create(&RunId::new("r1"), &StepId::new("exec"), Some(1), &[], &vars())
        .unwrap();
    assert!(w0.ends_with("exec-w0"));
    assert!(w1.ends_with("exec-w1"));
}

#[test]
fn mounts_are_copied_into_the_workspace() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("fixtures");
    std::fs::create_dir_all(src.join("nested")).unwrap();
    std::fs::write(src.join("a.txt"), "alpha").unwrap();
    std::fs::write(src.join("nested/b.txt"), "beta").unwrap();

    let ws = manager(&dir);
    let workspace = ws
        .create(
            &RunId::new("r1"),
            &StepId::new("plan"),
            None,
            &[mount(&src, "fixtures", MountMode::Readwrite)],
            &vars(),
        )
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(workspace.join("fixtures/a.txt")).unwrap(),
        "alpha"
    );
    assert_eq!(
        std::fs::read_to_string(workspace.join("fixtures/nested/b.txt")).unwrap(),
        "beta"
    );
}

#[test]
fn missing_mount_source_is_fatal() {
    let dir = TempDir::new().unwrap();
    let ws = manager(&dir);
    let err = ws
        .create(
            &RunId::new("r1"),
            &StepId::new("plan"),
            None,
            &[mount(&dir.path().join("ghost"), "x", MountMode::Readonly)],
            &vars(),
        )
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::MountMissing(_)), "{err}");
}

#[test]
fn template_variables_render_in_mount_paths() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("per-step/plan");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("f.txt"), "x").unwrap();

    let ws = manager(&dir);
    let template_source = format!("{}/per-step/{{{{step_id}}}}", dir.path().display());
    let workspace = ws
        .create(
            &RunId::new("r1"),
            &StepId::new("plan"),
            None,
            &[MountDef {
                source: template_source,
                target: "in-{{step_id}}".to_string(),
                mode: MountMode::Readwrite,
            }],
            &vars(),
        )
        .unwrap();
    assert!(workspace.join("in-plan/f.txt").is_file());
}

#[cfg(unix)]
#[test]
fn readonly_mounts_are_chmodded_after_copy() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let src = dir.path().join("srcdir");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("f.txt"), "x").unwrap();

    let ws = manager(&dir);
    let workspace = ws
        .create(
            &RunId::new("r1"),
            &StepId::new("plan"),
            None,
            &[mount(&src, "ro", MountMode::Readonly)],
            &vars(),
        )
        .unwrap();

    let mode = std::fs::metadata(workspace.join("ro/f.txt"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o222, 0, "file still writable: {mode:o}");

    // Destroy must succeed despite the readonly bits.
    ws.destroy(&workspace).unwrap();
    assert!(!workspace.exists());
}

#[test]
fn heavyweight_directories_are_skipped() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("repo");
    std::fs::create_dir_all(src.join(".git")).unwrap();
    std::fs::create_dir_all(src.join("node_modules/dep")).unwrap();
    std::fs::create_dir_all(src.join("src")).unwrap();
    std::fs::write(src.join(".git/HEAD"), "ref").unwrap();
    std::fs::write(src.join("src/main.rs"), "fn main() {}").unwrap();

    let ws = manager(&dir);
    let workspace = ws
        .create(
            &RunId::new("r1"),
            &StepId::new("plan"),
            None,
            &[mount(&src, "repo", MountMode::Readwrite)],
            &vars(),
        )
        .unwrap();
    assert!(workspace.join("repo/src/main.rs").is_file());
    assert!(!workspace.join("repo/.git").exists());
    assert!(!workspace.join("repo/node_modules").exists());
}

#[test]
fn oversized_files_are_skipped() {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("data");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("small.bin"), vec![0u8; 1024]).unwrap();
    std::fs::write(src.join("big.bin"), vec![0u8; (MAX_FILE_SIZE + 1) as usize]).unwrap();

    let ws = manager(&dir);
    let workspace = ws
        .create(
            &RunId::new("r1"),
            &StepId::new("plan"),
            None,
            &[mount(&src, "data", MountMode::Readwrite)],
            &vars(),
        )
        .unwrap();
    assert!(workspace.join("data/small.bin").is_file());
    assert!(!workspace.join("data/big.bin").exists());
}

#[test]
fn injected_artifacts_are_copies() {
    let dir = TempDir::new().unwrap();
    let producer = dir.path().join("producer-ws");
    std::fs::create_dir_all(&producer).unwrap();
    let artifact = producer.join("tasks.json");
    std::fs::write(&artifact, "[1,2,3]").unwrap();

    let ws = manager(&dir);
    let workspace = ws
        .create(&RunId::new("r1"), &StepId::new("apply"), None, &[], &vars())
        .unwrap();
    let refs = vec![ArtifactRef::new("plan", "tasks.json")];
    let injected = ws
        .inject_artifacts(&workspace, &refs, |r| {
            (r.step == "plan").then(|| artifact.clone())
        })
        .unwrap();

    let target = workspace.join("artifacts/plan_tasks.json");
    assert_eq!(injected, vec![target.clone()]);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "[1,2,3]");

    // Mutating the copy must not touch the producer's file.
    std::fs::write(&target, "mutated").unwrap();
    assert_eq!(std::fs::read_to_string(&artifact).unwrap(), "[1,2,3]");
}

#[test]
fn unresolvable_artifact_reference_fails() {
    let dir = TempDir::new().unwrap();
    let ws = manager(&dir);
    let workspace = ws
        .create(&RunId::new("r1"), &StepId::new("apply"), None, &[], &vars())
        .unwrap();
    let refs = vec![ArtifactRef::new("plan", "tasks.json")];
    let err = ws
        .inject_artifacts(&workspace, &refs, |_| None)
        .unwrap_err();
    assert!(matches!(err, WorkspaceError::ArtifactUnresolved { .. }), "{err}");
}

#[test]
fn workspaces_are_isolated() {
    let dir = TempDir::new().unwrap();
    let ws = manager(&dir);
    let a = ws
        .create(&RunId::new("r1"), &StepId::new("s1"), None, &[], &vars())
        .unwrap();
    let b = ws
        .create(&RunId::new("r1"), &StepId::new("s2"), None, &[], &vars())
        .unwrap();

    std::fs::write(a.join("scratch.txt"), "only in a").unwrap();
    assert!(!b.join("scratch.txt").exists());
}

#[test]
fn clean_run_removes_the_tree() {
    let dir = TempDir::new().unwrap();
    let ws = manager(&dir);
    let workspace = ws
        .create(&RunId::new("r1"), &StepId::new("plan"), None, &[], &vars())
        .unwrap();
    assert!(workspace.exists());
    ws.clean_run(&RunId::new("r1")).unwrap();
    assert!(!ws.run_root(&RunId::new("r1")).exists());
}

#[test]
fn list_sorted_by_time_orders_oldest_first() {
    let dir = TempDir::new().unwrap();
    let ws = manager(&dir);
    ws.create(&RunId::new("r-old"), &StepId::new("s"), None, &[], &vars())
        .unwrap();
    std::thread::sleep(std::time::Duration::from_millis(20));
    ws.create(&RunId::new("r-new"), &StepId::new("s"), None, &[], &vars())
        .unwrap();

    let listed = ws.list_sorted_by_time().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].0.ends_with("r-old"));
    assert!(listed[1].0.ends_with("r-new"));
}
