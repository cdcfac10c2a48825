use clap::Parser;
use fdmerge::cli::Cli;
use fdmerge::error::ExitCode;
use fdmerge::merge::{MergeError, MergeOptions, MergeRun, SuffixSource};
use fdmerge::progress::ProgressCallback;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::tempdir;

fn options(target: &Path, folders: &[&Path]) -> MergeOptions {
    MergeOptions::new(
        target.to_path_buf(),
        folders.iter().map(|p| p.to_path_buf()).collect(),
    )
}

/// Deletes a file once enumeration is over and hashing begins.
struct DeleteBeforeHashing {
    victim: PathBuf,
}

impl ProgressCallback for DeleteBeforeHashing {
    fn on_phase_start(&self, phase: &str, _total: usize) {
        if phase == "hashing" {
            let _ = fs::remove_file(&self.victim);
        }
    }
    fn on_progress(&self, _current: usize, _path: &str) {}
    fn on_phase_end(&self, _phase: &str) {}
}

/// Always proposes the same suffix.
struct StuckSuffix;

impl SuffixSource for StuckSuffix {
    fn next_suffix(&mut self) -> String {
        "aaaa".to_string()
    }
}

#[test]
fn test_missing_target_is_general_error() {
    let a = tempdir().unwrap();
    let missing = a.path().join("no-such-target");

    let err = MergeRun::new(options(&missing, &[a.path()]))
        .execute()
        .unwrap_err();

    assert!(matches!(err, MergeError::TargetMissing(_)));
    assert_eq!(err.exit_code(), ExitCode::GeneralError);
}

#[test]
fn test_missing_source_is_general_error() {
    let target = tempdir().unwrap();
    let missing = target.path().join("gone");

    let err = MergeRun::new(options(target.path(), &[&missing]))
        .execute()
        .unwrap_err();

    assert!(matches!(err, MergeError::SourceMissing(_)));
    assert_eq!(err.exit_code().as_i32(), 1);
}

#[test]
fn test_file_vanishing_before_hashing_aborts() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("keep.txt"), b"keep").unwrap();
    fs::write(a.path().join("vanish.txt"), b"vanish").unwrap();

    let callback = Arc::new(DeleteBeforeHashing {
        victim: a.path().join("vanish.txt"),
    });
    let err = MergeRun::new(options(target.path(), &[a.path()]))
        .with_progress_callback(callback)
        .execute()
        .unwrap_err();

    assert!(matches!(err, MergeError::SourceVanished(_)), "got {err:?}");
    assert_ne!(err.exit_code(), ExitCode::Success);
    assert_eq!(fs::read_dir(target.path()).unwrap().count(), 0);
}

#[test]
fn test_rename_exhaustion_exits_two() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("note.txt"), b"first").unwrap();
    fs::write(b.path().join("note.txt"), b"second").unwrap();
    fs::write(target.path().join("note__COPYaaaa.txt"), b"squatter").unwrap();

    let err = MergeRun::new(options(target.path(), &[a.path(), b.path()]))
        .with_suffixes(Box::new(StuckSuffix))
        .execute()
        .unwrap_err();

    match &err {
        MergeError::RenameExhausted { attempts, .. } => assert_eq!(*attempts, 6),
        other => panic!("Expected RenameExhausted, got {other:?}"),
    }
    assert_eq!(err.exit_code().as_i32(), 2);
    // The first copy is not rolled back
    assert_eq!(fs::read(target.path().join("note.txt")).unwrap(), b"first");
}

#[test]
fn test_stale_snapshot_fails_verification_with_exit_three() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("doc.txt"), b"original").unwrap();

    MergeRun::new(
        options(target.path(), &[a.path()])
            .with_hash_snapshots(false, true)
            .with_dry_run(true),
    )
    .execute()
    .unwrap();
    fs::write(a.path().join("doc.txt"), b"changed after snapshot").unwrap();

    let err = MergeRun::new(options(target.path(), &[a.path()]).with_hash_snapshots(true, false))
        .execute()
        .unwrap_err();

    assert!(matches!(err, MergeError::DigestMismatch { .. }), "got {err:?}");
    assert_eq!(err.exit_code(), ExitCode::IntegrityFailure);
    assert_eq!(err.exit_code().as_i32(), 3);
}

#[test]
fn test_raised_shutdown_flag_interrupts() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("x"), b"x").unwrap();

    let err = MergeRun::new(options(target.path(), &[a.path()]))
        .with_shutdown_flag(Arc::new(AtomicBool::new(true)))
        .execute()
        .unwrap_err();

    assert!(matches!(err, MergeError::Interrupted));
    assert_eq!(err.exit_code().as_i32(), 130);
}

#[test]
fn test_run_app_error_maps_to_exit_code() {
    let a = tempdir().unwrap();
    let cli = Cli::try_parse_from([
        "fdmerge",
        "--quiet",
        "merge-sources",
        "--folders",
        a.path().to_str().unwrap(),
        "--target",
        a.path().join("missing").to_str().unwrap(),
    ])
    .unwrap();

    let err = fdmerge::run_app(cli).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{err:#}").contains("missing"));
}

#[test]
fn test_run_app_success() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("x.txt"), b"x").unwrap();
    let cli = Cli::try_parse_from([
        "fdmerge",
        "--quiet",
        "merge-sources",
        "--folders",
        a.path().to_str().unwrap(),
        "--target",
        target.path().to_str().unwrap(),
    ])
    .unwrap();

    assert_eq!(fdmerge::run_app(cli).unwrap(), ExitCode::Success);
    assert!(target.path().join("x.txt").is_file());
}
