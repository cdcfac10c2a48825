use fdmerge::merge::{MergeOptions, MergeRun};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_dry_run_writes_nothing_but_counts_everything() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let target = tempdir().unwrap();
    for i in 0..10 {
        fs::create_dir_all(a.path().join(format!("dir{i}"))).unwrap();
        fs::write(a.path().join(format!("dir{i}/file{i}.dat")), format!("content {i}")).unwrap();
    }
    // Three duplicates of files already in `a`
    for i in 0..3 {
        fs::write(b.path().join(format!("copy{i}.dat")), format!("content {i}")).unwrap();
    }

    let options = MergeOptions::new(
        target.path().to_path_buf(),
        vec![a.path().to_path_buf(), b.path().to_path_buf()],
    )
    .with_dry_run(true);
    let report = MergeRun::new(options).execute().unwrap();

    assert!(report.dry_run);
    assert_eq!(report.index.len(), 10);
    assert_eq!(report.collisions.duplicate_sets(), 3);
    assert_eq!(report.collisions.duplicate_files(), 3);
    assert!(report.outcome.copies.is_empty());
    assert!(report.outcome.renames.is_empty());

    let stop = report.outcome.dry_run_stop.as_ref().unwrap();
    assert!(stop.source.ends_with("dir0/file0.dat"));
    assert_eq!(
        stop.target.as_deref(),
        Some(report.target.join("dir0").join("file0.dat").as_path())
    );

    // Not even directories are created
    assert_eq!(fs::read_dir(target.path()).unwrap().count(), 0);
}

#[test]
fn test_dry_run_stop_on_existing_target_name() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("present.txt"), b"src").unwrap();
    fs::write(target.path().join("present.txt"), b"already there").unwrap();

    let options = MergeOptions::new(target.path().to_path_buf(), vec![a.path().to_path_buf()])
        .with_dry_run(true);
    let report = MergeRun::new(options).execute().unwrap();

    let stop = report.outcome.dry_run_stop.as_ref().unwrap();
    assert_eq!(stop.target, None);
    assert!(report.outcome.skipped_existing.is_empty());
    assert_eq!(
        fs::read(target.path().join("present.txt")).unwrap(),
        b"already there"
    );
}

#[test]
fn test_dry_run_with_only_compare_content_has_no_stop() {
    let backup = tempdir().unwrap();
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(backup.path().join("x"), b"same").unwrap();
    fs::write(a.path().join("y"), b"same").unwrap();

    let options = MergeOptions::new(target.path().to_path_buf(), vec![a.path().to_path_buf()])
        .with_compare_only(vec![backup.path().to_path_buf()])
        .with_dry_run(true);
    let report = MergeRun::new(options).execute().unwrap();

    assert!(report.outcome.dry_run_stop.is_none());
    assert_eq!(report.index.len(), 1);
}
