use fdmerge::dedup::FolderRole;
use fdmerge::merge::{MergeOptions, MergeRun, RandomSuffix};
use fdmerge::scanner::ContentDigest;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn merge(target: &Path, folders: &[&Path]) -> MergeOptions {
    MergeOptions::new(
        target.to_path_buf(),
        folders.iter().map(|p| p.to_path_buf()).collect(),
    )
}

fn target_files(target: &Path) -> BTreeSet<String> {
    walkdir::WalkDir::new(target)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(target)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect()
}

#[test]
fn test_identical_files_copied_once() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let target = tempdir().unwrap();
    write(&a.path().join("note.txt"), b"same bytes");
    write(&b.path().join("note.txt"), b"same bytes");

    let report = MergeRun::new(merge(target.path(), &[a.path(), b.path()]))
        .execute()
        .unwrap();

    assert_eq!(target_files(target.path()), BTreeSet::from(["note.txt".to_string()]));
    assert_eq!(report.outcome.copies.len(), 1);
    assert!(report.outcome.renames.is_empty());

    let digest = ContentDigest::of_bytes(b"same bytes");
    let duplicates = report.collisions.duplicates_of(&digest);
    assert_eq!(duplicates.len(), 1);
    assert!(duplicates[0].source_path.starts_with(b.path()));
    assert!(report.index.get(&digest).unwrap().source_path.starts_with(a.path()));
}

#[test]
fn test_different_files_same_name_renamed() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let target = tempdir().unwrap();
    write(&a.path().join("note.txt"), b"first");
    write(&b.path().join("note.txt"), b"second");

    let report = MergeRun::new(merge(target.path(), &[a.path(), b.path()]))
        .with_suffixes(Box::new(RandomSuffix::seeded(7)))
        .execute()
        .unwrap();

    assert_eq!(report.outcome.copies.len(), 2);
    assert_eq!(report.outcome.renames.len(), 1);

    let rename = &report.outcome.renames[0];
    assert_eq!(rename.requested, report.target.join("note.txt"));
    assert_eq!(rename.digest, ContentDigest::of_bytes(b"second"));

    let name = rename.resolved.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("note__COPY"), "unexpected name {name}");
    assert!(name.ends_with(".txt"));
    let suffix = &name["note__COPY".len()..name.len() - ".txt".len()];
    assert_eq!(suffix.len(), 4);
    assert!(suffix.chars().all(|c| c.is_ascii_lowercase()));

    assert_eq!(fs::read(report.target.join("note.txt")).unwrap(), b"first");
    assert_eq!(fs::read(&rename.resolved).unwrap(), b"second");
}

#[test]
fn test_compare_only_claims_content() {
    let backup = tempdir().unwrap();
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    write(&backup.path().join("old/photo.jpg"), b"pixels");
    write(&a.path().join("new/photo.jpg"), b"pixels");
    write(&a.path().join("new/fresh.jpg"), b"fresh pixels");

    let options = merge(target.path(), &[a.path()])
        .with_compare_only(vec![backup.path().to_path_buf()]);
    let report = MergeRun::new(options).execute().unwrap();

    let digest = ContentDigest::of_bytes(b"pixels");
    let canonical = report.index.get(&digest).unwrap();
    assert!(!canonical.copy_eligible);
    assert!(canonical.source_path.starts_with(backup.path()));
    assert_eq!(report.collisions.duplicates_of(&digest).len(), 1);

    assert_eq!(
        target_files(target.path()),
        BTreeSet::from(["new/fresh.jpg".to_string()])
    );
    assert_eq!(report.folders[0].role, FolderRole::CompareOnly);
    assert_eq!(report.folders[1].role, FolderRole::CopyEligible);
}

#[test]
fn test_directory_structure_preserved() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let target = tempdir().unwrap();
    write(&a.path().join("2020/01/img.png"), b"one");
    write(&b.path().join("2021/deep/nested/img.png"), b"two");

    MergeRun::new(merge(target.path(), &[a.path(), b.path()]))
        .execute()
        .unwrap();

    assert_eq!(
        target_files(target.path()),
        BTreeSet::from([
            "2020/01/img.png".to_string(),
            "2021/deep/nested/img.png".to_string()
        ])
    );
}

#[test]
fn test_index_holds_every_distinct_content() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let c = tempdir().unwrap();
    let target = tempdir().unwrap();
    let contents: [&[u8]; 4] = [b"alpha", b"beta", b"gamma", b""];
    write(&a.path().join("1"), contents[0]);
    write(&a.path().join("2"), contents[1]);
    write(&a.path().join("dup"), contents[0]);
    write(&b.path().join("3"), contents[2]);
    write(&b.path().join("4"), contents[0]);
    write(&c.path().join("empty"), contents[3]);
    write(&c.path().join("5"), contents[1]);

    let options =
        merge(target.path(), &[a.path(), b.path()]).with_compare_only(vec![c.path().to_path_buf()]);
    let report = MergeRun::new(options).execute().unwrap();

    let expected: BTreeSet<ContentDigest> =
        contents.iter().map(|c| ContentDigest::of_bytes(c)).collect();
    let indexed: BTreeSet<ContentDigest> = report.index.iter().map(|(d, _)| *d).collect();
    assert_eq!(indexed, expected);

    // 7 files, 4 distinct contents
    assert_eq!(report.collisions.duplicate_files(), 3);
    for (digest, duplicates) in report.collisions.iter() {
        let canonical = report.index.get(digest).unwrap();
        assert!(duplicates.iter().all(|d| d.source_path != canonical.source_path));
    }
}

#[test]
fn test_rerun_is_idempotent() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let target = tempdir().unwrap();
    write(&a.path().join("x.txt"), b"x");
    write(&a.path().join("sub/y.txt"), b"y");
    write(&b.path().join("z.txt"), b"z");

    let first = MergeRun::new(merge(target.path(), &[a.path(), b.path()]))
        .execute()
        .unwrap();
    assert_eq!(first.outcome.copies.len(), 3);

    let second = MergeRun::new(merge(target.path(), &[a.path(), b.path()]))
        .execute()
        .unwrap();
    assert!(second.outcome.copies.is_empty());
    assert!(second.outcome.renames.is_empty());
    assert_eq!(second.outcome.skipped_existing.len(), 3);
}

#[test]
fn test_existing_name_skipped_without_comparing_content() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    write(&a.path().join("note.txt"), b"new content");
    write(&target.path().join("note.txt"), b"unrelated leftover");

    let report = MergeRun::new(merge(target.path(), &[a.path()]))
        .execute()
        .unwrap();

    assert!(report.outcome.copies.is_empty());
    assert!(report.outcome.renames.is_empty());
    assert_eq!(report.outcome.skipped_existing, vec![report.target.join("note.txt")]);
    assert_eq!(
        fs::read(target.path().join("note.txt")).unwrap(),
        b"unrelated leftover"
    );
}

#[test]
fn test_directory_at_target_name_triggers_rename() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    write(&a.path().join("data"), b"file named data");
    fs::create_dir(target.path().join("data")).unwrap();

    let report = MergeRun::new(merge(target.path(), &[a.path()]))
        .execute()
        .unwrap();

    assert_eq!(report.outcome.renames.len(), 1);
    let resolved = &report.outcome.renames[0].resolved;
    let name = resolved.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("data__COPY"));
    assert_eq!(name.len(), "data__COPY".len() + 4);
    assert_eq!(fs::read(resolved).unwrap(), b"file named data");
}

#[test]
fn test_excluded_extensions_never_scanned() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    write(&a.path().join("keep.txt"), b"keep");
    write(&a.path().join("skip.TMP"), b"skip");
    write(&a.path().join("sub/also.log"), b"log");

    let options = merge(target.path(), &[a.path()])
        .with_exclude_extensions(vec![".tmp".to_string(), "log".to_string()]);
    let report = MergeRun::new(options).execute().unwrap();

    assert_eq!(report.index.len(), 1);
    assert_eq!(report.folders[0].histogram.count(".txt"), 1);
    assert_eq!(target_files(target.path()), BTreeSet::from(["keep.txt".to_string()]));
}

#[test]
fn test_copy_preserves_modification_time() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    let source = a.path().join("old.txt");
    write(&source, b"vintage");
    let mtime = filetime::FileTime::from_unix_time(1_000_000_000, 0);
    filetime::set_file_mtime(&source, mtime).unwrap();

    MergeRun::new(merge(target.path(), &[a.path()]))
        .execute()
        .unwrap();

    let copied = fs::metadata(target.path().join("old.txt")).unwrap();
    assert_eq!(filetime::FileTime::from_last_modification_time(&copied), mtime);
}

#[cfg(unix)]
#[test]
fn test_symlink_copied_as_link() {
    let a = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let target = tempdir().unwrap();
    let referent = outside.path().join("real.txt");
    write(&referent, b"real");
    std::os::unix::fs::symlink(&referent, a.path().join("link.txt")).unwrap();

    let report = MergeRun::new(merge(target.path(), &[a.path()]))
        .execute()
        .unwrap();

    let link = target.path().join("link.txt");
    assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
    assert_eq!(fs::read_link(&link).unwrap(), referent);
    assert_eq!(report.outcome.copies[0].bytes, 0);
}

#[test]
fn test_parallel_hashing_keeps_first_seen_order() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    for i in 0..20 {
        write(&a.path().join(format!("f{i:02}.bin")), b"same");
    }

    let options = merge(target.path(), &[a.path()]).with_hash_threads(4);
    let report = MergeRun::new(options).execute().unwrap();

    let digest = ContentDigest::of_bytes(b"same");
    assert!(report
        .index
        .get(&digest)
        .unwrap()
        .source_path
        .ends_with("f00.bin"));
    assert_eq!(report.collisions.duplicates_of(&digest).len(), 19);
}

#[test]
fn test_repeated_collisions_get_distinct_names() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let c = tempdir().unwrap();
    let target = tempdir().unwrap();
    write(&a.path().join("note.txt"), b"one");
    write(&b.path().join("note.txt"), b"two");
    write(&c.path().join("note.txt"), b"three");

    let report = MergeRun::new(merge(target.path(), &[a.path(), b.path(), c.path()]))
        .with_suffixes(Box::new(RandomSuffix::seeded(3)))
        .execute()
        .unwrap();

    assert_eq!(report.outcome.copies.len(), 3);
    assert_eq!(report.outcome.renames.len(), 2);
    let names: BTreeSet<String> = report
        .outcome
        .renames
        .iter()
        .map(|r| r.resolved.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 2, "renames reused a name: {names:?}");
    assert!(names.iter().all(|n| n.starts_with("note__COPY") && n.ends_with(".txt")));
    assert!(!names.contains("note.txt"));

    let contents: BTreeSet<Vec<u8>> = target_files(target.path())
        .iter()
        .map(|name| fs::read(target.path().join(name)).unwrap())
        .collect();
    assert_eq!(
        contents,
        BTreeSet::from([b"one".to_vec(), b"two".to_vec(), b"three".to_vec()])
    );
}

#[cfg(unix)]
#[test]
fn test_file_written_this_run_recognised_through_symlinked_directory() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let target = tempdir().unwrap();
    write(&a.path().join("real").join("x.txt"), b"content one");
    write(&b.path().join("docs").join("x.txt"), b"content two");
    fs::create_dir(target.path().join("real")).unwrap();
    std::os::unix::fs::symlink(target.path().join("real"), target.path().join("docs")).unwrap();

    let report = MergeRun::new(merge(target.path(), &[a.path(), b.path()]))
        .with_suffixes(Box::new(RandomSuffix::seeded(7)))
        .execute()
        .unwrap();

    assert_eq!(report.outcome.copies.len(), 2);
    assert_eq!(report.outcome.renames.len(), 1);
    assert!(report.outcome.skipped_existing.is_empty());

    let rename = &report.outcome.renames[0];
    assert_eq!(rename.requested, report.target.join("docs").join("x.txt"));
    assert_eq!(fs::read(&rename.resolved).unwrap(), b"content two");
    assert_eq!(
        fs::read(target.path().join("real").join("x.txt")).unwrap(),
        b"content one"
    );
    assert_eq!(fs::read_dir(target.path().join("real")).unwrap().count(), 2);
}
