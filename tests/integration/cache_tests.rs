use fdmerge::cache::{CacheResult, HashCache, StateFile};
use fdmerge::config::DEFAULT_STATE_FILE;
use fdmerge::dedup::FolderMap;
use fdmerge::merge::{MergeOptions, MergeRun};
use fdmerge::scanner::ContentDigest;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

fn options(target: &Path, folders: &[&Path]) -> MergeOptions {
    MergeOptions::new(
        target.to_path_buf(),
        folders.iter().map(|p| p.to_path_buf()).collect(),
    )
}

#[derive(Default)]
struct MemoryCache {
    maps: Mutex<HashMap<PathBuf, FolderMap>>,
}

impl HashCache for MemoryCache {
    fn load(&self, folder_root: &Path) -> CacheResult<Option<FolderMap>> {
        Ok(self.maps.lock().unwrap().get(folder_root).cloned())
    }

    fn save(&self, folder_root: &Path, map: &FolderMap) -> CacheResult<()> {
        self.maps
            .lock()
            .unwrap()
            .insert(folder_root.to_path_buf(), map.clone());
        Ok(())
    }
}

#[test]
fn test_store_writes_state_file_per_folder() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("one.txt"), b"1").unwrap();
    fs::write(b.path().join("two.txt"), b"2").unwrap();

    MergeRun::new(options(target.path(), &[a.path(), b.path()]).with_hash_snapshots(false, true))
        .execute()
        .unwrap();

    assert!(a.path().join(DEFAULT_STATE_FILE).is_file());
    assert!(b.path().join(DEFAULT_STATE_FILE).is_file());
    // The state file is never merged into the target
    assert!(!target.path().join(DEFAULT_STATE_FILE).exists());
}

#[test]
fn test_state_file_not_scanned_as_source() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("one.txt"), b"1").unwrap();

    MergeRun::new(options(target.path(), &[a.path()]).with_hash_snapshots(false, true))
        .execute()
        .unwrap();
    let report = MergeRun::new(options(target.path(), &[a.path()]).with_hash_snapshots(false, true))
        .execute()
        .unwrap();

    assert_eq!(report.folders[0].files, 1);
    assert_eq!(report.index.len(), 1);
}

#[test]
fn test_loaded_snapshot_is_trusted_over_live_files() {
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

    fs::write(a.path().join("doc.txt"), b"edited since").unwrap();
    fs::write(a.path().join("added.txt"), b"never seen").unwrap();

    let report = MergeRun::new(
        options(target.path(), &[a.path()])
            .with_hash_snapshots(true, false)
            .with_dry_run(true),
    )
    .execute()
    .unwrap();

    assert!(report.folders[0].from_cache);
    assert_eq!(report.index.len(), 1);
    assert!(report.index.contains(&ContentDigest::of_bytes(b"original")));
    assert!(!report.index.contains(&ContentDigest::of_bytes(b"never seen")));
}

#[test]
fn test_corrupt_state_file_falls_back_to_scan() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("file.bin"), b"payload").unwrap();
    fs::write(a.path().join(DEFAULT_STATE_FILE), b"{ not json").unwrap();

    let report = MergeRun::new(options(target.path(), &[a.path()]).with_hash_snapshots(true, false))
        .execute()
        .unwrap();

    assert!(!report.folders[0].from_cache);
    assert!(report.index.contains(&ContentDigest::of_bytes(b"payload")));
    assert_eq!(report.outcome.copies.len(), 1);
}

#[test]
fn test_missing_state_file_scans_folder() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("file.bin"), b"payload").unwrap();

    let report = MergeRun::new(options(target.path(), &[a.path()]).with_hash_snapshots(true, false))
        .execute()
        .unwrap();

    assert!(!report.folders[0].from_cache);
    assert_eq!(report.index.len(), 1);
}

#[test]
fn test_cached_map_takes_role_of_current_pass() {
    let shared = tempdir().unwrap();
    let fresh = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(shared.path().join("kept.txt"), b"kept").unwrap();
    fs::write(fresh.path().join("new.txt"), b"new").unwrap();

    // Snapshot taken while `shared` was copy-eligible
    let cache = Arc::new(MemoryCache::default());
    MergeRun::new(
        options(target.path(), &[shared.path()])
            .with_hash_snapshots(false, true)
            .with_dry_run(true),
    )
    .with_cache(cache.clone())
    .execute()
    .unwrap();

    let report = MergeRun::new(
        options(target.path(), &[fresh.path()])
            .with_compare_only(vec![shared.path().to_path_buf()])
            .with_hash_snapshots(true, false),
    )
    .with_cache(cache)
    .execute()
    .unwrap();

    assert!(report.folders[0].from_cache);
    let record = report.index.get(&ContentDigest::of_bytes(b"kept")).unwrap();
    assert!(!record.copy_eligible);
    assert_eq!(report.outcome.copies.len(), 1);
    assert!(target.path().join("new.txt").is_file());
    assert!(!target.path().join("kept.txt").exists());
}

#[test]
fn test_custom_state_file_name() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join("x"), b"x").unwrap();

    MergeRun::new(
        options(target.path(), &[a.path()])
            .with_hash_snapshots(false, true)
            .with_state_file_name(".hashes.json"),
    )
    .execute()
    .unwrap();

    let state = StateFile::new(".hashes.json");
    assert!(state.path_for(a.path()).is_file());
    let loaded = state.load(a.path()).unwrap().unwrap();
    assert_eq!(loaded.len(), 1);
}

#[test]
fn test_state_file_name_merged_when_snapshots_disabled() {
    let a = tempdir().unwrap();
    let target = tempdir().unwrap();
    fs::write(a.path().join(DEFAULT_STATE_FILE), b"user data, not a snapshot").unwrap();

    let report = MergeRun::new(options(target.path(), &[a.path()]))
        .execute()
        .unwrap();

    assert_eq!(report.folders[0].files, 1);
    assert_eq!(report.outcome.copies.len(), 1);
    assert_eq!(
        fs::read(target.path().join(DEFAULT_STATE_FILE)).unwrap(),
        b"user data, not a snapshot"
    );
}
