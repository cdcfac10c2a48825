use fdmerge::config::{Config, DEFAULT_STATE_FILE};
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all FDMERGE_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("FDMERGE_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
exclude_extensions = [".tmp", ".part"]
state_file_name = ".merge_state.json"
hash_threads = 8
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path));
    assert_eq!(config.exclude_extensions, vec![".tmp", ".part"]);
    assert_eq!(config.state_file_name, ".merge_state.json");
    assert_eq!(config.hash_threads, 8);
    // Unset keys keep their defaults
    assert_eq!(config.progress_interval, 500);
}

#[test]
fn test_env_overrides_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "hash_threads = 2\nprogress_interval = 10\n").unwrap();

    std::env::set_var("FDMERGE_HASH_THREADS", "6");
    let config = Config::load(Some(&config_path));
    clear_env();

    assert_eq!(config.hash_threads, 6);
    assert_eq!(config.progress_interval, 10);
}

#[test]
fn test_invalid_toml_falls_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "hash_threads = \"many\"").unwrap();

    assert_eq!(Config::load(Some(&config_path)), Config::default());
}

#[test]
fn test_missing_explicit_file_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    let temp_dir = tempdir().unwrap();
    let config = Config::load(Some(&temp_dir.path().join("absent.toml")));
    assert_eq!(config.state_file_name, DEFAULT_STATE_FILE);
    assert_eq!(config.hash_threads, 1);
}

#[test]
fn test_zero_values_are_clamped() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();

    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "hash_threads = 0\nprogress_interval = 0\n").unwrap();

    let config = Config::load(Some(&config_path));
    assert_eq!(config.hash_threads, 1);
    assert_eq!(config.progress_interval, 1);
}

#[test]
fn test_config_path_names_the_tool() {
    if let Some(path) = Config::config_path() {
        assert!(path.ends_with("config.toml"));
        assert!(path.to_string_lossy().contains("fdmerge"));
    }
}
