use super::{AppConfig, SettingsStore, DEFAULT_ACTIVATION_DB, DEFAULT_MIN_SILENCE_SECS};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

static PATH_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn temp_settings_path(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "soundtrap_settings_{tag}_{}_{}.json",
        std::process::id(),
        PATH_COUNTER.fetch_add(1, Ordering::SeqCst)
    ))
}

fn parse(args: &[&str]) -> AppConfig {
    let mut full = vec!["soundtrap"];
    full.extend_from_slice(args);
    AppConfig::parse_from(full)
}

#[test]
fn defaults_validate() {
    let mut config = parse(&[]);
    config.validate().expect("defaults should be valid");
    assert!(config.activation_db.is_none());
    assert!(config.min_silence_secs.is_none());
}

#[test]
fn channel_capacity_out_of_range_is_rejected() {
    let mut config = parse(&["--channel-capacity", "4"]);
    let err = config.validate().expect_err("capacity 4 should fail");
    assert!(err.to_string().contains("--channel-capacity"));
}

#[test]
fn activation_db_is_clamped_not_rejected() {
    let mut config = parse(&["--activation-db", "99"]);
    config.validate().expect("out-of-range threshold clamps");
    assert_eq!(config.activation_db, Some(80));

    let mut config = parse(&["--activation-db", "10"]);
    config.validate().unwrap();
    assert_eq!(config.activation_db, Some(45));
}

#[test]
fn min_silence_secs_is_clamped_not_rejected() {
    let mut config = parse(&["--min-silence-secs", "1"]);
    config.validate().expect("out-of-range timeout clamps");
    assert_eq!(config.min_silence_secs, Some(5));

    let mut config = parse(&["--min-silence-secs", "120"]);
    config.validate().unwrap();
    assert_eq!(config.min_silence_secs, Some(30));
}

#[test]
fn explicit_paths_win_over_defaults() {
    let config = parse(&["--save-dir", "/tmp/recs", "--settings-file", "/tmp/s.json"]);
    assert_eq!(config.save_dir(), PathBuf::from("/tmp/recs"));
    assert_eq!(config.settings_path(), PathBuf::from("/tmp/s.json"));
}

#[test]
fn missing_settings_file_yields_defaults() {
    let store = SettingsStore::load(temp_settings_path("missing"));
    assert_eq!(store.min_silence_secs(), DEFAULT_MIN_SILENCE_SECS);
    assert_eq!(store.activation_db(), DEFAULT_ACTIVATION_DB);
}

#[test]
fn corrupt_settings_file_yields_defaults() {
    let path = temp_settings_path("corrupt");
    std::fs::write(&path, "not json at all").unwrap();
    let store = SettingsStore::load(path);
    assert_eq!(store.min_silence_secs(), DEFAULT_MIN_SILENCE_SECS);
    assert_eq!(store.activation_db(), DEFAULT_ACTIVATION_DB);
}

#[test]
fn out_of_range_persisted_values_are_clamped_on_load() {
    let path = temp_settings_path("clamp");
    std::fs::write(&path, r#"{"min_silence_secs": 99, "activation_db": 1}"#).unwrap();
    let store = SettingsStore::load(path);
    assert_eq!(store.min_silence_secs(), 30);
    assert_eq!(store.activation_db(), 45);
}

#[test]
fn settings_survive_a_reload() {
    let path = temp_settings_path("roundtrip");
    let store = SettingsStore::load(path.clone());
    store.set_min_silence_secs(15);
    store.set_activation_db(62);

    let reloaded = SettingsStore::load(path);
    assert_eq!(reloaded.min_silence_secs(), 15);
    assert_eq!(reloaded.activation_db(), 62);
}

#[test]
fn setters_clamp_into_the_documented_range() {
    let store = SettingsStore::load(temp_settings_path("setter_clamp"));
    store.set_min_silence_secs(2);
    store.set_activation_db(200);
    assert_eq!(store.min_silence_secs(), 5);
    assert_eq!(store.activation_db(), 80);
}

#[test]
fn snapshot_reflects_the_current_settings() {
    let store = SettingsStore::load(temp_settings_path("snapshot"));
    store.set_min_silence_secs(12);
    store.set_activation_db(55);
    let snapshot = store.snapshot();
    assert_eq!(snapshot.silence_timeout, Duration::from_secs(12));
    assert_eq!(snapshot.activation_threshold_db, 55.0);
}
