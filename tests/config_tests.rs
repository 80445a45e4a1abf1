use menusmith::config::AppConfig;
use pretty_assertions::assert_eq;
use std::{fs, path::PathBuf};
use tempfile::tempdir;

#[test]
fn first_run_writes_defaults() {
    let dir = tempdir().expect("temp dir");
    let config = AppConfig::load_or_create_in(dir.path()).expect("config");

    assert_eq!(config.log_filter, "warn");
    assert_eq!(config.catalog_path(), None);
    assert_eq!(config.overrides_path(), dir.path().join("overrides.json"));
    assert!(dir.path().join("config.json").exists());
}

#[test]
fn saved_paths_are_read_back() {
    let dir = tempdir().expect("temp dir");
    let mut config = AppConfig::load_or_create_in(dir.path()).expect("config");
    config.catalog_path = Some(PathBuf::from("/srv/catalog.json"));
    config.overrides_path = Some(PathBuf::from("/srv/overrides.json"));
    config.log_filter = "menusmith=debug".to_string();
    config.save().expect("save");

    let reloaded = AppConfig::load_or_create_in(dir.path()).expect("config");
    assert_eq!(reloaded.catalog_path(), Some(PathBuf::from("/srv/catalog.json").as_path()));
    assert_eq!(reloaded.overrides_path(), PathBuf::from("/srv/overrides.json"));
    assert_eq!(reloaded.log_filter, "menusmith=debug");
}

#[test]
fn blank_log_filter_falls_back_to_default() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("config.json"), r#"{ "log_filter": "  " }"#).expect("write");

    let config = AppConfig::load_or_create_in(dir.path()).expect("config");
    assert_eq!(config.log_filter, "warn");
    let raw = fs::read_to_string(dir.path().join("config.json")).expect("read");
    assert!(raw.contains("\"warn\""));
}

#[test]
fn malformed_config_is_an_error() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("config.json"), "[").expect("write");
    assert!(AppConfig::load_or_create_in(dir.path()).is_err());
}
