mod common;

use common::{fixture_catalog, ids};
use menusmith::{Engine, JsonFileStore, OverrideSet, OverrideStore, StoreError};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;
use time::OffsetDateTime;

fn sample_overrides() -> OverrideSet {
    let mut overrides = OverrideSet::default();
    overrides
        .parent_mut_or_insert("structure")
        .set_children(&ids(&["doors"]), false);
    let entry = overrides.category_mut_or_insert("floors");
    entry.placeable_ids = ids(&["b3", "b1"]);
    entry.mark_removed("b2");
    entry.has_order_override = true;
    entry.order_override = -4;
    overrides.set_skipped("furniture", true);
    overrides
}

#[test]
fn missing_file_loads_empty_set() {
    let dir = tempdir().expect("temp dir");
    let mut store = JsonFileStore::new(dir.path().join("overrides.json"));
    let loaded = store.load().expect("load");
    assert!(loaded.is_empty());
    assert_eq!(store.saved_at().expect("saved_at"), None);
}

#[test]
fn empty_file_loads_empty_set() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("overrides.json");
    fs::write(&path, "  \n").expect("write");
    let loaded = JsonFileStore::new(&path).load().expect("load");
    assert_eq!(loaded, OverrideSet::default());
}

#[test]
fn saved_set_loads_back_unchanged() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("nested").join("overrides.json");
    let overrides = sample_overrides();

    JsonFileStore::new(&path).save(&overrides).expect("save");
    let loaded = JsonFileStore::new(&path).load().expect("load");
    assert_eq!(loaded, overrides);

    let names: Vec<String> = fs::read_dir(path.parent().expect("parent"))
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["overrides.json".to_string()]);
}

#[test]
fn save_records_timestamp() {
    let dir = tempdir().expect("temp dir");
    let mut store = JsonFileStore::new(dir.path().join("overrides.json"));
    store.save(&OverrideSet::default()).expect("save");

    let stamp = store.saved_at().expect("saved_at").expect("stamp present");
    let age = OffsetDateTime::now_utc() - stamp;
    assert!(age.whole_seconds().abs() < 60);
}

#[test]
fn newer_schema_is_rejected() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("overrides.json");
    fs::write(&path, r#"{ "schema_version": 99 }"#).expect("write");

    let err = JsonFileStore::new(&path).load().expect_err("newer schema");
    assert!(matches!(
        err,
        StoreError::UnsupportedSchema {
            found: 99,
            supported: 1
        }
    ));
}

#[test]
fn malformed_file_reports_path() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("overrides.json");
    fs::write(&path, "{ not json").expect("write");

    let err = JsonFileStore::new(&path).load().expect_err("parse failure");
    assert!(matches!(&err, StoreError::Parse { path: reported, .. } if *reported == path));
}

#[test]
fn hand_edited_duplicates_are_normalized() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("overrides.json");
    fs::write(
        &path,
        r#"{
            "parents": {
                "structure": { "parent_id": "renamed", "child_ids": ["doors", "doors"] }
            },
            "skipped_parents": ["doors", "doors"]
        }"#,
    )
    .expect("write");

    let loaded = JsonFileStore::new(&path).load().expect("load");
    let entry = loaded.parent("structure").expect("parent kept");
    assert_eq!(entry.parent_id, "structure");
    assert_eq!(entry.child_ids, ids(&["doors"]));
    assert_eq!(loaded.skipped_parents, ids(&["doors"]));
}

#[test]
fn dangling_references_are_pruned_in_memory_only() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("overrides.json");
    fs::write(
        &path,
        r#"{
            "parents": {
                "structure": {
                    "parent_id": "structure",
                    "replace_default_children": true,
                    "child_ids": ["ghost", "floors"]
                },
                "vanished": { "parent_id": "vanished", "child_ids": ["walls"] }
            },
            "categories": {
                "floors": { "category_id": "floors", "placeable_ids": ["gone_piece", "b3"] },
                "vanished": { "category_id": "vanished", "order": 2, "special_tags": ["special.stairs"] }
            },
            "skipped_parents": ["vanished"]
        }"#,
    )
    .expect("write");

    let mut engine = Engine::initialize(fixture_catalog(), JsonFileStore::new(&path)).expect("init");
    assert_eq!(engine.children_of("structure"), ids(&["floors"]));
    assert!(engine.overrides().parent("vanished").is_none());
    assert!(engine.overrides().skipped_parents.is_empty());
    assert_eq!(
        engine.overrides().category("floors").map(|entry| entry.placeable_ids.clone()),
        Some(ids(&["b3"]))
    );
    assert!(engine.overrides().category("vanished").is_none());

    let raw = fs::read_to_string(&path).expect("read");
    assert!(raw.contains("ghost"));
}

#[test]
fn engine_edits_survive_restart() {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("overrides.json");

    let mut engine = Engine::initialize(fixture_catalog(), JsonFileStore::new(&path)).expect("init");
    engine.add_child("structure", "doors").expect("save");
    engine.set_parent_skipped("furniture", true).expect("save");
    drop(engine);

    let mut engine = Engine::initialize(fixture_catalog(), JsonFileStore::new(&path)).expect("init");
    assert_eq!(engine.children_of("structure"), ids(&["walls", "floors", "doors"]));
    assert!(engine.is_parent_skipped("furniture"));
}
