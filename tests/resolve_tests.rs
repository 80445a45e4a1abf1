mod common;

use common::{fixture_catalog, ids, idents, STAIRS};
use menusmith::{
    resolve::{resolve_children, resolve_items},
    Catalog, CategoryOverride, Item, ParentOverride,
};
use pretty_assertions::assert_eq;

fn floor_defaults() -> Vec<Item> {
    fixture_catalog()
        .category("floors")
        .map(|category| category.items.clone())
        .expect("floors category")
}

fn with_placeables(ids: &[&str]) -> CategoryOverride {
    let mut entry = CategoryOverride::new("floors");
    entry.placeable_ids = common::ids(ids);
    entry
}

#[test]
fn reordered_placeables_keep_special_slot() {
    let catalog = fixture_catalog();
    let entry = with_placeables(&["b3", "b1", "b2"]);
    let items = resolve_items(&floor_defaults(), Some(&entry), &catalog);
    assert_eq!(idents(&items), ids(&["b3", "b1", STAIRS, "b2"]));
}

#[test]
fn replace_mode_drops_unlisted_defaults() {
    let catalog = fixture_catalog();
    let mut entry = with_placeables(&["b2"]);
    entry.replace_default_placeables = true;
    let items = resolve_items(&floor_defaults(), Some(&entry), &catalog);
    assert_eq!(idents(&items), ids(&["b2", STAIRS]));
}

#[test]
fn replaced_specials_are_rebuilt_from_tags() {
    let catalog = fixture_catalog();
    let mut entry = CategoryOverride::new("floors");
    entry.replace_default_specials = true;
    entry.special_tags = ids(&["special.ladder"]);
    let items = resolve_items(&floor_defaults(), Some(&entry), &catalog);
    assert_eq!(idents(&items), ids(&["b1", "b2", "special.ladder", "b3"]));
    assert_eq!(items[2], Item::special("special.ladder", "Ladder"));
}

#[test]
fn unknown_ids_are_skipped_and_the_rest_still_ordered() {
    let catalog = fixture_catalog();
    let entry = with_placeables(&["ghost", "b3"]);
    let items = resolve_items(&floor_defaults(), Some(&entry), &catalog);
    assert_eq!(idents(&items), ids(&["b3", "b1", STAIRS, "b2"]));
}

#[test]
fn unconstructable_special_is_skipped() {
    let catalog = fixture_catalog();
    let mut entry = CategoryOverride::new("floors");
    entry.special_tags = ids(&["special.ghost"]);
    let items = resolve_items(&floor_defaults(), Some(&entry), &catalog);
    assert_eq!(items, floor_defaults());
}

#[test]
fn duplicate_ids_rank_by_first_occurrence() {
    let catalog = fixture_catalog();
    let entry = with_placeables(&["b2", "b2", "b1"]);
    let items = resolve_items(&floor_defaults(), Some(&entry), &catalog);
    assert_eq!(idents(&items), ids(&["b2", "b1", STAIRS, "b3"]));
}

#[test]
fn catalog_placeable_is_added_and_overflow_appended() {
    let catalog = fixture_catalog();
    let entry = with_placeables(&["lamp_extra"]);
    let items = resolve_items(&floor_defaults(), Some(&entry), &catalog);
    assert_eq!(idents(&items), ids(&["lamp_extra", "b1", STAIRS, "b2", "b3"]));
    assert_eq!(items[0], Item::placeable("lamp_extra", "Standing lamp"));
}

#[test]
fn removed_placeables_are_filtered() {
    let catalog = fixture_catalog();
    let mut entry = CategoryOverride::new("floors");
    entry.mark_removed("b2");
    let items = resolve_items(&floor_defaults(), Some(&entry), &catalog);
    assert_eq!(idents(&items), ids(&["b1", "b3", STAIRS]));
}

#[test]
fn children_append_skips_duplicates() {
    let defaults = ids(&["walls", "floors"]);
    let mut entry = ParentOverride::new("structure");
    entry.set_children(&ids(&["floors", "doors", "doors"]), false);
    assert_eq!(resolve_children(&defaults, Some(&entry)), ids(&["walls", "floors", "doors"]));
}

#[test]
fn children_replace_ignores_defaults() {
    let defaults = ids(&["walls", "floors"]);
    let mut entry = ParentOverride::new("structure");
    entry.set_children(&ids(&["doors"]), true);
    assert_eq!(resolve_children(&defaults, Some(&entry)), ids(&["doors"]));
    assert_eq!(resolve_children(&defaults, None), defaults);
}
