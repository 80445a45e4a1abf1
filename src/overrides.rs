use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

pub const OVERRIDES_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentOverride {
    pub parent_id: String,
    #[serde(default)]
    pub replace_default_children: bool,
    #[serde(default)]
    pub child_ids: Vec<String>,
}

impl ParentOverride {
    pub fn new(parent_id: &str) -> Self {
        Self {
            parent_id: parent_id.to_string(),
            ..Self::default()
        }
    }

    pub fn set_children(&mut self, ids: &[String], replace: bool) {
        self.replace_default_children = replace;
        self.child_ids = dedup_first_wins(ids.iter().cloned());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryOverride {
    pub category_id: String,
    #[serde(default)]
    pub has_order_override: bool,
    #[serde(default)]
    pub order_override: i32,
    #[serde(default)]
    pub replace_default_placeables: bool,
    #[serde(default)]
    pub replace_default_specials: bool,
    #[serde(default)]
    pub placeable_ids: Vec<String>,
    #[serde(default)]
    pub special_tags: Vec<String>,
    #[serde(default)]
    pub removed_placeable_ids: Vec<String>,
}

impl CategoryOverride {
    pub fn new(category_id: &str) -> Self {
        Self {
            category_id: category_id.to_string(),
            ..Self::default()
        }
    }

    pub fn has_modifications(&self) -> bool {
        self.replace_default_placeables
            || self.replace_default_specials
            || self.has_order_override
            || !self.placeable_ids.is_empty()
            || !self.special_tags.is_empty()
            || !self.removed_placeable_ids.is_empty()
    }

    pub fn is_removed(&self, placeable_id: &str) -> bool {
        self.removed_placeable_ids.iter().any(|id| id == placeable_id)
    }

    pub fn mark_removed(&mut self, placeable_id: &str) {
        if !self.is_removed(placeable_id) {
            self.removed_placeable_ids.push(placeable_id.to_string());
        }
    }

    pub fn unmark_removed(&mut self, placeable_id: &str) {
        self.removed_placeable_ids.retain(|id| id != placeable_id);
    }

    /// Clears every item customization; the order override survives.
    pub fn reset_items(&mut self) {
        self.replace_default_placeables = false;
        self.replace_default_specials = false;
        self.placeable_ids.clear();
        self.special_tags.clear();
        self.removed_placeable_ids.clear();
    }

    pub fn effective_order(&self, declared: i32) -> i32 {
        if self.has_order_override {
            self.order_override
        } else {
            declared
        }
    }
}

/// Everything the user customized, keyed for stable serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideSet {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub parents: BTreeMap<String, ParentOverride>,
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryOverride>,
    #[serde(default)]
    pub skipped_parents: Vec<String>,
}

impl Default for OverrideSet {
    fn default() -> Self {
        Self {
            schema_version: OVERRIDES_SCHEMA_VERSION,
            parents: BTreeMap::new(),
            categories: BTreeMap::new(),
            skipped_parents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub parents: usize,
    pub categories: usize,
    pub child_ids: usize,
    pub placeable_ids: usize,
    pub removed_ids: usize,
    pub skipped: usize,
}

impl PruneReport {
    pub fn total(&self) -> usize {
        self.parents
            + self.categories
            + self.child_ids
            + self.placeable_ids
            + self.removed_ids
            + self.skipped
    }
}

impl OverrideSet {
    pub fn parent(&self, parent_id: &str) -> Option<&ParentOverride> {
        self.parents.get(parent_id)
    }

    pub fn parent_mut_or_insert(&mut self, parent_id: &str) -> &mut ParentOverride {
        self.parents
            .entry(parent_id.to_string())
            .or_insert_with(|| ParentOverride::new(parent_id))
    }

    pub fn category(&self, category_id: &str) -> Option<&CategoryOverride> {
        self.categories.get(category_id)
    }

    pub fn category_mut_or_insert(&mut self, category_id: &str) -> &mut CategoryOverride {
        self.categories
            .entry(category_id.to_string())
            .or_insert_with(|| CategoryOverride::new(category_id))
    }

    pub fn is_modified(&self, category_id: &str) -> bool {
        self.category(category_id)
            .is_some_and(CategoryOverride::has_modifications)
    }

    /// Drops a category override that no longer changes anything.
    pub fn drop_if_unmodified(&mut self, category_id: &str) {
        if self
            .categories
            .get(category_id)
            .is_some_and(|entry| !entry.has_modifications())
        {
            self.categories.remove(category_id);
        }
    }

    pub fn is_skipped(&self, parent_id: &str) -> bool {
        self.skipped_parents.iter().any(|id| id == parent_id)
    }

    /// Returns whether the skip set changed.
    pub fn set_skipped(&mut self, parent_id: &str, skipped: bool) -> bool {
        let present = self.is_skipped(parent_id);
        if skipped && !present {
            self.skipped_parents.push(parent_id.to_string());
            return true;
        }
        if !skipped && present {
            self.skipped_parents.retain(|id| id != parent_id);
            return true;
        }
        false
    }

    pub fn clear(&mut self) {
        self.parents.clear();
        self.categories.clear();
        self.skipped_parents.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty() && self.categories.is_empty() && self.skipped_parents.is_empty()
    }

    /// Restores the invariants a hand-edited or older file may violate: keys
    /// match the ids they hold, and id lists carry no duplicates.
    pub fn normalize(&mut self) {
        for (key, entry) in self.parents.iter_mut() {
            entry.parent_id = key.clone();
            entry.child_ids = dedup_first_wins(entry.child_ids.drain(..));
        }
        for (key, entry) in self.categories.iter_mut() {
            entry.category_id = key.clone();
            entry.placeable_ids = dedup_first_wins(entry.placeable_ids.drain(..));
            entry.special_tags = dedup_first_wins(entry.special_tags.drain(..));
            entry.removed_placeable_ids = dedup_first_wins(entry.removed_placeable_ids.drain(..));
        }
        self.skipped_parents = dedup_first_wins(self.skipped_parents.drain(..));
    }

    /// Removes references to ids the catalog no longer has.
    ///
    /// Overrides of categories the catalog lost are dropped whole. Special
    /// tags inside surviving overrides are kept: an unconstructable tag is
    /// skipped at resolution and may become valid again when the providing
    /// content returns.
    pub fn prune_dangling(&mut self, catalog: &impl Catalog) -> PruneReport {
        let known: HashSet<&str> = catalog
            .categories()
            .iter()
            .map(|category| category.id.as_str())
            .collect();
        let mut report = PruneReport::default();

        let before = self.parents.len();
        self.parents
            .retain(|parent_id, _| !parent_id.is_empty() && known.contains(parent_id.as_str()));
        report.parents = before - self.parents.len();

        for entry in self.parents.values_mut() {
            let before = entry.child_ids.len();
            entry
                .child_ids
                .retain(|id| !id.is_empty() && known.contains(id.as_str()));
            report.child_ids += before - entry.child_ids.len();
        }

        let before = self.categories.len();
        self.categories
            .retain(|category_id, _| !category_id.is_empty() && known.contains(category_id.as_str()));
        report.categories = before - self.categories.len();

        for entry in self.categories.values_mut() {
            let before = entry.placeable_ids.len();
            entry
                .placeable_ids
                .retain(|id| !id.is_empty() && catalog.find_placeable(id).is_some());
            report.placeable_ids += before - entry.placeable_ids.len();

            let before = entry.removed_placeable_ids.len();
            entry
                .removed_placeable_ids
                .retain(|id| !id.is_empty() && catalog.find_placeable(id).is_some());
            report.removed_ids += before - entry.removed_placeable_ids.len();
        }

        let before = self.skipped_parents.len();
        self.skipped_parents
            .retain(|id| !id.is_empty() && known.contains(id.as_str()));
        report.skipped = before - self.skipped_parents.len();

        report
    }
}

/// Keeps the first occurrence of every id.
pub fn dedup_first_wins(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for id in ids {
        if seen.insert(id.clone()) {
            out.push(id);
        }
    }
    out
}

/// Moves `value` to `target`, clamped to the list bounds. No-op when absent.
pub fn move_to_index(list: &mut Vec<String>, value: &str, target: usize) {
    let Some(index) = list.iter().position(|entry| entry == value) else {
        return;
    };
    let target = target.min(list.len().saturating_sub(1));
    if index == target {
        return;
    }
    let entry = list.remove(index);
    list.insert(target, entry);
}

/// Swaps `value` with its neighbour `delta` steps away; out-of-range is a no-op.
pub fn move_by(list: &mut [String], value: &str, delta: i32) {
    let Some(index) = list.iter().position(|entry| entry == value) else {
        return;
    };
    let target = index as i64 + i64::from(delta);
    if target < 0 || target >= list.len() as i64 {
        return;
    }
    list.swap(index, target as usize);
}

fn default_schema_version() -> u32 {
    OVERRIDES_SCHEMA_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Category, StaticCatalog};

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn set_children_keeps_first_duplicate() {
        let mut entry = ParentOverride::new("Structure");
        entry.set_children(&ids(&["Walls", "Floors", "Walls"]), true);
        assert_eq!(entry.child_ids, ids(&["Walls", "Floors"]));
        assert!(entry.replace_default_children);
    }

    #[test]
    fn move_to_index_clamps_past_end() {
        let mut list = ids(&["a", "b", "c"]);
        move_to_index(&mut list, "a", 40);
        assert_eq!(list, ids(&["b", "c", "a"]));
    }

    #[test]
    fn move_by_ignores_out_of_range() {
        let mut list = ids(&["a", "b"]);
        move_by(&mut list, "a", -1);
        assert_eq!(list, ids(&["a", "b"]));
        move_by(&mut list, "a", 1);
        assert_eq!(list, ids(&["b", "a"]));
    }

    #[test]
    fn order_override_alone_counts_as_modification() {
        let mut entry = CategoryOverride::new("Walls");
        assert!(!entry.has_modifications());
        entry.has_order_override = true;
        assert!(entry.has_modifications());
    }

    #[test]
    fn prune_drops_overrides_of_lost_categories() {
        let catalog = StaticCatalog::new(vec![Category {
            id: "walls".to_string(),
            label: "Walls".to_string(),
            order: 0,
            parent: None,
            items: Vec::new(),
            special_tags: Vec::new(),
        }]);
        let mut set = OverrideSet::default();
        set.category_mut_or_insert("walls").has_order_override = true;
        let lost = set.category_mut_or_insert("vanished");
        lost.has_order_override = true;
        lost.special_tags.push("special.stairs".to_string());

        let report = set.prune_dangling(&catalog);
        assert_eq!(report.categories, 1);
        assert_eq!(report.total(), 1);
        assert!(set.category("walls").is_some());
        assert!(set.category("vanished").is_none());
    }
}
