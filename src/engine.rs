use crate::{
    cache::{CacheStats, Generation, Resolution, ResolvedRow, RowCache, RowNode},
    catalog::{Catalog, CatalogDigest, Category, Item, ItemKey, ItemKind},
    error::StoreError,
    hierarchy::DefaultHierarchy,
    overrides::{dedup_first_wins, move_by, move_to_index, CategoryOverride, OverrideSet},
    proxy::{ProxyTable, RuntimeChildOrder},
    resolve::{compare_labels, resolve_children, resolve_items},
    search::{SearchChoice, SearchIndex, SearchMode},
    store::OverrideStore,
};
use std::collections::BTreeSet;
use tracing::{debug, info, trace, warn};

/// Owns the catalog handle, the user's overrides and every derived cache.
///
/// All state is per instance; a host that shares an engine between threads
/// wraps it in a single mutex.
pub struct Engine<C, S> {
    catalog: C,
    store: S,
    overrides: OverrideSet,
    digest: CatalogDigest,
    generation: Generation,
    hierarchy: DefaultHierarchy,
    hierarchy_generation: Option<Generation>,
    rows: RowCache,
    proxies: ProxyTable,
    search: SearchIndex,
    search_generation: Option<Generation>,
}

impl<C: Catalog, S: OverrideStore> Engine<C, S> {
    /// Loads overrides from `store`, drops references the catalog no longer
    /// knows and builds the default hierarchy.
    pub fn initialize(catalog: C, mut store: S) -> Result<Self, StoreError> {
        let overrides = store.load()?;
        Ok(Self::with_overrides(catalog, store, overrides))
    }

    /// Starts from an already loaded override set without touching the store.
    pub fn with_overrides(catalog: C, store: S, mut overrides: OverrideSet) -> Self {
        overrides.normalize();
        let report = overrides.prune_dangling(&catalog);
        if report.total() > 0 {
            debug!(
                parents = report.parents,
                categories = report.categories,
                child_ids = report.child_ids,
                placeable_ids = report.placeable_ids,
                removed_ids = report.removed_ids,
                skipped = report.skipped,
                "dropped stale override references"
            );
        }
        let digest = CatalogDigest::of(&catalog);
        let mut engine = Self {
            catalog,
            store,
            overrides,
            digest,
            generation: Generation::default(),
            hierarchy: DefaultHierarchy::default(),
            hierarchy_generation: None,
            rows: RowCache::new(),
            proxies: ProxyTable::new(),
            search: SearchIndex::default(),
            search_generation: None,
        };
        engine.ensure_hierarchy();
        engine
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn overrides(&self) -> &OverrideSet {
        &self.overrides
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn catalog_digest(&self) -> &CatalogDigest {
        &self.digest
    }

    /// Drops every derived value. Called after any catalog or override change.
    pub fn invalidate_all(&mut self) {
        self.generation = self.generation.next();
        self.hierarchy_generation = None;
        self.search_generation = None;
        self.rows.clear();
        self.proxies.clear();
        debug!(generation = self.generation.value(), "caches invalidated");
    }

    /// Swaps in a new catalog. Returns whether its content differs from the
    /// previous one; only then are overrides pruned and caches dropped.
    pub fn replace_catalog(&mut self, catalog: C) -> bool {
        self.catalog = catalog;
        self.refresh_catalog()
    }

    /// Re-fingerprints the current catalog and invalidates when it changed.
    pub fn refresh_catalog(&mut self) -> bool {
        let digest = CatalogDigest::of(&self.catalog);
        if digest == self.digest {
            return false;
        }
        self.digest = digest;
        let report = self.overrides.prune_dangling(&self.catalog);
        info!(
            digest = self.digest.as_str(),
            pruned = report.total(),
            "catalog changed"
        );
        self.invalidate_all();
        true
    }

    pub fn default_hierarchy(&mut self) -> &DefaultHierarchy {
        self.ensure_hierarchy();
        &self.hierarchy
    }

    pub fn default_children_of(&mut self, parent_id: &str) -> Vec<String> {
        self.ensure_hierarchy();
        self.hierarchy.default_children(parent_id).to_vec()
    }

    pub fn children_of(&mut self, parent_id: &str) -> Vec<String> {
        self.ensure_hierarchy();
        resolve_children(
            self.hierarchy.default_children(parent_id),
            self.overrides.parent(parent_id),
        )
    }

    pub fn is_default_child(&mut self, parent_id: &str, child_id: &str) -> bool {
        self.ensure_hierarchy();
        self.hierarchy.is_default_child(parent_id, child_id)
    }

    pub fn effective_items(&self, category_id: &str, defaults: &[Item]) -> Vec<Item> {
        resolve_items(defaults, self.overrides.category(category_id), &self.catalog)
    }

    /// Effective items of a catalog category; a dangling id has no defaults.
    pub fn items_for(&self, category_id: &str) -> Vec<Item> {
        let defaults = self
            .catalog
            .category(category_id)
            .map(|category| category.items.as_slice())
            .unwrap_or(&[]);
        self.effective_items(category_id, defaults)
    }

    pub fn resolve(&mut self, parent_id: &str) -> Resolution {
        if let Some(cached) = self.rows.lookup(parent_id, self.generation) {
            trace!(parent = parent_id, "row cache hit");
            return cached;
        }
        debug!(
            parent = parent_id,
            generation = self.generation.value(),
            "resolving rows"
        );
        let resolution = self.compute_resolution(parent_id);
        self.rows
            .store(parent_id, self.generation, resolution.clone());
        resolution
    }

    pub fn is_resolution_cached(&self, parent_id: &str) -> bool {
        self.rows.is_cached(parent_id, self.generation)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.rows.stats()
    }

    /// Categories with at least one default child, minus the skip set, by
    /// ascending declared order then label.
    pub fn parents_list(&mut self) -> Vec<Category> {
        self.ensure_hierarchy();
        let mut parents: Vec<Category> = self
            .catalog
            .categories()
            .iter()
            .filter(|category| self.hierarchy.is_parent(&category.id))
            .filter(|category| !self.overrides.is_skipped(&category.id))
            .cloned()
            .collect();
        parents.sort_by(|a, b| {
            a.order
                .cmp(&b.order)
                .then_with(|| compare_labels(a.display_label(), b.display_label()))
        });
        parents
    }

    /// Categories without a default parent (the menu's tab strip), by
    /// ascending effective order then label. Order overrides apply here.
    pub fn top_level_categories(&mut self) -> Vec<Category> {
        self.ensure_hierarchy();
        let mut categories: Vec<Category> = self
            .catalog
            .categories()
            .iter()
            .filter(|category| !self.hierarchy.is_nested(&category.id))
            .cloned()
            .collect();
        let overrides = &self.overrides;
        let effective_order = |category: &Category| {
            overrides
                .category(&category.id)
                .map(|entry| entry.effective_order(category.order))
                .unwrap_or(category.order)
        };
        categories.sort_by(|a, b| {
            effective_order(a)
                .cmp(&effective_order(b))
                .then_with(|| compare_labels(a.display_label(), b.display_label()))
        });
        categories
    }

    /// Categories that currently have at least one child, by default or by override.
    pub fn parent_set(&mut self) -> BTreeSet<String> {
        self.ensure_hierarchy();
        let mut parents = self.hierarchy.parents().clone();
        let overridden: Vec<String> = self.overrides.parents.keys().cloned().collect();
        for parent_id in overridden {
            if self.catalog.category(&parent_id).is_some() && !self.children_of(&parent_id).is_empty() {
                parents.insert(parent_id);
            }
        }
        parents
    }

    /// Categories that may be added under `parent_id`, sorted by label.
    pub fn addable_children(&mut self, parent_id: &str) -> Vec<Category> {
        let current: BTreeSet<String> = self.children_of(parent_id).into_iter().collect();
        let parents = self.parent_set();
        let mut choices: Vec<Category> = self
            .catalog
            .categories()
            .iter()
            .filter(|category| category.id != parent_id)
            .filter(|category| !current.contains(&category.id))
            .filter(|category| !parents.contains(&category.id))
            .cloned()
            .collect();
        choices.sort_by(|a, b| compare_labels(a.display_label(), b.display_label()));
        choices
    }

    pub fn search_choices(&mut self, mode: SearchMode, query: &str) -> Vec<SearchChoice> {
        if self.search_generation != Some(self.generation) {
            debug!("rebuilding search choices");
            self.search = SearchIndex::build(&self.catalog, &self.overrides);
            self.search_generation = Some(self.generation);
        }
        self.search.filter(mode, query)
    }

    pub fn is_parent_skipped(&self, parent_id: &str) -> bool {
        self.overrides.is_skipped(parent_id)
    }

    pub fn set_children(
        &mut self,
        parent_id: &str,
        child_ids: &[String],
        replace: bool,
    ) -> Result<(), StoreError> {
        let ids: Vec<String> = child_ids
            .iter()
            .filter(|id| !id.is_empty() && id.as_str() != parent_id)
            .cloned()
            .collect();
        self.overrides
            .parent_mut_or_insert(parent_id)
            .set_children(&ids, replace);
        self.commit("set children")
    }

    pub fn add_child(&mut self, parent_id: &str, child_id: &str) -> Result<(), StoreError> {
        if child_id.is_empty() || child_id == parent_id {
            return Ok(());
        }
        let mut children = self.children_of(parent_id);
        if children.iter().any(|id| id == child_id) {
            return Ok(());
        }
        children.push(child_id.to_string());
        self.set_children(parent_id, &children, true)
    }

    pub fn remove_child(&mut self, parent_id: &str, child_id: &str) -> Result<(), StoreError> {
        let mut children = self.children_of(parent_id);
        let before = children.len();
        children.retain(|id| id != child_id);
        if children.len() == before {
            return Ok(());
        }
        self.set_children(parent_id, &children, true)
    }

    pub fn move_child_to_index(
        &mut self,
        parent_id: &str,
        child_id: &str,
        index: usize,
    ) -> Result<(), StoreError> {
        if child_id.is_empty() || child_id == parent_id {
            return Ok(());
        }
        let mut children = self.children_of(parent_id);
        if !children.iter().any(|id| id == child_id) {
            children.push(child_id.to_string());
        }
        move_to_index(&mut children, child_id, index);
        self.set_children(parent_id, &children, true)
    }

    pub fn reset_children(&mut self, parent_id: &str) -> Result<(), StoreError> {
        self.set_children(parent_id, &[], false)
    }

    /// Appends an item after everything of its kind currently displayed.
    pub fn add_item(&mut self, category_id: &str, key: &ItemKey) -> Result<(), StoreError> {
        let displayed = self.items_for(category_id);
        let entry = self.overrides.category_mut_or_insert(category_id);
        match key {
            ItemKey::Placeable(_) => {
                seed_ordering(entry, key, &displayed);
            }
            ItemKey::Special(tag) => {
                seed_listed(&mut entry.special_tags, &displayed, ItemKind::Special);
                push_unique(&mut entry.special_tags, tag);
            }
        }
        self.commit("add item")
    }

    pub fn remove_item(&mut self, category_id: &str, key: &ItemKey) -> Result<(), StoreError> {
        let displayed = self.items_for(category_id);
        let entry = self.overrides.category_mut_or_insert(category_id);
        match key {
            ItemKey::Placeable(id) => {
                if !entry.replace_default_placeables {
                    entry.mark_removed(id);
                }
                entry.placeable_ids.retain(|listed| listed != id);
            }
            ItemKey::Special(tag) => {
                seed_special_tags(entry, &displayed);
                entry.special_tags.retain(|listed| listed != tag);
            }
        }
        self.overrides.drop_if_unmodified(category_id);
        self.commit("remove item")
    }

    /// Swaps an item with its neighbour `delta` places away within its kind.
    pub fn move_item(&mut self, category_id: &str, key: &ItemKey, delta: i32) -> Result<(), StoreError> {
        let displayed = self.items_for(category_id);
        let entry = self.overrides.category_mut_or_insert(category_id);
        let list = seed_ordering(entry, key, &displayed);
        move_by(list, key.ident(), delta);
        self.commit("move item")
    }

    /// Moves an item to `index` among items of its own kind, clamped to bounds.
    pub fn move_item_to_index(
        &mut self,
        category_id: &str,
        key: &ItemKey,
        index: usize,
    ) -> Result<(), StoreError> {
        let displayed = self.items_for(category_id);
        let entry = self.overrides.category_mut_or_insert(category_id);
        let list = seed_ordering(entry, key, &displayed);
        move_to_index(list, key.ident(), index);
        self.commit("move item to index")
    }

    pub fn reset_items(&mut self, category_id: &str) -> Result<(), StoreError> {
        if let Some(entry) = self.overrides.categories.get_mut(category_id) {
            entry.reset_items();
        }
        self.overrides.drop_if_unmodified(category_id);
        self.commit("reset items")
    }

    pub fn set_category_order(&mut self, category_id: &str, order: Option<i32>) -> Result<(), StoreError> {
        let entry = self.overrides.category_mut_or_insert(category_id);
        entry.has_order_override = order.is_some();
        entry.order_override = order.unwrap_or_default();
        self.overrides.drop_if_unmodified(category_id);
        self.commit("set category order")
    }

    pub fn set_parent_skipped(&mut self, parent_id: &str, skipped: bool) -> Result<(), StoreError> {
        self.overrides.set_skipped(parent_id, skipped);
        self.commit("set parent visibility")
    }

    pub fn reset_all(&mut self) -> Result<(), StoreError> {
        self.overrides.clear();
        self.commit("reset all")
    }

    fn commit(&mut self, action: &str) -> Result<(), StoreError> {
        self.invalidate_all();
        match self.store.save(&self.overrides) {
            Ok(()) => {
                info!(action, "overrides saved");
                Ok(())
            }
            Err(err) => {
                warn!(action, error = %err, "failed to save overrides");
                Err(err)
            }
        }
    }

    fn ensure_hierarchy(&mut self) {
        if self.hierarchy_generation == Some(self.generation) {
            return;
        }
        self.hierarchy = DefaultHierarchy::build(self.catalog.categories());
        self.hierarchy_generation = Some(self.generation);
        self.proxies.clear();
        debug!(
            parents = self.hierarchy.parents().len(),
            generation = self.generation.value(),
            "default hierarchy rebuilt"
        );
    }

    fn compute_resolution(&mut self, parent_id: &str) -> Resolution {
        self.ensure_hierarchy();
        let defaults = self.hierarchy.default_children(parent_id).to_vec();
        let parent_override = self.overrides.parent(parent_id);
        let children = resolve_children(&defaults, parent_override);
        let order = RuntimeChildOrder::from_children(&children);

        let mut visible_children = BTreeSet::new();
        let mut rows = Vec::new();

        if parent_override.is_none() {
            for child_id in defaults.iter().filter(|id| id.as_str() != parent_id) {
                let Some(category) = self.catalog.category(child_id) else {
                    continue;
                };
                if self.overrides.is_modified(child_id) {
                    visible_children.insert(child_id.clone());
                }
                rows.push(ResolvedRow {
                    node: RowNode::Category(category.clone()),
                    is_primary: false,
                    items: resolve_items(&category.items, self.overrides.category(child_id), &self.catalog),
                });
            }
        } else {
            let mut shown: Vec<String> = children
                .iter()
                .filter(|id| id.as_str() != parent_id)
                .cloned()
                .collect();
            // Customized default children stay visible even when no longer listed.
            for child_id in &defaults {
                if !children.contains(child_id) && self.overrides.is_modified(child_id) {
                    shown.push(child_id.clone());
                }
            }

            for (index, child_id) in shown.iter().enumerate() {
                let Some(category) = self.catalog.category(child_id) else {
                    continue;
                };
                if !defaults.contains(child_id) || self.overrides.is_modified(child_id) {
                    visible_children.insert(child_id.clone());
                }
                let node = self
                    .proxies
                    .proxy_for(parent_id, child_id, index, &order, &self.catalog);
                rows.push(ResolvedRow {
                    node: RowNode::Proxy(node),
                    is_primary: false,
                    items: resolve_items(&category.items, self.overrides.category(child_id), &self.catalog),
                });
            }
        }

        if let Some(parent) = self.catalog.category(parent_id) {
            rows.push(ResolvedRow {
                node: RowNode::Category(parent.clone()),
                is_primary: true,
                items: resolve_items(&parent.items, self.overrides.category(parent_id), &self.catalog),
            });
        }

        Resolution {
            rows,
            visible_children,
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|entry| entry == value) {
        list.push(value.to_string());
    }
}

/// Switches specials to replace mode on first touch, seeding the tag list from
/// the displayed specials followed by tags already listed.
fn seed_special_tags(entry: &mut CategoryOverride, displayed: &[Item]) {
    if entry.replace_default_specials {
        return;
    }
    entry.replace_default_specials = true;
    seed_listed(&mut entry.special_tags, displayed, ItemKind::Special);
}

/// Puts the displayed items of `kind` ahead of the ids already listed.
fn seed_listed(list: &mut Vec<String>, displayed: &[Item], kind: ItemKind) {
    let shown = displayed
        .iter()
        .filter(|item| item.kind() == kind)
        .map(|item| item.ident().to_string());
    let seeded = dedup_first_wins(shown.chain(list.drain(..)));
    *list = seeded;
}

/// Prepares the ordering list `key` lives in so a move keeps earlier edits.
fn seed_ordering<'a>(entry: &'a mut CategoryOverride, key: &ItemKey, displayed: &[Item]) -> &'a mut Vec<String> {
    match key {
        ItemKey::Placeable(id) => {
            seed_listed(&mut entry.placeable_ids, displayed, ItemKind::Placeable);
            push_unique(&mut entry.placeable_ids, id);
            entry.unmark_removed(id);
            &mut entry.placeable_ids
        }
        ItemKey::Special(tag) => {
            seed_special_tags(entry, displayed);
            push_unique(&mut entry.special_tags, tag);
            &mut entry.special_tags
        }
    }
}
