use crate::{catalog::Category, catalog::Item, proxy::ProxyNode};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// Bumped on every catalog or override change; cached values remember the
/// generation they were computed at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// A value tagged with the generation it was derived from.
#[derive(Debug, Clone)]
pub struct Stamped<T> {
    generation: Generation,
    value: T,
}

impl<T> Stamped<T> {
    pub fn new(generation: Generation, value: T) -> Self {
        Self { generation, value }
    }

    pub fn get(&self, current: Generation) -> Option<&T> {
        (self.generation == current).then_some(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RowNode {
    Category(Category),
    Proxy(ProxyNode),
}

impl RowNode {
    pub fn category_id(&self) -> &str {
        match self {
            RowNode::Category(category) => &category.id,
            RowNode::Proxy(proxy) => &proxy.category_id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RowNode::Category(category) => category.display_label(),
            RowNode::Proxy(proxy) => &proxy.label,
        }
    }

    pub fn sort_order(&self) -> i32 {
        match self {
            RowNode::Category(category) => category.order,
            RowNode::Proxy(proxy) => proxy.sort_order,
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, RowNode::Proxy(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRow {
    pub node: RowNode,
    pub is_primary: bool,
    pub items: Vec<Item>,
}

/// Rows shown for one parent plus the children surfaced by customization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub rows: Vec<ResolvedRow>,
    pub visible_children: BTreeSet<String>,
}

impl Resolution {
    pub fn row_ids(&self) -> Vec<&str> {
        self.rows.iter().map(|row| row.node.category_id()).collect()
    }

    pub fn is_child_visible(&self, category_id: &str) -> bool {
        self.visible_children.contains(category_id)
    }
}

/// Memoized resolutions keyed by parent id.
#[derive(Debug, Default)]
pub struct RowCache {
    entries: HashMap<String, Stamped<Resolution>>,
    hits: u64,
    misses: u64,
}

impl RowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&mut self, parent_id: &str, current: Generation) -> Option<Resolution> {
        let found = self
            .entries
            .get(parent_id)
            .and_then(|entry| entry.get(current))
            .cloned();
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    pub fn store(&mut self, parent_id: &str, generation: Generation, resolution: Resolution) {
        self.entries
            .insert(parent_id.to_string(), Stamped::new(generation, resolution));
    }

    pub fn is_cached(&self, parent_id: &str, current: Generation) -> bool {
        self.entries
            .get(parent_id)
            .is_some_and(|entry| entry.get(current).is_some())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}
