use crate::catalog::Catalog;
use serde::Serialize;
use std::collections::HashMap;

/// Proxies sort below this value so "always first" categories stay on top.
pub const PROXY_ORDER_BASE: i32 = 100_000;

/// Stand-in for a category shown under a parent other than its default one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyNode {
    pub parent_id: String,
    pub category_id: String,
    pub label: String,
    pub sort_order: i32,
    pub special_tags: Vec<String>,
}

/// Position of each child within one parent's resolved child list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeChildOrder {
    positions: HashMap<String, usize>,
}

impl RuntimeChildOrder {
    pub fn from_children(children: &[String]) -> Self {
        let mut positions = HashMap::new();
        for (index, id) in children.iter().enumerate() {
            positions.entry(id.clone()).or_insert(index);
        }
        Self { positions }
    }

    pub fn position(&self, child_id: &str) -> Option<usize> {
        self.positions.get(child_id).copied()
    }
}

#[derive(Debug, Default)]
pub struct ProxyTable {
    proxies: HashMap<(String, String), ProxyNode>,
}

impl ProxyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized proxy for `(parent_id, category_id)`, refreshed
    /// from the catalog and the current child order.
    pub fn proxy_for(
        &mut self,
        parent_id: &str,
        category_id: &str,
        fallback_index: usize,
        order: &RuntimeChildOrder,
        catalog: &impl Catalog,
    ) -> ProxyNode {
        let proxy = self
            .proxies
            .entry((parent_id.to_string(), category_id.to_string()))
            .or_insert_with(|| ProxyNode {
                parent_id: parent_id.to_string(),
                category_id: category_id.to_string(),
                label: String::new(),
                sort_order: 0,
                special_tags: Vec::new(),
            });

        let source = catalog.category(category_id);
        let index = order.position(category_id).unwrap_or(fallback_index);
        let index = i32::try_from(index).unwrap_or(i32::MAX);
        proxy.label = source
            .map(|category| category.display_label().to_string())
            .unwrap_or_else(|| category_id.to_string());
        proxy.sort_order = PROXY_ORDER_BASE.saturating_sub(index);
        proxy.special_tags = source
            .map(|category| category.special_tags.clone())
            .unwrap_or_default();

        proxy.clone()
    }

    pub fn clear(&mut self) {
        self.proxies.clear();
    }
}
