use crate::catalog::Category;
use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap, HashSet},
};

/// Parent/child relation declared by the catalog itself, before any override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefaultHierarchy {
    children: HashMap<String, Vec<String>>,
    parent_of: HashMap<String, String>,
    parents: BTreeSet<String>,
}

impl DefaultHierarchy {
    pub fn build(categories: &[Category]) -> Self {
        let mut children: HashMap<String, Vec<String>> = categories
            .iter()
            .map(|category| (category.id.clone(), Vec::new()))
            .collect();
        let mut parent_of = HashMap::new();
        let known: HashSet<&str> = categories
            .iter()
            .map(|category| category.id.as_str())
            .collect();

        for category in categories {
            let Some(parent_id) = category.parent.as_deref() else {
                continue;
            };
            if parent_id.is_empty() || parent_id == category.id {
                continue;
            }
            let list = children.entry(parent_id.to_string()).or_default();
            if !list.iter().any(|id| *id == category.id) {
                list.push(category.id.clone());
            }
            // A parent missing from the catalog leaves the child at top level.
            if known.contains(parent_id) {
                parent_of
                    .entry(category.id.clone())
                    .or_insert_with(|| parent_id.to_string());
            }
        }

        let by_id: HashMap<&str, &Category> = categories
            .iter()
            .map(|category| (category.id.as_str(), category))
            .collect();
        for list in children.values_mut() {
            list.sort_by(|a, b| compare_default_children(by_id.get(a.as_str()), by_id.get(b.as_str())));
        }

        let parents = children
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(id, _)| id.clone())
            .collect();

        Self {
            children,
            parent_of,
            parents,
        }
    }

    pub fn default_children(&self, parent_id: &str) -> &[String] {
        self.children
            .get(parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_default_child(&self, parent_id: &str, child_id: &str) -> bool {
        self.default_children(parent_id)
            .iter()
            .any(|id| id == child_id)
    }

    pub fn is_parent(&self, id: &str) -> bool {
        self.parents.contains(id)
    }

    pub fn parents(&self) -> &BTreeSet<String> {
        &self.parents
    }

    pub fn default_parent_of(&self, child_id: &str) -> Option<&str> {
        self.parent_of.get(child_id).map(String::as_str)
    }

    pub fn is_nested(&self, id: &str) -> bool {
        self.parent_of.contains_key(id)
    }
}

/// Higher declared order first, then label A-Z ignoring case.
fn compare_default_children(a: Option<&&Category>, b: Option<&&Category>) -> Ordering {
    let order_a = a.map(|category| category.order).unwrap_or(i32::MIN);
    let order_b = b.map(|category| category.order).unwrap_or(i32::MIN);
    let order = order_b.cmp(&order_a);
    if order != Ordering::Equal {
        return order;
    }
    let label_a = a.map(|category| category.label.to_lowercase()).unwrap_or_default();
    let label_b = b.map(|category| category.label.to_lowercase()).unwrap_or_default();
    label_a.cmp(&label_b)
}
