//! Merges the catalog's defaults with the user's overrides.
//!
//! Both resolvers are pure: the output depends only on the arguments, and every
//! call returns freshly owned lists.

use crate::{
    catalog::{Catalog, Item, ItemKey},
    overrides::{CategoryOverride, ParentOverride},
};
use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet, VecDeque},
};

/// Effective ordered child ids of one parent.
pub fn resolve_children(defaults: &[String], parent_override: Option<&ParentOverride>) -> Vec<String> {
    let Some(entry) = parent_override else {
        return defaults.to_vec();
    };
    if entry.replace_default_children {
        return entry.child_ids.clone();
    }

    let mut children = defaults.to_vec();
    let mut present: HashSet<String> = children.iter().cloned().collect();
    for id in &entry.child_ids {
        if present.insert(id.clone()) {
            children.push(id.clone());
        }
    }
    children
}

/// Effective ordered item list of one category.
///
/// Placeables and specials are reordered within their own kind, then poured
/// back into the slot pattern of `defaults`; anything left over is appended,
/// placeables before specials.
pub fn resolve_items(
    defaults: &[Item],
    entry: Option<&CategoryOverride>,
    catalog: &impl Catalog,
) -> Vec<Item> {
    let Some(entry) = entry else {
        return defaults.to_vec();
    };

    let (default_placeables, default_specials): (Vec<Item>, Vec<Item>) =
        defaults.iter().cloned().partition(Item::is_placeable);

    let mut placeables = if entry.replace_default_placeables {
        Vec::new()
    } else {
        default_placeables.clone()
    };
    let specials = if entry.replace_default_specials {
        Vec::new()
    } else {
        default_specials.clone()
    };

    if !entry.removed_placeable_ids.is_empty() {
        let removed: HashSet<&str> = entry
            .removed_placeable_ids
            .iter()
            .map(String::as_str)
            .collect();
        placeables.retain(|item| !removed.contains(item.ident()));
    }

    let placeables = if entry.placeable_ids.is_empty() {
        placeables
    } else {
        apply_listed_order(placeables, &default_placeables, &entry.placeable_ids, |id| {
            catalog.find_placeable(id)
        })
    };

    let specials = if entry.special_tags.is_empty() {
        specials
    } else {
        apply_listed_order(specials, &default_specials, &entry.special_tags, |tag| {
            catalog.instantiate_special(tag)
        })
    };

    interleave(defaults, placeables, specials)
}

/// Adds every listed id missing from `current` (reusing an existing item,
/// then a default one, then a freshly created one) and sorts by list position.
/// A list where nothing resolves leaves `current` untouched.
fn apply_listed_order<F>(
    mut current: Vec<Item>,
    defaults: &[Item],
    listed: &[String],
    create: F,
) -> Vec<Item>
where
    F: Fn(&str) -> Option<Item>,
{
    let mut lookup: HashMap<String, Item> = HashMap::new();
    for item in current.iter().chain(defaults.iter()) {
        lookup
            .entry(item.ident().to_string())
            .or_insert_with(|| item.clone());
    }
    let mut present: HashSet<ItemKey> = current.iter().map(Item::key).collect();
    let mut resolved_any = false;

    for id in listed {
        let item = match lookup.get(id) {
            Some(item) => item.clone(),
            None => {
                let Some(created) = create(id) else {
                    continue;
                };
                // A factory answering with a different identity is treated as unconstructable.
                if created.ident() != id {
                    continue;
                }
                lookup.insert(id.clone(), created.clone());
                created
            }
        };
        resolved_any = true;
        if present.insert(item.key()) {
            current.push(item);
        }
    }
    if !resolved_any {
        return current;
    }

    let mut rank: HashMap<&str, usize> = HashMap::new();
    for (index, id) in listed.iter().enumerate() {
        rank.entry(id.as_str()).or_insert(index);
    }
    current.sort_by(|a, b| {
        let rank_a = rank.get(a.ident()).copied().unwrap_or(usize::MAX);
        let rank_b = rank.get(b.ident()).copied().unwrap_or(usize::MAX);
        rank_a
            .cmp(&rank_b)
            .then_with(|| compare_labels(a.label(), b.label()))
    });
    current
}

fn interleave(defaults: &[Item], placeables: Vec<Item>, specials: Vec<Item>) -> Vec<Item> {
    let mut result = Vec::with_capacity(placeables.len() + specials.len());
    let mut placeables = VecDeque::from(placeables);
    let mut specials = VecDeque::from(specials);

    for slot in defaults {
        let queue = if slot.is_placeable() {
            &mut placeables
        } else {
            &mut specials
        };
        if let Some(item) = queue.pop_front() {
            result.push(item);
        }
    }

    result.extend(placeables);
    result.extend(specials);
    result
}

/// Case-insensitive label comparison used for every label tie-break.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;

    #[test]
    fn interleave_keeps_special_slots() {
        let defaults = vec![
            Item::placeable("b1", "B1"),
            Item::special("s1", "S1"),
            Item::placeable("b2", "B2"),
        ];
        let placeables = vec![Item::placeable("b2", "B2"), Item::placeable("b1", "B1")];
        let specials = vec![Item::special("s1", "S1")];
        let merged = interleave(&defaults, placeables, specials);
        let idents: Vec<&str> = merged.iter().map(Item::ident).collect();
        assert_eq!(idents, vec!["b2", "s1", "b1"]);
    }

    #[test]
    fn interleave_skips_slots_of_an_exhausted_kind() {
        let defaults = vec![Item::special("s1", "S1"), Item::placeable("b1", "B1")];
        let merged = interleave(&defaults, vec![Item::placeable("b1", "B1")], Vec::new());
        assert_eq!(merged, vec![Item::placeable("b1", "B1")]);
    }

    #[test]
    fn unresolvable_list_keeps_current_order() {
        let defaults = vec![Item::placeable("b2", "Zeta"), Item::placeable("b1", "Alpha")];
        let listed = vec!["ghost".to_string(), "phantom".to_string()];
        let ordered = apply_listed_order(defaults.clone(), &defaults, &listed, |_| None);
        assert_eq!(ordered, defaults);
    }

    #[test]
    fn no_override_returns_defaults() {
        let defaults = vec![Item::placeable("b1", "B1")];
        let resolved = resolve_items(&defaults, None, &StaticCatalog::default());
        assert_eq!(resolved, defaults);
    }
}
