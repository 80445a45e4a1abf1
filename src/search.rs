use crate::{
    catalog::{short_tag_label, Catalog},
    overrides::OverrideSet,
    resolve::compare_labels,
};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Buildable,
    Special,
}

impl SearchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "buildable" | "placeable" => Some(SearchMode::Buildable),
            "special" => Some(SearchMode::Special),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchChoice {
    pub key: String,
    pub label: String,
    pub secondary: String,
    #[serde(skip)]
    search_text: String,
}

impl SearchChoice {
    fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            secondary: key.to_string(),
            search_text: format!("{label} {key}").to_lowercase(),
        }
    }

    pub fn matches(&self, query: &str) -> bool {
        let needle = normalize_query(query);
        needle.is_empty() || self.search_text.contains(&needle)
    }
}

/// Choices offered when adding an item to a category.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    buildables: Vec<SearchChoice>,
    specials: Vec<SearchChoice>,
}

impl SearchIndex {
    pub fn build(catalog: &impl Catalog, overrides: &OverrideSet) -> Self {
        let mut buildables: Vec<SearchChoice> = catalog
            .buildable_placeables()
            .into_iter()
            .map(|def| {
                let label = if def.label.trim().is_empty() {
                    def.id.clone()
                } else {
                    def.label.clone()
                };
                SearchChoice::new(&def.id, &label)
            })
            .collect();

        let mut tags: BTreeSet<String> = catalog.special_tags().into_iter().collect();
        for category in catalog.categories() {
            tags.extend(category.special_tags.iter().cloned());
            tags.extend(
                category
                    .items
                    .iter()
                    .filter(|item| !item.is_placeable())
                    .map(|item| item.ident().to_string()),
            );
        }
        for entry in overrides.categories.values() {
            tags.extend(entry.special_tags.iter().cloned());
        }
        tags.retain(|tag| !tag.is_empty());

        let mut specials: Vec<SearchChoice> = tags
            .iter()
            .map(|tag| {
                let label = catalog
                    .instantiate_special(tag)
                    .map(|item| item.label().to_string())
                    .filter(|label| !label.trim().is_empty())
                    .unwrap_or_else(|| short_tag_label(tag).to_string());
                SearchChoice::new(tag, &label)
            })
            .collect();

        sort_choices(&mut buildables);
        sort_choices(&mut specials);
        Self {
            buildables,
            specials,
        }
    }

    pub fn choices(&self, mode: SearchMode) -> &[SearchChoice] {
        match mode {
            SearchMode::Buildable => &self.buildables,
            SearchMode::Special => &self.specials,
        }
    }

    pub fn filter(&self, mode: SearchMode, query: &str) -> Vec<SearchChoice> {
        self.choices(mode)
            .iter()
            .filter(|choice| choice.matches(query))
            .cloned()
            .collect()
    }
}

fn sort_choices(choices: &mut [SearchChoice]) {
    choices.sort_by(|a, b| {
        compare_labels(&a.label, &b.label).then_with(|| compare_labels(&a.secondary, &b.secondary))
    });
}

fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}
