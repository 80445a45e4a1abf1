use crate::error::CatalogError;
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, fs, path::Path};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Placeable { id: String, label: String },
    Special { tag: String, label: String },
}

impl Item {
    pub fn placeable(id: &str, label: &str) -> Self {
        Item::Placeable {
            id: id.to_string(),
            label: label.to_string(),
        }
    }

    pub fn special(tag: &str, label: &str) -> Self {
        Item::Special {
            tag: tag.to_string(),
            label: label.to_string(),
        }
    }

    pub fn key(&self) -> ItemKey {
        match self {
            Item::Placeable { id, .. } => ItemKey::Placeable(id.clone()),
            Item::Special { tag, .. } => ItemKey::Special(tag.clone()),
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Item::Placeable { .. } => ItemKind::Placeable,
            Item::Special { .. } => ItemKind::Special,
        }
    }

    pub fn is_placeable(&self) -> bool {
        matches!(self, Item::Placeable { .. })
    }

    /// Item id for placeables, type tag for specials.
    pub fn ident(&self) -> &str {
        match self {
            Item::Placeable { id, .. } => id,
            Item::Special { tag, .. } => tag,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Item::Placeable { label, .. } | Item::Special { label, .. } => label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Placeable,
    Special,
}

impl ItemKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "placeable" | "buildable" => Some(ItemKind::Placeable),
            "special" => Some(ItemKind::Special),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Placeable => "placeable",
            ItemKind::Special => "special",
        }
    }
}

/// Merge identity of an item: its kind plus the item id or type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    Placeable(String),
    Special(String),
}

impl ItemKey {
    pub fn new(kind: ItemKind, ident: &str) -> Self {
        match kind {
            ItemKind::Placeable => ItemKey::Placeable(ident.to_string()),
            ItemKind::Special => ItemKey::Special(ident.to_string()),
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemKey::Placeable(_) => ItemKind::Placeable,
            ItemKey::Special(_) => ItemKind::Special,
        }
    }

    pub fn ident(&self) -> &str {
        match self {
            ItemKey::Placeable(value) | ItemKey::Special(value) => value,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.ident())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub items: Vec<Item>,
    /// Declared special capability set, copied onto proxies.
    #[serde(default)]
    pub special_tags: Vec<String>,
}

impl Category {
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceableDef {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_true")]
    pub buildable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialDef {
    pub tag: String,
    #[serde(default)]
    pub label: String,
}

/// Read-only view of the base dataset the engine personalizes.
pub trait Catalog {
    fn categories(&self) -> &[Category];

    fn category(&self, id: &str) -> Option<&Category> {
        self.categories().iter().find(|category| category.id == id)
    }

    /// Every placeable definition, buildable or not.
    fn placeable_defs(&self) -> Vec<PlaceableDef>;

    /// Placeables the user may add to a category through search.
    fn buildable_placeables(&self) -> Vec<PlaceableDef> {
        self.placeable_defs()
            .into_iter()
            .filter(|def| def.buildable)
            .collect()
    }

    fn find_placeable(&self, id: &str) -> Option<Item>;

    /// Builds a fresh special item from its type tag, `None` when the tag
    /// names nothing constructible.
    fn instantiate_special(&self, tag: &str) -> Option<Item>;

    fn special_tags(&self) -> Vec<String>;
}

type SpecialCtor = Box<dyn Fn() -> Option<Item> + Send + Sync>;

/// Tag to constructor map for special items.
#[derive(Default)]
pub struct SpecialRegistry {
    ctors: BTreeMap<String, SpecialCtor>,
}

impl SpecialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, tag: &str, ctor: F)
    where
        F: Fn() -> Option<Item> + Send + Sync + 'static,
    {
        self.ctors.insert(tag.to_string(), Box::new(ctor));
    }

    pub fn register_labeled(&mut self, tag: &str, label: &str) {
        let item = Item::special(tag, label);
        self.register(tag, move || Some(item.clone()));
    }

    pub fn instantiate(&self, tag: &str) -> Option<Item> {
        let ctor = self.ctors.get(tag)?;
        match ctor() {
            Some(item) if item.kind() == ItemKind::Special && item.ident() == tag => Some(item),
            _ => None,
        }
    }

    pub fn tags(&self) -> Vec<String> {
        self.ctors.keys().cloned().collect()
    }
}

impl fmt::Debug for SpecialRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecialRegistry")
            .field("tags", &self.ctors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub placeables: Vec<PlaceableDef>,
    #[serde(default)]
    pub specials: Vec<SpecialDef>,
}

/// In-memory catalog, usually loaded from a JSON document.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    categories: Vec<Category>,
    placeables: BTreeMap<String, PlaceableDef>,
    specials: SpecialRegistry,
}

impl StaticCatalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            categories,
            ..Self::default()
        }
    }

    pub fn from_document(document: CatalogDocument) -> Self {
        let mut catalog = StaticCatalog::new(document.categories);
        for def in document.placeables {
            catalog.add_placeable(def);
        }
        for def in document.specials {
            let label = if def.label.is_empty() {
                short_tag_label(&def.tag).to_string()
            } else {
                def.label
            };
            catalog.specials.register_labeled(&def.tag, &label);
        }
        catalog
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let document: CatalogDocument =
            serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_document(document))
    }

    pub fn add_placeable(&mut self, def: PlaceableDef) {
        self.placeables.insert(def.id.clone(), def);
    }

    pub fn specials_mut(&mut self) -> &mut SpecialRegistry {
        &mut self.specials
    }

    pub fn push_category(&mut self, category: Category) {
        self.categories.push(category);
    }
}

impl Catalog for StaticCatalog {
    fn categories(&self) -> &[Category] {
        &self.categories
    }

    fn placeable_defs(&self) -> Vec<PlaceableDef> {
        self.placeables.values().cloned().collect()
    }

    fn find_placeable(&self, id: &str) -> Option<Item> {
        if let Some(def) = self.placeables.get(id) {
            let label = if def.label.is_empty() { &def.id } else { &def.label };
            return Some(Item::placeable(&def.id, label));
        }
        // Placeables already listed in some category count as known.
        self.categories
            .iter()
            .flat_map(|category| category.items.iter())
            .find(|item| item.is_placeable() && item.ident() == id)
            .cloned()
    }

    fn instantiate_special(&self, tag: &str) -> Option<Item> {
        self.specials.instantiate(tag)
    }

    fn special_tags(&self) -> Vec<String> {
        self.specials.tags()
    }
}

/// Fingerprint of everything in a catalog that resolution depends on: the
/// category records with their items, every placeable definition, and the
/// label each special tag instantiates with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogDigest(String);

impl CatalogDigest {
    pub fn of(catalog: &impl Catalog) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(b"catalog-v2");
        for category in catalog.categories() {
            hash_field(&mut hasher, &category.id);
            hash_field(&mut hasher, &category.label);
            hasher.update(&category.order.to_le_bytes());
            hash_field(&mut hasher, category.parent.as_deref().unwrap_or(""));
            hasher.update(&(category.items.len() as u64).to_le_bytes());
            for item in &category.items {
                let tag = match item.kind() {
                    ItemKind::Placeable => 1u8,
                    ItemKind::Special => 2u8,
                };
                hasher.update(&[tag]);
                hash_field(&mut hasher, item.ident());
                hash_field(&mut hasher, item.label());
            }
            hasher.update(&(category.special_tags.len() as u64).to_le_bytes());
            for tag in &category.special_tags {
                hash_field(&mut hasher, tag);
            }
        }

        let mut placeables = catalog.placeable_defs();
        placeables.sort_by(|a, b| a.id.cmp(&b.id));
        hasher.update(&(placeables.len() as u64).to_le_bytes());
        for def in placeables {
            hash_field(&mut hasher, &def.id);
            hash_field(&mut hasher, &def.label);
            hasher.update(&[u8::from(def.buildable)]);
        }

        let mut tags = catalog.special_tags();
        tags.sort();
        hasher.update(&(tags.len() as u64).to_le_bytes());
        for tag in tags {
            hash_field(&mut hasher, &tag);
            match catalog.instantiate_special(&tag) {
                Some(item) => {
                    hasher.update(&[1]);
                    hash_field(&mut hasher, item.label());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
        CatalogDigest(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn hash_field(hasher: &mut Hasher, value: &str) {
    hasher.update(value.as_bytes());
    hasher.update(&[0]);
}

/// Last `.`-separated segment of a tag, used when no label is declared.
pub fn short_tag_label(tag: &str) -> &str {
    tag.rsplit('.').next().unwrap_or(tag)
}

fn default_true() -> bool {
    true
}
