//! Personalized category hierarchy for game build menus.
//!
//! A fixed catalog of categories and items is merged with a small set of user
//! overrides (child assignments, item edits, hidden parents) into the
//! effective two-level tree shown to the player. [`Engine`] owns the merge and
//! every cache derived from it.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod overrides;
pub mod proxy;
pub mod resolve;
pub mod search;
pub mod store;

pub use cache::{Generation, Resolution, ResolvedRow, RowNode};
pub use catalog::{Catalog, Category, Item, ItemKey, ItemKind, StaticCatalog};
pub use engine::Engine;
pub use error::{CatalogError, StoreError};
pub use overrides::{CategoryOverride, OverrideSet, ParentOverride};
pub use proxy::ProxyNode;
pub use store::{JsonFileStore, MemoryStore, OverrideStore};
