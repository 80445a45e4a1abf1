#![allow(dead_code)]

use menusmith::{
    catalog::CatalogDocument, Engine, MemoryStore, OverrideSet, StaticCatalog,
};
use serde_json::json;

pub const STAIRS: &str = "special.stairs";
pub const LADDER: &str = "special.ladder";

pub fn fixture_document() -> CatalogDocument {
    serde_json::from_value(json!({
        "categories": [
            {
                "id": "structure",
                "label": "Structure",
                "order": 10,
                "items": [
                    { "kind": "placeable", "id": "foundation", "label": "Foundation" }
                ]
            },
            {
                "id": "floors",
                "label": "Floors",
                "order": 5,
                "parent": "structure",
                "items": [
                    { "kind": "placeable", "id": "b1", "label": "Floor A" },
                    { "kind": "placeable", "id": "b2", "label": "Floor B" },
                    { "kind": "special", "tag": STAIRS, "label": "Stairs" },
                    { "kind": "placeable", "id": "b3", "label": "Floor C" }
                ]
            },
            {
                "id": "walls",
                "label": "Walls",
                "order": 8,
                "parent": "structure",
                "special_tags": ["wall"],
                "items": [
                    { "kind": "placeable", "id": "wall_wood", "label": "Wood wall" },
                    { "kind": "placeable", "id": "wall_stone", "label": "Stone wall" }
                ]
            },
            {
                "id": "doors",
                "label": "Doors",
                "order": 3,
                "items": [
                    { "kind": "placeable", "id": "door_plain", "label": "Plain door" }
                ]
            },
            {
                "id": "furniture",
                "label": "Furniture",
                "order": 20,
                "items": [
                    { "kind": "placeable", "id": "chair", "label": "Chair" }
                ]
            },
            {
                "id": "lighting",
                "label": "Lighting",
                "order": 1,
                "parent": "furniture",
                "items": []
            }
        ],
        "placeables": [
            { "id": "foundation", "label": "Foundation" },
            { "id": "b1", "label": "Floor A" },
            { "id": "b2", "label": "Floor B" },
            { "id": "b3", "label": "Floor C" },
            { "id": "wall_wood", "label": "Wood wall" },
            { "id": "wall_stone", "label": "Stone wall" },
            { "id": "door_plain", "label": "Plain door" },
            { "id": "chair", "label": "Chair" },
            { "id": "lamp_extra", "label": "Standing lamp" },
            { "id": "hidden_prop", "label": "Hidden prop", "buildable": false }
        ],
        "specials": [
            { "tag": STAIRS, "label": "Stairs" },
            { "tag": LADDER, "label": "Ladder" }
        ]
    }))
    .expect("fixture catalog document")
}

pub fn fixture_catalog() -> StaticCatalog {
    StaticCatalog::from_document(fixture_document())
}

pub fn engine() -> Engine<StaticCatalog, MemoryStore> {
    Engine::initialize(fixture_catalog(), MemoryStore::new()).expect("memory store never fails")
}

pub fn engine_with(overrides: OverrideSet) -> Engine<StaticCatalog, MemoryStore> {
    Engine::initialize(fixture_catalog(), MemoryStore::with_overrides(overrides))
        .expect("memory store never fails")
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn idents(items: &[menusmith::Item]) -> Vec<String> {
    items.iter().map(|item| item.ident().to_string()).collect()
}
