//! crates/descubre_core/src/lists.rs
//!
//! Normalization of the list-like place fields (local foods, cultural notes),
//! which the catalog may hold either as a list or as one comma-delimited string,
//! and the aggregate summary built from them.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::Place;

/// A list-like field in whichever shape the store returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListField {
    Items(Vec<String>),
    Delimited(String),
}

impl ListField {
    /// Reads a raw column value. A JSON array is taken as a list; anything
    /// else is treated as comma-delimited text.
    pub fn from_raw(raw: &str) -> Self {
        match serde_json::from_str::<Vec<String>>(raw.trim()) {
            Ok(items) => ListField::Items(items),
            Err(_) => ListField::Delimited(raw.to_string()),
        }
    }
}

impl From<Vec<String>> for ListField {
    fn from(items: Vec<String>) -> Self {
        ListField::Items(items)
    }
}

impl From<&str> for ListField {
    fn from(text: &str) -> Self {
        ListField::Delimited(text.to_string())
    }
}

/// Canonical form of a list field: delimited text split on commas, every item
/// trimmed, empty entries dropped, duplicates removed keeping the first occurrence.
pub fn normalize_list(field: &ListField) -> Vec<String> {
    let pieces: Vec<&str> = match field {
        ListField::Items(items) => items.iter().map(String::as_str).collect(),
        ListField::Delimited(text) => text.split(',').collect(),
    };

    let mut out: Vec<String> = Vec::new();
    for piece in pieces {
        let item = piece.trim();
        if !item.is_empty() && !out.iter().any(|seen| seen == item) {
            out.push(item.to_string());
        }
    }
    out
}

/// Serde hook for list-like fields: accepts a list, delimited text or null, and
/// always yields the normalized list.
pub fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let field = Option::<ListField>::deserialize(deserializer)?;
    Ok(field.map(|f| normalize_list(&f)).unwrap_or_default())
}

/// Aggregated foods and cultural notes across a set of destinations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceStats {
    pub foods: Vec<String>,
    #[serde(rename = "cultures")]
    pub cultural_notes: Vec<String>,
    pub count: usize,
}

/// Builds the deduplicated foods/notes summary, in first-seen order.
pub fn summarize(places: &[Place]) -> PlaceStats {
    let foods = normalize_list(&ListField::Items(
        places.iter().flat_map(|p| p.local_foods.iter().cloned()).collect(),
    ));
    let cultural_notes = normalize_list(&ListField::Items(
        places.iter().flat_map(|p| p.cultural_notes.iter().cloned()).collect(),
    ));

    PlaceStats {
        foods,
        cultural_notes,
        count: places.len(),
    }
}
