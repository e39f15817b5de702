//! Row types for the persisted location tables.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to a location by the store. Stable for the lifetime of
/// a cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub i64);

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for LocationId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A row of the `locations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub id: LocationId,
    pub abbr: String,
    pub name: String,
    #[serde(default)]
    pub is_language: bool,
}

/// A row of the `related_locations` table. `sort` orders the fallback chain
/// of `location_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedRecord {
    pub location_id: LocationId,
    pub related_id: LocationId,
    #[serde(default)]
    pub sort: i64,
}

/// A key/value row, used by both the replacements and the related terms tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueRecord {
    pub key: String,
    pub val: String,
}

impl KeyValueRecord {
    pub fn new(key: impl Into<String>, val: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            val: val.into(),
        }
    }
}

/// Every table the lookup service reads, in one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
    #[serde(default)]
    pub related: Vec<RelatedRecord>,
    #[serde(default)]
    pub replacements: Vec<KeyValueRecord>,
    #[serde(default)]
    pub related_terms: Vec<KeyValueRecord>,
    #[serde(default)]
    pub message: Option<String>,
}
