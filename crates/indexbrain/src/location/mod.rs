//! The location graph.
//!
//! Holds every known location of one cache generation together with each
//! location's ordered fallback chain. A graph is immutable once built; refresh
//! replaces it wholesale.
use std::{path::PathBuf, sync::Arc};

use ahash::AHashMap as HashMap;
use indexbrain_data::{CorpusLayout, LocationId, LocationRecord, corpus};
use itertools::Itertools;
use tracing::warn;

use crate::query::EntryType;

mod reconcile;

pub use reconcile::reconcile;

/// A region or language with its own corpora.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    #[cfg_attr(feature = "serde", serde(skip))]
    pub id: LocationId,
    /// Short code; unique within a graph and part of every corpus path.
    pub abbr: String,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub is_language: bool,
    /// Fallback chain, in the order it is walked.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub related_ids: Vec<LocationId>,
}

impl Location {
    pub fn new(id: LocationId, abbr: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id,
            abbr: abbr.into(),
            name: name.into(),
            is_language: false,
            related_ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_related(mut self, related_ids: impl IntoIterator<Item = LocationId>) -> Self {
        self.related_ids.extend(related_ids);
        self
    }

    /// Folder name, `"<ABBR> <Name>"`.
    pub fn folder(&self) -> String {
        corpus::folder_name(&self.abbr, &self.name)
    }

    /// Path of this location's corpus file for `entry_type`.
    pub fn file_path(&self, layout: &CorpusLayout, entry_type: EntryType) -> PathBuf {
        layout.file_path(&self.abbr, &self.name, entry_type.code())
    }
}

impl From<LocationRecord> for Location {
    fn from(record: LocationRecord) -> Self {
        Self {
            id: record.id,
            abbr: record.abbr,
            name: record.name,
            is_language: record.is_language,
            related_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocationGraph {
    by_id: HashMap<LocationId, Arc<Location>>,
    by_abbr: HashMap<String, LocationId>,
}

impl LocationGraph {
    /// Build a graph. A location reusing an identifier or abbreviation seen
    /// earlier is dropped with a warning.
    pub fn from_locations(locations: impl IntoIterator<Item = Location>) -> Self {
        let mut graph = Self::default();
        for location in locations {
            if graph.by_id.contains_key(&location.id) {
                warn!(id = %location.id, abbr = %location.abbr, "duplicate location id, ignoring");
                continue;
            }
            if graph.by_abbr.contains_key(&location.abbr) {
                warn!(id = %location.id, abbr = %location.abbr, "duplicate location abbreviation, ignoring");
                continue;
            }
            graph.by_abbr.insert(location.abbr.clone(), location.id);
            graph.by_id.insert(location.id, Arc::new(location));
        }
        graph
    }

    pub fn resolve(&self, abbr: &str) -> Option<&Arc<Location>> {
        self.by_abbr.get(abbr).and_then(|id| self.by_id.get(id))
    }

    pub fn get(&self, id: LocationId) -> Option<&Arc<Location>> {
        self.by_id.get(&id)
    }

    /// The fallback chain of `location`, in stored order.
    ///
    /// Related identifiers with no location in this graph are stale
    /// relationship data: they are skipped and logged, never reported.
    pub fn related_chain(&self, location: &Location) -> Vec<Arc<Location>> {
        location
            .related_ids
            .iter()
            .filter_map(|id| {
                let related = self.by_id.get(id);
                if related.is_none() {
                    warn!(location = %location.abbr, related_id = %id, "related location missing from graph, skipping");
                }
                related.cloned()
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Location>> {
        self.by_id.values()
    }

    pub fn sorted_by_abbr(&self) -> Vec<Arc<Location>> {
        self.by_id
            .values()
            .sorted_by(|a, b| a.abbr.cmp(&b.abbr))
            .cloned()
            .collect()
    }
}
