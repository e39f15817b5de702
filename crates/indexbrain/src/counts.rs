//! Corpus sizes per location and entry type.
//!
//! Clients use these to tell how much material each tier would search before
//! asking. Sizes are file lengths in bytes, taken once per generation.
use ahash::AHashMap as HashMap;
use indexbrain_data::{CorpusLayout, LocationId, corpus};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::{
    location::{Location, LocationGraph},
    query::EntryType,
};

#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    /// Size of the location's own file.
    pub specific: u64,
    /// Combined size of its related locations' files.
    pub fallback: u64,
    /// Combined size of every location's file.
    pub extended: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CorpusCounts {
    lengths: HashMap<(LocationId, EntryType), u64>,
    totals: HashMap<EntryType, u64>,
}

impl CorpusCounts {
    #[instrument(name = "Compute corpus counts", level = "debug", skip_all)]
    pub fn compute(graph: &LocationGraph, layout: &CorpusLayout) -> Self {
        let locations: Vec<_> = graph.iter().collect();
        let lengths: Vec<((LocationId, EntryType), u64)> = locations
            .par_iter()
            .flat_map_iter(|location| {
                EntryType::ALL.into_iter().map(move |entry_type| {
                    let len = corpus::file_len(&location.file_path(layout, entry_type));
                    ((location.id, entry_type), len)
                })
            })
            .collect();

        let mut totals: HashMap<EntryType, u64> = HashMap::new();
        for ((_, entry_type), len) in &lengths {
            *totals.entry(*entry_type).or_default() += len;
        }
        debug!(files = lengths.len(), ?totals, "computed corpus counts");

        Self {
            lengths: lengths.into_iter().collect(),
            totals,
        }
    }

    /// Size of one location's file; zero when missing or unknown.
    pub fn length(&self, id: LocationId, entry_type: EntryType) -> u64 {
        self.lengths
            .get(&(id, entry_type))
            .copied()
            .unwrap_or_default()
    }

    pub fn total(&self, entry_type: EntryType) -> u64 {
        self.totals.get(&entry_type).copied().unwrap_or_default()
    }

    pub fn counts_for(&self, location: &Location, entry_type: EntryType) -> Counts {
        Counts {
            specific: self.length(location.id, entry_type),
            fallback: location
                .related_ids
                .iter()
                .map(|id| self.length(*id, entry_type))
                .sum(),
            extended: self.total(entry_type),
        }
    }
}
