//! Cache generations.
//!
//! Everything derived from the store and the corpus (graph, replacements,
//! related terms, message, counts) is built together into one immutable
//! [`Generation`]. A refresh builds the next generation off to the side and
//! publishes it with a single pointer swap, so a reader holding an
//! `Arc<Generation>` never sees a mix of two refreshes.
use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexbrain_data::{CorpusLayout, LocationStore};
use parking_lot::{Mutex, RwLock};
use tracing::{error, info, instrument};

use crate::{
    counts::{CorpusCounts, Counts},
    error::Result,
    location::{Location, LocationGraph, reconcile},
    query::{EntryType, Normalizer, RelatedTerms},
};

#[derive(Debug)]
pub struct Generation {
    graph: LocationGraph,
    normalizer: Normalizer,
    related_terms: RelatedTerms,
    message: String,
    counts: CorpusCounts,
    built_at: DateTime<Utc>,
}

impl Generation {
    #[instrument(name = "Build generation", level = "info", skip_all)]
    pub fn build(layout: &CorpusLayout, store: &dyn LocationStore) -> Result<Self> {
        let graph = reconcile(layout, store)?;
        let counts = CorpusCounts::compute(&graph, layout);
        let normalizer = Normalizer::from_records(store.replacements()?);
        let related_terms = RelatedTerms::from_records(store.related_terms()?);
        let message = store.message()?.unwrap_or_default();

        info!(
            locations = graph.len(),
            replacements = normalizer.len(),
            related_terms = related_terms.len(),
            "built generation"
        );
        Ok(Self::from_parts(
            graph,
            normalizer,
            related_terms,
            message,
            counts,
        ))
    }

    pub fn from_parts(
        graph: LocationGraph,
        normalizer: Normalizer,
        related_terms: RelatedTerms,
        message: impl Into<String>,
        counts: CorpusCounts,
    ) -> Self {
        Self {
            graph,
            normalizer,
            related_terms,
            message: message.into(),
            counts,
            built_at: Utc::now(),
        }
    }

    pub fn graph(&self) -> &LocationGraph {
        &self.graph
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn related_terms(&self) -> &RelatedTerms {
        &self.related_terms
    }

    /// Client-facing message; empty when none is configured.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn corpus_counts(&self) -> &CorpusCounts {
        &self.counts
    }

    pub fn counts_for(&self, location: &Location, entry_type: EntryType) -> Counts {
        self.counts.counts_for(location, entry_type)
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Every location, sorted by abbreviation.
    pub fn locations(&self) -> Vec<Arc<Location>> {
        self.graph.sorted_by_abbr()
    }
}

/// Holds the active [`Generation`].
#[derive(Debug)]
pub struct GenerationCache {
    active: RwLock<Arc<Generation>>,
    refresh_lock: Mutex<()>,
}

impl GenerationCache {
    pub fn new(initial: Generation) -> Self {
        Self {
            active: RwLock::new(Arc::new(initial)),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The active generation. Callers keep using it for as long as they hold
    /// the `Arc`, whatever refreshes happen meanwhile.
    pub fn current(&self) -> Arc<Generation> {
        self.active.read().clone()
    }

    /// Rebuild from `store` and `layout` and make the result active.
    ///
    /// Only one refresh runs at a time. If building fails the active
    /// generation is left untouched and the error returned.
    pub fn refresh(
        &self,
        layout: &CorpusLayout,
        store: &dyn LocationStore,
    ) -> Result<Arc<Generation>> {
        let _guard = self.refresh_lock.lock();
        let next = Generation::build(layout, store).inspect_err(|e| {
            error!(error = %e, "refresh failed, keeping previous generation");
        })?;
        Ok(self.swap(next))
    }

    /// Make `generation` active without rebuilding.
    pub fn publish(&self, generation: Generation) -> Arc<Generation> {
        let _guard = self.refresh_lock.lock();
        self.swap(generation)
    }

    fn swap(&self, generation: Generation) -> Arc<Generation> {
        let next = Arc::new(generation);
        let previous = std::mem::replace(&mut *self.active.write(), Arc::clone(&next));
        info!(
            previous = %previous.built_at,
            current = %next.built_at,
            "swapped active generation"
        );
        next
    }
}
