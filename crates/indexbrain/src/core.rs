//! The [`IndexBrain`] facade.
//!
//! Ties the pieces together: a corpus layout and a location store feed a
//! [`GenerationCache`]; each search takes one generation from it and runs the
//! whole request (tier parsing, validation, normalization, dispatch) against
//! that generation only.
//!
//! # Quick Start
//!
//! ```rust
//! use indexbrain::{IndexBrain, SearchRequest};
//! use indexbrain::data::TestCorpus;
//!
//! let corpus = TestCorpus::sample()?;
//! let brain = IndexBrain::builder()
//!     .corpus_root(corpus.root())
//!     .store(corpus.store())
//!     .build()?;
//!
//! let report = brain.search(&SearchRequest::new("Smith", "US", "name", "specific"))?;
//! assert_eq!(report.entries.len(), 2);
//! # Ok::<(), indexbrain::error::IndexBrainError>(())
//! ```
use std::{
    num::NonZeroUsize,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use indexbrain_data::{CORPUS_DIR, CorpusLayout, LocationStore};
use tracing::{info, instrument};

use crate::{
    adapter::{LineSearcher, RegexLineSearcher},
    cache::{Generation, GenerationCache},
    counts::Counts,
    error::{IndexBrainError, Result},
    location::Location,
    query::{EntryType, RelatedTerm, SearchQuery, SearchTier, ValidationError, parse_limit},
    search::{CancelFlag, Dispatcher, Entry, SearchConfig},
};

/// The raw strings of one lookup, as a client sends them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
    pub location: &'a str,
    pub entry_type: &'a str,
    pub tier: &'a str,
    /// Requested result count; absent or unusable values mean the default.
    pub limit: Option<&'a str>,
}

impl<'a> SearchRequest<'a> {
    pub fn new(query: &'a str, location: &'a str, entry_type: &'a str, tier: &'a str) -> Self {
        Self {
            query,
            location,
            entry_type,
            tier,
            limit: None,
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: &'a str) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Results of one search plus what was actually searched for.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub entries: Vec<Entry>,
    pub tier: SearchTier,
    /// The query as sent.
    pub query_raw: String,
    /// The query after replacements, as handed to the line searcher.
    pub query_processed: String,
    pub location: Arc<Location>,
    pub entry_type: EntryType,
    pub limit: NonZeroUsize,
    pub elapsed: Duration,
}

/// Builder for [`IndexBrain`].
#[derive(Default)]
pub struct IndexBrainBuilder {
    corpus_root: Option<PathBuf>,
    store: Option<Arc<dyn LocationStore>>,
    searcher: Option<Arc<dyn LineSearcher>>,
    config: SearchConfig,
}

impl IndexBrainBuilder {
    /// Directory holding one folder per location. Defaults to `CORPUS_DIR`.
    pub fn corpus_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.corpus_root = Some(root.into());
        self
    }

    /// Where locations, relationships, replacements and the message live.
    pub fn store<S: LocationStore + 'static>(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    /// Line matching backend. Defaults to [`RegexLineSearcher`].
    pub fn line_searcher<L: LineSearcher + 'static>(mut self, searcher: L) -> Self {
        self.searcher = Some(Arc::new(searcher));
        self
    }

    pub fn config(mut self, config: SearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the first generation. Fails if it cannot be built, e.g. when
    /// the corpus root does not exist.
    #[instrument(name = "Build IndexBrain", level = "info", skip_all)]
    pub fn build(self) -> Result<IndexBrain> {
        let t_init = Instant::now();
        let store = self.store.ok_or_else(|| {
            IndexBrainError::ConfigError("a location store is required".to_string())
        })?;
        let layout = CorpusLayout::new(self.corpus_root.unwrap_or_else(|| CORPUS_DIR.clone()));
        let searcher = self
            .searcher
            .unwrap_or_else(|| Arc::new(RegexLineSearcher::new()));

        let initial = Generation::build(&layout, store.as_ref())?;
        info!(
            elapsed_seconds = ?t_init.elapsed(),
            root = ?layout.root(),
            "IndexBrain initialization complete"
        );

        Ok(IndexBrain {
            layout,
            store,
            searcher,
            config: self.config,
            cache: GenerationCache::new(initial),
        })
    }
}

impl std::fmt::Debug for IndexBrainBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBrainBuilder")
            .field("corpus_root", &self.corpus_root)
            .field("store", &self.store.is_some())
            .field("searcher", &self.searcher)
            .field("config", &self.config)
            .finish()
    }
}

/// Tiered lookup over per-location corpora.
///
/// Safe to share between threads; searches run concurrently with each other
/// and with [`refresh`](Self::refresh).
pub struct IndexBrain {
    layout: CorpusLayout,
    store: Arc<dyn LocationStore>,
    searcher: Arc<dyn LineSearcher>,
    config: SearchConfig,
    cache: GenerationCache,
}

impl IndexBrain {
    pub fn builder() -> IndexBrainBuilder {
        IndexBrainBuilder::default()
    }

    pub fn layout(&self) -> &CorpusLayout {
        &self.layout
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Rebuild every cache from the store and the corpus and swap them in.
    ///
    /// On failure the previous generation stays active.
    pub fn refresh(&self) -> Result<Arc<Generation>> {
        self.cache.refresh(&self.layout, self.store.as_ref())
    }

    pub fn generation(&self) -> Arc<Generation> {
        self.cache.current()
    }

    /// Every location, sorted by abbreviation.
    pub fn locations(&self) -> Vec<Arc<Location>> {
        self.generation().locations()
    }

    pub fn message(&self) -> String {
        self.generation().message().to_string()
    }

    /// Corpus sizes each tier would search for `abbr` and `entry_type`.
    pub fn counts(&self, abbr: &str, entry_type: &str) -> Result<Counts> {
        let entry_type = entry_type.parse::<EntryType>()?;
        let generation = self.generation();
        let location = generation
            .graph()
            .resolve(abbr)
            .ok_or_else(|| ValidationError::InvalidLocation(abbr.to_string()))?;
        Ok(generation.counts_for(location, entry_type))
    }

    /// "Could be" hints for `query`.
    pub fn related_terms(&self, query: &str) -> Vec<RelatedTerm> {
        self.generation().related_terms().lookup(query)
    }

    /// Apply the active query replacements to `raw`.
    pub fn normalize(&self, raw: &str) -> String {
        self.generation().normalizer().normalize(raw)
    }

    /// Validate a request against the active generation.
    pub fn build_query(&self, raw: &str, abbr: &str, entry_type: &str) -> Result<SearchQuery> {
        Ok(SearchQuery::build(
            raw,
            abbr,
            entry_type,
            self.generation().graph(),
        )?)
    }

    pub fn search(&self, request: &SearchRequest<'_>) -> Result<SearchReport> {
        self.search_with_cancel(request, &CancelFlag::default())
    }

    /// Run a whole lookup: tier, validation, normalization, dispatch.
    ///
    /// All steps use the generation active when the call starts, even if a
    /// refresh completes meanwhile.
    #[instrument(name = "Search", level = "info", skip_all, fields(query = request.query, location = request.location))]
    pub fn search_with_cancel(
        &self,
        request: &SearchRequest<'_>,
        cancel: &CancelFlag,
    ) -> Result<SearchReport> {
        let started = Instant::now();
        let tier = request.tier.parse::<SearchTier>()?;
        let generation = self.generation();

        let query = SearchQuery::build(
            request.query,
            request.location,
            request.entry_type,
            generation.graph(),
        )?
        .normalized(generation.normalizer());
        let limit = parse_limit(request.limit, self.config.default_limit);

        let dispatcher = Dispatcher::new(
            generation.graph(),
            &self.layout,
            self.searcher.as_ref(),
            &self.config,
        );
        let entries = dispatcher.dispatch_with_cancel(&query, tier, limit, cancel)?;

        let elapsed = started.elapsed();
        info!(
            num_returned = entries.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "search complete"
        );
        Ok(SearchReport {
            entries,
            tier,
            query_raw: query.raw().to_string(),
            query_processed: query.text().to_string(),
            location: Arc::clone(query.location()),
            entry_type: query.entry_type(),
            limit,
            elapsed,
        })
    }
}

impl std::fmt::Debug for IndexBrain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBrain")
            .field("layout", &self.layout)
            .field("searcher", &self.searcher)
            .field("config", &self.config)
            .field("generation_built_at", &self.generation().built_at())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexbrain_data::{MemoryStore, TestCorpus};

    fn brain(corpus: &TestCorpus) -> IndexBrain {
        IndexBrain::builder()
            .corpus_root(corpus.root())
            .store(corpus.store())
            .build()
            .unwrap()
    }

    #[test]
    fn test_store_required() {
        let err = IndexBrain::builder().corpus_root("/tmp").build().unwrap_err();
        assert!(matches!(err, IndexBrainError::ConfigError(_)));
    }

    #[test]
    fn test_missing_corpus_root_fails_build() {
        let corpus = TestCorpus::sample().unwrap();
        let err = IndexBrain::builder()
            .corpus_root(corpus.root().join("missing"))
            .store(Arc::new(MemoryStore::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, IndexBrainError::Data(_)));
    }

    #[test]
    fn test_tier_checked_before_query() {
        let corpus = TestCorpus::sample().unwrap();
        let brain = brain(&corpus);
        let err = brain
            .search(&SearchRequest::new("", "ZZ", "bogus", "everything"))
            .unwrap_err();
        assert_eq!(err.reason(), "invalid_search_type");
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_report_records_processing() {
        let corpus = TestCorpus::builder()
            .location("DE", "Germany")
            .file("DE", 'N', &["Müller", "Mueller", "Meier"])
            .replacement("ue", "(ue|ü)")
            .build()
            .unwrap();
        let brain = brain(&corpus);
        let report = brain
            .search(&SearchRequest::new("Mueller", "DE", "name", "specific").limit("10"))
            .unwrap();
        assert_eq!(report.query_raw, "Mueller");
        assert_eq!(report.query_processed, "M(ue|ü)ller");
        assert_eq!(report.tier, SearchTier::Specific);
        assert_eq!(report.location.abbr, "DE");
        assert_eq!(report.limit.get(), 10);
        let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Müller", "Mueller"]);
    }

    #[test]
    fn test_counts_and_terms() {
        let corpus = TestCorpus::builder()
            .location("US", "United States")
            .file("US", 'N', &["Smith"])
            .related_term("Mc", "Mac")
            .build()
            .unwrap();
        let brain = brain(&corpus);
        assert_eq!(brain.counts("US", "name").unwrap().specific, 6);
        assert_eq!(
            brain.counts("ZZ", "name").unwrap_err().reason(),
            "invalid_location"
        );
        assert_eq!(
            brain.counts("US", "bogus").unwrap_err().reason(),
            "invalid_type"
        );
        assert_eq!(brain.related_terms("McAdams").len(), 1);
        assert_eq!(brain.normalize("abc"), "abc");
    }

    #[test]
    fn test_refresh_picks_up_new_folder() {
        let corpus = TestCorpus::sample().unwrap();
        let brain = brain(&corpus);
        assert!(brain.build_query("Smith", "FR", "name").is_err());

        let folder = corpus.layout().folder_path("FR", "France");
        std::fs::create_dir_all(&folder).unwrap();
        std::fs::write(folder.join("FrN.txt"), "Smithé\n").unwrap();
        brain.refresh().unwrap();

        let report = brain
            .search(&SearchRequest::new("Smith", "FR", "name", "specific"))
            .unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(brain.locations().len(), 5);
    }
}
