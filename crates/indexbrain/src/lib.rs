//! IndexBrain - tiered name and place lookup
//!
//! IndexBrain answers lookup queries against plain-text corpora organised by
//! *location* (a country, region or language) and *entry type* (names, places,
//! other). Every corpus file holds one candidate per line; a query is a regular
//! expression matched case-insensitively against those lines.
//!
//! A search runs at one of three tiers:
//!
//! - **Specific**: only the requested location.
//! - **Fallback**: the requested location, then its related locations in their
//!   stored order, until enough results have been collected.
//! - **Extended**: every other location of the same entry type, excluding the
//!   requested location and its fallback chain.
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
//! let report = brain.search(&SearchRequest::new("Smith", "US", "name", "fallback"))?;
//! for entry in &report.entries {
//!     println!("{} ({})", entry.name, entry.location.abbr);
//! }
//! # Ok::<(), indexbrain::error::IndexBrainError>(())
//! ```
//!
//! # Data
//!
//! Locations, their fallback chains, query replacements and related terms come
//! from a [`LocationStore`]; the corpus itself is read from disk. Both are
//! loaded into an immutable [`Generation`] which is swapped atomically on
//! [`IndexBrain::refresh`].
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod adapter;
mod cache;
mod config;
mod core;
mod counts;
pub mod error;
mod location;
mod query;
mod search;

pub use crate::core::{IndexBrain, IndexBrainBuilder, SearchReport, SearchRequest};

pub use adapter::{
    LineMatch, LineSearchError, LineSearchRequest, LineSearcher, RegexLineSearcher,
    RipgrepSearcher, SearchTarget,
};
pub use cache::{Generation, GenerationCache};
pub use config::SearchConfigBuilder;
pub use counts::{CorpusCounts, Counts};
pub use indexbrain_data as data;
pub use indexbrain_data::{CorpusLayout, LocationId, LocationStore, MemoryStore};
pub use location::{Location, LocationGraph, reconcile};
pub use query::{
    EntryType, Normalizer, RelatedTerm, RelatedTerms, SearchQuery, SearchTier, ValidationError,
    parse_limit,
};
pub use search::{CancelFlag, DEFAULT_LIMIT, Dispatcher, Entry, SearchConfig, SearchError};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for IndexBrain.
///
/// Installs a `tracing` fmt subscriber filtered by `RUST_LOG` when set, or by
/// `level` otherwise. Safe to call more than once; only the first call has an
/// effect.
///
/// # Examples
///
/// ```rust
/// use indexbrain::init_logging;
/// use tracing::Level;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), indexbrain::error::IndexBrainError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::IndexBrainError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?;

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TestCorpus;

    fn setup_test_env() {
        let _ = init_logging(tracing::Level::WARN);
    }

    fn sample_brain(corpus: &TestCorpus) -> IndexBrain {
        IndexBrain::builder()
            .corpus_root(corpus.root())
            .store(corpus.store())
            .build()
            .unwrap()
    }

    #[test]
    fn test_init_logging_twice() {
        setup_test_env();
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }

    #[test]
    fn test_brain_creation() {
        setup_test_env();
        let corpus = TestCorpus::sample().unwrap();
        let brain = IndexBrain::builder()
            .corpus_root(corpus.root())
            .store(corpus.store())
            .build();
        assert!(brain.is_ok(), "Should be able to build over the sample corpus");
    }

    #[test]
    fn test_basic_search() {
        setup_test_env();
        let corpus = TestCorpus::sample().unwrap();
        let brain = sample_brain(&corpus);

        let report = brain
            .search(&SearchRequest::new("Smith", "US", "name", "specific"))
            .unwrap();
        let names: Vec<_> = report.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Smith", "Smithson"]);
    }

    #[test]
    fn test_search_respects_limit() {
        setup_test_env();
        let corpus = TestCorpus::sample().unwrap();
        let brain = sample_brain(&corpus);

        let report = brain
            .search(&SearchRequest::new("Smith", "US", "name", "fallback").limit("3"))
            .unwrap();
        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.limit.get(), 3);
    }

    #[test]
    fn test_configuration() {
        setup_test_env();
        let config = SearchConfigBuilder::new()
            .default_limit(1)
            .unwrap()
            .build();
        assert_eq!(config.default_limit.get(), 1);

        let corpus = TestCorpus::sample().unwrap();
        let brain = IndexBrain::builder()
            .corpus_root(corpus.root())
            .store(corpus.store())
            .config(config)
            .build()
            .unwrap();
        let report = brain
            .search(&SearchRequest::new("Smith", "US", "name", "specific"))
            .unwrap();
        assert_eq!(report.entries.len(), 1, "Should respect the configured default limit");
    }

    #[test]
    fn test_no_matches_is_not_an_error() {
        setup_test_env();
        let corpus = TestCorpus::sample().unwrap();
        let brain = sample_brain(&corpus);

        let report = brain
            .search(&SearchRequest::new("XYZ123NONEXISTENT", "US", "name", "extended"))
            .unwrap();
        assert!(report.entries.is_empty());
    }
}
