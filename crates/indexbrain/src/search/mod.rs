//! Tiered search.
//!
//! A [`Dispatcher`] runs one validated [`SearchQuery`](crate::SearchQuery) at
//! one [`SearchTier`](crate::SearchTier) against a single generation's
//! location graph.
use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

mod dispatch;
mod entry;

pub use dispatch::Dispatcher;
pub use entry::Entry;
pub use error::SearchError;

/// Result count used when a request does not ask for one.
pub const DEFAULT_LIMIT: NonZeroUsize = match NonZeroUsize::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub default_limit: NonZeroUsize,
    pub case_insensitive: bool,
    pub crlf: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            case_insensitive: true,
            crlf: true,
        }
    }
}

/// Cooperative cancellation for a search in flight.
///
/// Checked between sub-searches, so an adapter call already running is
/// allowed to finish; its results are then discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum SearchError {
        /// The query is not a pattern the line searcher accepts.
        #[error("invalid query '{query}': {detail}")]
        MalformedQuery { query: String, detail: String },
        #[error("search failed: {0}")]
        Adapter(String),
        #[error("search cancelled during {stage}")]
        Cancelled { stage: &'static str },
    }

    impl SearchError {
        pub fn reason(&self) -> &'static str {
            match self {
                Self::MalformedQuery { .. } => "invalid_query",
                Self::Adapter(_) => "search_failed",
                Self::Cancelled { .. } => "cancelled",
            }
        }

        /// Whether the caller can fix this by changing the request.
        pub fn is_caller_error(&self) -> bool {
            matches!(self, Self::MalformedQuery { .. })
        }
    }
}
