//! Raw data side of IndexBrain.
//!
//! This crate knows how a corpus is laid out on disk (one folder per location,
//! one plain-text file per entry type) and what the persisted location tables
//! look like. It does not know anything about searching: the core crate builds
//! its location graph and caches on top of what is exposed here.
use once_cell::sync::Lazy;
use std::path::PathBuf;

pub mod corpus;
pub mod records;
pub mod store;
pub mod test_data;

pub const CORPUS_DIR_DEFAULT: &str = "/names";

/// Corpus root taken from the `CORPUS_DIR` environment variable, or
/// [`CORPUS_DIR_DEFAULT`] when it is unset.
pub static CORPUS_DIR: Lazy<PathBuf> = Lazy::new(|| {
    let dir = std::env::var("CORPUS_DIR").unwrap_or_else(|_| CORPUS_DIR_DEFAULT.to_string());
    PathBuf::from(dir)
});

mod error {
    use std::path::PathBuf;

    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[error("Corpus root directory does not exist: {}", .0.display())]
        CorpusRootMissing(PathBuf),
        #[error("Store error: {0}")]
        Store(String),
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}

pub use corpus::{CorpusLayout, FolderLocation};
pub use error::{DataError, Result};
pub use records::{KeyValueRecord, LocationId, LocationRecord, RelatedRecord, StoreSnapshot};
pub use store::{LocationStore, MemoryStore};
pub use test_data::TestCorpus;
