//! Line matching over corpus files.
//!
//! The dispatcher never reads corpus files itself. It describes what to search
//! with a [`LineSearchRequest`] and hands it to a [`LineSearcher`], which
//! returns the matching lines in file order.
use std::{
    fmt::Debug,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

mod regex_searcher;
mod ripgrep;

pub use error::LineSearchError;
pub use regex_searcher::RegexLineSearcher;
pub use ripgrep::RipgrepSearcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget<'a> {
    /// A single corpus file.
    File(&'a Path),
    /// Every file under `root` matching `pattern`, e.g. `*/*N.txt`.
    Glob { root: &'a Path, pattern: &'a str },
}

#[derive(Debug, Clone, Copy)]
pub struct LineSearchRequest<'a> {
    pub pattern: &'a str,
    pub target: SearchTarget<'a>,
    /// Maximum number of matching lines taken from any one file.
    pub max_count: NonZeroUsize,
    pub case_insensitive: bool,
    /// Treat `\r\n` as the line terminator.
    pub crlf: bool,
}

impl<'a> LineSearchRequest<'a> {
    pub fn new(pattern: &'a str, target: SearchTarget<'a>, max_count: NonZeroUsize) -> Self {
        Self {
            pattern,
            target,
            max_count,
            case_insensitive: true,
            crlf: true,
        }
    }
}

/// One matching line, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    pub path: PathBuf,
    /// 1-based.
    pub line_number: u64,
    /// Offset of the start of the line within the file.
    pub byte_offset: u64,
    pub text: String,
}

pub trait LineSearcher: Debug + Send + Sync {
    /// Find lines matching `request.pattern` in its target.
    ///
    /// Finding nothing is reported as [`LineSearchError::NoMatches`], never as
    /// an empty `Ok`.
    fn search(&self, request: &LineSearchRequest<'_>) -> Result<Vec<LineMatch>, LineSearchError>;
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum LineSearchError {
        #[error("no matching lines")]
        NoMatches,
        #[error("malformed pattern: {0}")]
        MalformedPattern(String),
        #[error("line search failed: {0}")]
        Execution(String),
    }
}
