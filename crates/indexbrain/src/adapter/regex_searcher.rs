use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use glob::{MatchOptions, Pattern};
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use tracing::{debug, instrument};

use super::{LineMatch, LineSearchError, LineSearchRequest, LineSearcher, SearchTarget};

const DEFAULT_SIZE_LIMIT: usize = 10 * (1 << 20);

/// In-process [`LineSearcher`] built on the `regex` crate.
///
/// Glob targets are expanded up front and the matched files searched in
/// parallel; results keep sorted path order.
#[derive(Debug, Clone)]
pub struct RegexLineSearcher {
    size_limit: usize,
}

impl Default for RegexLineSearcher {
    fn default() -> Self {
        Self {
            size_limit: DEFAULT_SIZE_LIMIT,
        }
    }
}

impl RegexLineSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on the compiled size of a pattern. Patterns that exceed it
    /// are rejected as malformed.
    #[must_use]
    pub fn with_size_limit(mut self, size_limit: usize) -> Self {
        self.size_limit = size_limit;
        self
    }

    fn compile(&self, request: &LineSearchRequest<'_>) -> Result<Regex, LineSearchError> {
        RegexBuilder::new(request.pattern)
            .case_insensitive(request.case_insensitive)
            .size_limit(self.size_limit)
            .build()
            .map_err(|e| match e {
                regex::Error::Syntax(msg) => LineSearchError::MalformedPattern(msg),
                regex::Error::CompiledTooBig(limit) => LineSearchError::MalformedPattern(format!(
                    "pattern exceeds the compiled size limit of {limit} bytes"
                )),
                other => LineSearchError::Execution(other.to_string()),
            })
    }
}

impl LineSearcher for RegexLineSearcher {
    #[instrument(name = "Regex line search", level = "trace", skip_all, fields(pattern = request.pattern))]
    fn search(&self, request: &LineSearchRequest<'_>) -> Result<Vec<LineMatch>, LineSearchError> {
        let regex = self.compile(request)?;
        let files = match request.target {
            SearchTarget::File(path) => vec![path.to_path_buf()],
            SearchTarget::Glob { root, pattern } => expand_glob(root, pattern)?,
        };

        let per_file = files
            .par_iter()
            .map(|path| search_file(&regex, path, request))
            .collect::<Result<Vec<_>, _>>()?;
        let matches: Vec<LineMatch> = per_file.into_iter().flatten().collect();

        debug!(files = files.len(), matches = matches.len(), "regex line search done");
        if matches.is_empty() {
            return Err(LineSearchError::NoMatches);
        }
        Ok(matches)
    }
}

fn expand_glob(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, LineSearchError> {
    if !root.is_dir() {
        return Err(LineSearchError::Execution(format!(
            "search root {} is not a directory",
            root.display()
        )));
    }
    let root = root.to_str().ok_or_else(|| {
        LineSearchError::Execution(format!("search root {} is not UTF-8", root.display()))
    })?;
    let full = format!("{}/{pattern}", Pattern::escape(root));
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: true,
    };

    let mut paths = glob::glob_with(&full, options)
        .map_err(|e| LineSearchError::Execution(format!("bad glob {full}: {e}")))?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(path),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "skipping unreadable glob entry");
                None
            }
        })
        .collect::<Vec<_>>();
    paths.sort();
    Ok(paths)
}

fn search_file(
    regex: &Regex,
    path: &Path,
    request: &LineSearchRequest<'_>,
) -> Result<Vec<LineMatch>, LineSearchError> {
    let file = File::open(path)
        .map_err(|e| LineSearchError::Execution(format!("{}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    let mut matches = Vec::new();
    let mut line_number = 0u64;
    let mut byte_offset = 0u64;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| LineSearchError::Execution(format!("{}: {e}", path.display())))?;
        if read == 0 {
            break;
        }
        line_number += 1;
        let line_start = byte_offset;
        byte_offset += read as u64;

        let mut line = buf.as_slice();
        if let Some(stripped) = line.strip_suffix(b"\n") {
            line = stripped;
        }
        if request.crlf
            && let Some(stripped) = line.strip_suffix(b"\r")
        {
            line = stripped;
        }

        let text = String::from_utf8_lossy(line);
        if regex.is_match(&text) {
            matches.push(LineMatch {
                path: path.to_path_buf(),
                line_number,
                byte_offset: line_start,
                text: text.into_owned(),
            });
            if matches.len() >= request.max_count.get() {
                break;
            }
        }
    }
    Ok(matches)
}
