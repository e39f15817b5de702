use std::{num::NonZeroUsize, sync::Arc};

use ahash::AHashSet as HashSet;
use indexbrain_data::{CorpusLayout, LocationId, corpus};
use tracing::{debug, error, info, instrument, warn};

use super::{CancelFlag, Entry, SearchConfig, SearchError};
use crate::{
    adapter::{LineMatch, LineSearchError, LineSearchRequest, LineSearcher, SearchTarget},
    location::{Location, LocationGraph},
    query::{EntryType, SearchQuery, SearchTier},
};

/// Runs queries against one generation's graph and corpus.
///
/// Holds only borrows: a dispatcher lives for the duration of a single
/// request, so every tier of that request sees the same generation.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'a> {
    graph: &'a LocationGraph,
    layout: &'a CorpusLayout,
    searcher: &'a dyn LineSearcher,
    config: &'a SearchConfig,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        graph: &'a LocationGraph,
        layout: &'a CorpusLayout,
        searcher: &'a dyn LineSearcher,
        config: &'a SearchConfig,
    ) -> Self {
        Self {
            graph,
            layout,
            searcher,
            config,
        }
    }

    /// Run `query` at `tier`, returning at most `limit` entries.
    pub fn dispatch(
        &self,
        query: &SearchQuery,
        tier: SearchTier,
        limit: NonZeroUsize,
    ) -> Result<Vec<Entry>, SearchError> {
        self.dispatch_with_cancel(query, tier, limit, &CancelFlag::default())
    }

    #[instrument(
        name = "Dispatch",
        level = "info",
        skip_all,
        fields(
            tier = %tier,
            location = %query.location().abbr,
            entry_type = %query.entry_type(),
            limit = limit.get(),
        )
    )]
    pub fn dispatch_with_cancel(
        &self,
        query: &SearchQuery,
        tier: SearchTier,
        limit: NonZeroUsize,
        cancel: &CancelFlag,
    ) -> Result<Vec<Entry>, SearchError> {
        let entries = match tier {
            SearchTier::Specific => {
                self.specific(query.text(), query.location(), query.entry_type(), limit)
            }
            SearchTier::Fallback => self.fallback(query, limit, cancel),
            SearchTier::Extended => self.extended(query, limit, cancel),
        }?;
        debug!(count = entries.len(), "dispatch returning results");
        Ok(entries)
    }

    /// Search one location's corpus file.
    fn specific(
        &self,
        pattern: &str,
        location: &Arc<Location>,
        entry_type: EntryType,
        limit: NonZeroUsize,
    ) -> Result<Vec<Entry>, SearchError> {
        let path = location.file_path(self.layout, entry_type);
        if !path.is_file() {
            info!(path = ?path, "corpus file doesn't exist");
            return Ok(Vec::new());
        }

        let request = self.request(pattern, SearchTarget::File(&path), limit);
        let matches = self.run(&request, pattern)?;
        Ok(matches
            .into_iter()
            .take(limit.get())
            .map(|m| Entry::new(m.text, entry_type, Arc::clone(location)))
            .collect())
    }

    fn fallback(
        &self,
        query: &SearchQuery,
        limit: NonZeroUsize,
        cancel: &CancelFlag,
    ) -> Result<Vec<Entry>, SearchError> {
        let location = query.location();
        let mut entries = self.specific(query.text(), location, query.entry_type(), limit)?;

        for related in self.graph.related_chain(location) {
            let Some(remaining) = NonZeroUsize::new(limit.get().saturating_sub(entries.len()))
            else {
                break;
            };
            if cancel.is_cancelled() {
                info!(at = %related.abbr, "fallback search cancelled");
                return Err(SearchError::Cancelled { stage: "fallback" });
            }
            debug!(
                "Fallback to {} for {} more results",
                related.abbr,
                remaining.get()
            );
            let found = self.specific(query.text(), &related, query.entry_type(), remaining)?;
            entries.extend(found);
        }
        Ok(entries)
    }

    fn extended(
        &self,
        query: &SearchQuery,
        limit: NonZeroUsize,
        cancel: &CancelFlag,
    ) -> Result<Vec<Entry>, SearchError> {
        let location = query.location();
        let excluded: HashSet<LocationId> = std::iter::once(location.id)
            .chain(location.related_ids.iter().copied())
            .collect();

        if cancel.is_cancelled() {
            info!("extended search cancelled");
            return Err(SearchError::Cancelled { stage: "extended" });
        }

        let glob = CorpusLayout::glob_for(query.entry_type().code());
        let target = SearchTarget::Glob {
            root: self.layout.root(),
            pattern: &glob,
        };
        let request = self.request(query.text(), target, limit);
        let matches = self.run(&request, query.text())?;
        let num_matches = matches.len();

        let mut unattributed = 0usize;
        let mut num_excluded = 0usize;
        let mut entries = Vec::new();
        for m in matches {
            if entries.len() == limit.get() {
                break;
            }
            let Some(owner) = self.owner_of(&m) else {
                unattributed += 1;
                continue;
            };
            if excluded.contains(&owner.id) {
                num_excluded += 1;
                continue;
            }
            entries.push(Entry::new(m.text, query.entry_type(), Arc::clone(owner)));
        }

        debug!(
            num_matches,
            unattributed,
            excluded = num_excluded,
            kept = entries.len(),
            "extended search filtered"
        );
        Ok(entries)
    }

    /// The location whose folder holds the matched file.
    fn owner_of(&self, m: &LineMatch) -> Option<&'a Arc<Location>> {
        let Some(abbr) = corpus::abbr_from_match_path(&m.path) else {
            warn!(path = ?m.path, "could not read a location from match path");
            return None;
        };
        let owner = self.graph.resolve(abbr);
        if owner.is_none() {
            warn!(abbr, path = ?m.path, "match from unknown location");
        }
        owner
    }

    fn request<'r>(
        &self,
        pattern: &'r str,
        target: SearchTarget<'r>,
        limit: NonZeroUsize,
    ) -> LineSearchRequest<'r> {
        LineSearchRequest {
            pattern,
            target,
            max_count: limit,
            case_insensitive: self.config.case_insensitive,
            crlf: self.config.crlf,
        }
    }

    fn run(
        &self,
        request: &LineSearchRequest<'_>,
        pattern: &str,
    ) -> Result<Vec<LineMatch>, SearchError> {
        self.searcher
            .search(request)
            .or_else(|e| absorb(e, pattern))
    }
}

/// Fold adapter outcomes into dispatcher results: finding nothing is an empty
/// success, everything else a failure.
fn absorb(err: LineSearchError, pattern: &str) -> Result<Vec<LineMatch>, SearchError> {
    match err {
        LineSearchError::NoMatches => Ok(Vec::new()),
        LineSearchError::MalformedPattern(detail) => {
            warn!(query = pattern, detail, "invalid query");
            Err(SearchError::MalformedQuery {
                query: pattern.to_string(),
                detail,
            })
        }
        LineSearchError::Execution(msg) => {
            error!(error = %msg, "error running line search");
            Err(SearchError::Adapter(msg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use parking_lot::Mutex;

    /// Canned matches per file; records every request it receives.
    #[derive(Debug, Default)]
    struct MockSearcher {
        files: Vec<(PathBuf, Vec<&'static str>)>,
        fail_on: Option<PathBuf>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    impl MockSearcher {
        fn with_file(mut self, path: PathBuf, lines: &[&'static str]) -> Self {
            self.files.push((path, lines.to_vec()));
            self
        }

        fn called_with(&self) -> Vec<(String, usize)> {
            self.calls.lock().clone()
        }
    }

    impl LineSearcher for MockSearcher {
        fn search(
            &self,
            request: &LineSearchRequest<'_>,
        ) -> Result<Vec<LineMatch>, LineSearchError> {
            let wanted: Vec<&PathBuf> = match request.target {
                SearchTarget::File(path) => {
                    self.calls.lock().push((
                        path.parent().unwrap().file_name().unwrap().to_string_lossy().into_owned(),
                        request.max_count.get(),
                    ));
                    if self.fail_on.as_deref() == Some(path) {
                        return Err(LineSearchError::Execution("boom".into()));
                    }
                    self.files.iter().filter(|(p, _)| p == path).map(|(p, _)| p).collect()
                }
                SearchTarget::Glob { .. } => {
                    self.calls.lock().push(("*".into(), request.max_count.get()));
                    self.files.iter().map(|(p, _)| p).collect()
                }
            };
            if request.pattern == "[" {
                return Err(LineSearchError::MalformedPattern("unclosed class".into()));
            }

            let mut out = Vec::new();
            for path in wanted {
                let (_, lines) = self.files.iter().find(|(p, _)| p == path).unwrap();
                let needle = request.pattern.to_lowercase();
                out.extend(
                    lines
                        .iter()
                        .filter(|l| l.to_lowercase().contains(&needle))
                        .take(request.max_count.get())
                        .enumerate()
                        .map(|(i, l)| LineMatch {
                            path: path.clone(),
                            line_number: i as u64 + 1,
                            byte_offset: 0,
                            text: (*l).to_string(),
                        }),
                );
            }
            if out.is_empty() {
                Err(LineSearchError::NoMatches)
            } else {
                Ok(out)
            }
        }
    }

    struct Fixture {
        dir: tempfile::TempDir,
        graph: LocationGraph,
        layout: CorpusLayout,
        config: SearchConfig,
    }

    impl Fixture {
        /// US -> [CA, MX]; GB unrelated. Only the listed files exist on disk.
        fn new(existing: &[&str]) -> Self {
            let dir = tempfile::TempDir::new().unwrap();
            let layout = CorpusLayout::new(dir.path());
            let graph = LocationGraph::from_locations([
                Location::new(LocationId(1), "US", "United States")
                    .with_related([LocationId(2), LocationId(3)]),
                Location::new(LocationId(2), "CA", "Canada"),
                Location::new(LocationId(3), "MX", "Mexico"),
                Location::new(LocationId(4), "GB", "United Kingdom"),
            ]);
            let fixture = Self {
                dir,
                graph,
                layout,
                config: SearchConfig::default(),
            };
            for abbr in existing {
                let path = fixture.path(abbr);
                std::fs::create_dir_all(path.parent().unwrap()).unwrap();
                std::fs::write(&path, "").unwrap();
            }
            fixture
        }

        fn path(&self, abbr: &str) -> PathBuf {
            self.graph
                .resolve(abbr)
                .unwrap()
                .file_path(&self.layout, EntryType::Name)
        }

        fn dispatcher<'a>(&'a self, searcher: &'a MockSearcher) -> Dispatcher<'a> {
            Dispatcher::new(&self.graph, &self.layout, searcher, &self.config)
        }

        fn query(&self, raw: &str, abbr: &str) -> SearchQuery {
            SearchQuery::build(raw, abbr, "name", &self.graph).unwrap()
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }
    }

    fn limit(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn names(entries: &[Entry]) -> Vec<(&str, &str)> {
        entries
            .iter()
            .map(|e| (e.name.as_str(), e.location.abbr.as_str()))
            .collect()
    }

    #[test]
    fn test_specific_file_order() {
        let fx = Fixture::new(&["US"]);
        let searcher =
            MockSearcher::default().with_file(fx.path("US"), &["Smith", "Smithson", "Jones"]);
        let entries = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("Smith", "US"), SearchTier::Specific, limit(100))
            .unwrap();
        assert_eq!(names(&entries), vec![("Smith", "US"), ("Smithson", "US")]);
        assert!(entries.iter().all(|e| e.entry_type == EntryType::Name));
    }

    #[test]
    fn test_specific_caps_at_limit() {
        let fx = Fixture::new(&["US"]);
        let searcher =
            MockSearcher::default().with_file(fx.path("US"), &["Smith", "Smithson", "Smithy"]);
        let entries = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("Smith", "US"), SearchTier::Specific, limit(2))
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(searcher.called_with(), vec![("US United States".into(), 2)]);
    }

    #[test]
    fn test_specific_missing_file_is_empty_success() {
        let fx = Fixture::new(&[]);
        let searcher = MockSearcher::default();
        let entries = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("Smith", "US"), SearchTier::Specific, limit(10))
            .unwrap();
        assert!(entries.is_empty());
        assert!(searcher.called_with().is_empty(), "searcher must not run");
    }

    #[test]
    fn test_fallback_stops_when_quota_met() {
        let fx = Fixture::new(&["US", "CA", "MX"]);
        let searcher = MockSearcher::default()
            .with_file(fx.path("US"), &["Smith", "Jones"])
            .with_file(fx.path("CA"), &["Smithers", "Smythe", "Smithwick"])
            .with_file(fx.path("MX"), &["Smithez"]);
        let entries = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("Smith", "US"), SearchTier::Fallback, limit(2))
            .unwrap();
        assert_eq!(names(&entries), vec![("Smith", "US"), ("Smithers", "CA")]);
        // CA is asked for the remaining quota only; MX is never queried.
        assert_eq!(
            searcher.called_with(),
            vec![("US United States".into(), 2), ("CA Canada".into(), 1)]
        );
    }

    #[test]
    fn test_fallback_walks_whole_chain() {
        let fx = Fixture::new(&["US", "CA", "MX"]);
        let searcher = MockSearcher::default()
            .with_file(fx.path("US"), &["Smith"])
            .with_file(fx.path("CA"), &["Smithers"])
            .with_file(fx.path("MX"), &["Smithez"]);
        let entries = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("Smith", "US"), SearchTier::Fallback, limit(10))
            .unwrap();
        assert_eq!(
            names(&entries),
            vec![("Smith", "US"), ("Smithers", "CA"), ("Smithez", "MX")]
        );
    }

    #[test]
    fn test_fallback_skips_missing_files() {
        let fx = Fixture::new(&["US", "MX"]);
        let searcher = MockSearcher::default()
            .with_file(fx.path("US"), &["Smith"])
            .with_file(fx.path("MX"), &["Smithez"]);
        let entries = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("Smith", "US"), SearchTier::Fallback, limit(10))
            .unwrap();
        assert_eq!(names(&entries), vec![("Smith", "US"), ("Smithez", "MX")]);
    }

    #[test]
    fn test_fallback_failure_discards_partial_results() {
        let fx = Fixture::new(&["US", "CA"]);
        let mut searcher = MockSearcher::default().with_file(fx.path("US"), &["Smith"]);
        searcher.fail_on = Some(fx.path("CA"));
        let err = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("Smith", "US"), SearchTier::Fallback, limit(10))
            .unwrap_err();
        assert_eq!(err, SearchError::Adapter("boom".into()));
    }

    #[test]
    fn test_fallback_cancelled() {
        let fx = Fixture::new(&["US", "CA"]);
        let searcher = MockSearcher::default().with_file(fx.path("US"), &["Smith"]);
        let cancel = CancelFlag::new();
        cancel.cancel();
        let err = fx
            .dispatcher(&searcher)
            .dispatch_with_cancel(
                &fx.query("Smith", "US"),
                SearchTier::Fallback,
                limit(10),
                &cancel,
            )
            .unwrap_err();
        assert_eq!(err.reason(), "cancelled");
    }

    #[test]
    fn test_extended_excludes_self_and_chain() {
        let fx = Fixture::new(&["US", "CA", "MX", "GB"]);
        let stray = fx.root().join("ZZ Nowhere").join("ZzN.txt");
        let searcher = MockSearcher::default()
            .with_file(fx.path("CA"), &["Smithers"])
            .with_file(fx.path("GB"), &["Smith-Jones", "Smithfield"])
            .with_file(fx.path("MX"), &["Smithez"])
            .with_file(stray, &["Smithzz"])
            .with_file(fx.path("US"), &["Smith"]);
        let entries = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("Smith", "US"), SearchTier::Extended, limit(10))
            .unwrap();
        assert_eq!(
            names(&entries),
            vec![("Smith-Jones", "GB"), ("Smithfield", "GB")]
        );
        assert_eq!(searcher.called_with(), vec![("*".into(), 10)]);
    }

    #[test]
    fn test_extended_from_unrelated_location() {
        let fx = Fixture::new(&["US", "CA", "GB"]);
        let searcher = MockSearcher::default()
            .with_file(fx.path("CA"), &["Smithers"])
            .with_file(fx.path("GB"), &["Smith-Jones"])
            .with_file(fx.path("US"), &["Smith", "Smithson"]);
        let entries = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("Smith", "GB"), SearchTier::Extended, limit(2))
            .unwrap();
        assert_eq!(names(&entries), vec![("Smithers", "CA"), ("Smith", "US")]);
    }

    #[test]
    fn test_malformed_query() {
        let fx = Fixture::new(&["US"]);
        let searcher = MockSearcher::default().with_file(fx.path("US"), &["Smith"]);
        let err = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("[", "US"), SearchTier::Specific, limit(10))
            .unwrap_err();
        assert!(err.is_caller_error());
        assert_eq!(err.reason(), "invalid_query");
    }

    #[test]
    fn test_no_matches_is_empty() {
        let fx = Fixture::new(&["US"]);
        let searcher = MockSearcher::default().with_file(fx.path("US"), &["Jones"]);
        let entries = fx
            .dispatcher(&searcher)
            .dispatch(&fx.query("Smith", "US"), SearchTier::Extended, limit(10))
            .unwrap();
        assert!(entries.is_empty());
    }
}
