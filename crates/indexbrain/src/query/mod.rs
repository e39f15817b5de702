//! Request validation.
//!
//! Turns the raw strings of a lookup request into a [`SearchQuery`]: a
//! resolved location, a known entry type and a non-blank query. Nothing in the
//! search path ever sees an unvalidated request.
use std::{fmt, num::NonZeroUsize, str::FromStr, sync::Arc};

use tracing::{instrument, warn};

use crate::location::{Location, LocationGraph};

mod normalize;
mod related_terms;

pub use error::ValidationError;
pub use normalize::Normalizer;
pub use related_terms::{RelatedTerm, RelatedTerms};

/// Which corpus file of a location is searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryType {
    Name,
    Place,
    Other,
}

impl EntryType {
    pub const ALL: [Self; 3] = [Self::Name, Self::Place, Self::Other];

    /// Single-character code used in corpus file names.
    pub const fn code(self) -> char {
        match self {
            Self::Name => 'N',
            Self::Place => 'P',
            Self::Other => 'O',
        }
    }

    /// External token accepted by [`FromStr`].
    pub const fn token(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Place => "place",
            Self::Other => "other",
        }
    }
}

impl FromStr for EntryType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::Name),
            "place" => Ok(Self::Place),
            "other" => Ok(Self::Other),
            _ => Err(ValidationError::InvalidType(s.to_string())),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for EntryType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.code())
    }
}

/// How far a search reaches beyond the requested location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchTier {
    /// The requested location only.
    Specific,
    /// The requested location, then its related chain in order.
    Fallback,
    /// Every location outside the requested location and its chain.
    Extended,
}

impl SearchTier {
    pub const fn token(self) -> &'static str {
        match self {
            Self::Specific => "specific",
            Self::Fallback => "fallback",
            Self::Extended => "extended",
        }
    }
}

impl FromStr for SearchTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "specific" => Ok(Self::Specific),
            "fallback" => Ok(Self::Fallback),
            "extended" => Ok(Self::Extended),
            _ => Err(ValidationError::InvalidSearchTier(s.to_string())),
        }
    }
}

impl fmt::Display for SearchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A validated lookup request.
///
/// Only obtainable through [`SearchQuery::build`], so the location always
/// exists in the generation it was built against and the query is never blank.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    raw: String,
    processed: String,
    location: Arc<Location>,
    entry_type: EntryType,
}

impl SearchQuery {
    /// Validate a request. Checks run in a fixed order and the first failure
    /// wins: entry type, then location, then query text.
    #[instrument(name = "Build SearchQuery", level = "debug", skip(graph))]
    pub fn build(
        raw: &str,
        location_abbr: &str,
        entry_type: &str,
        graph: &LocationGraph,
    ) -> Result<Self, ValidationError> {
        let entry_type = entry_type.parse::<EntryType>().inspect_err(|_| {
            warn!(entry_type, "invalid entry type");
        })?;

        let Some(location) = graph.resolve(location_abbr) else {
            warn!(location_abbr, "invalid location abbreviation");
            return Err(ValidationError::InvalidLocation(location_abbr.to_string()));
        };

        if raw.trim().is_empty() {
            warn!("invalid query (blank)");
            return Err(ValidationError::BlankQuery);
        }

        Ok(Self {
            raw: raw.to_string(),
            processed: raw.to_string(),
            location: Arc::clone(location),
            entry_type,
        })
    }

    /// Apply query replacements. The raw text is kept alongside.
    #[must_use]
    pub fn normalized(self, normalizer: &Normalizer) -> Self {
        let processed = normalizer.normalize(&self.raw);
        Self { processed, ..self }
    }

    /// The query exactly as the client sent it.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The query handed to the line searcher.
    pub fn text(&self) -> &str {
        &self.processed
    }

    pub fn location(&self) -> &Arc<Location> {
        &self.location
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }
}

/// Parse a requested result count.
///
/// Absent, unparsable and zero counts all fall back to `default`.
pub fn parse_limit(raw: Option<&str>, default: NonZeroUsize) -> NonZeroUsize {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<usize>() {
        Ok(n) => NonZeroUsize::new(n).unwrap_or(default),
        Err(e) => {
            warn!(raw, error = %e, "error parsing requested result count");
            default
        }
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum ValidationError {
        #[error("invalid entry type '{0}', should be one of 'name', 'place', or 'other'")]
        InvalidType(String),
        #[error(
            "invalid search type '{0}', should be one of 'specific', 'fallback', or 'extended'"
        )]
        InvalidSearchTier(String),
        #[error("unknown location '{0}'")]
        InvalidLocation(String),
        #[error("query is blank")]
        BlankQuery,
    }

    impl ValidationError {
        pub fn reason(&self) -> &'static str {
            match self {
                Self::InvalidType(_) => "invalid_type",
                Self::InvalidSearchTier(_) => "invalid_search_type",
                Self::InvalidLocation(_) => "invalid_location",
                Self::BlankQuery => "blank_query",
            }
        }
    }
}
