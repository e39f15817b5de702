//! Boundary to wherever the location tables are persisted.
//!
//! The lookup service only ever reads these tables, with one exception: when a
//! corpus folder appears on disk that the store does not know about yet, the
//! location is inserted so that it gets a stable identifier.
use std::io::Read;

use itertools::Itertools;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    error::Result,
    records::{KeyValueRecord, LocationId, LocationRecord, RelatedRecord, StoreSnapshot},
};

pub trait LocationStore: Send + Sync {
    /// All persisted locations, in no particular order.
    fn locations(&self) -> Result<Vec<LocationRecord>>;

    /// Persist a new location and return the identifier it was assigned.
    fn insert_location(&self, abbr: &str, name: &str, is_language: bool) -> Result<LocationId>;

    /// All related-location rows, ordered by `(location_id, sort)`.
    fn related(&self) -> Result<Vec<RelatedRecord>>;

    /// Literal query substitutions.
    fn replacements(&self) -> Result<Vec<KeyValueRecord>>;

    /// "Could be" hints keyed by a substring of the query.
    fn related_terms(&self) -> Result<Vec<KeyValueRecord>>;

    /// Free-form message shown to clients, if one is configured.
    fn message(&self) -> Result<Option<String>>;
}

/// In-memory [`LocationStore`], mostly for tests and fixtures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<StoreSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            state: Mutex::new(snapshot),
        }
    }

    /// Load a snapshot from its JSON representation.
    pub fn from_json_reader(reader: impl Read) -> Result<Self> {
        let snapshot: StoreSnapshot = serde_json::from_reader(reader)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().clone()
    }

    pub fn add_related(&self, location_id: LocationId, related_id: LocationId, sort: i64) {
        self.state.lock().related.push(RelatedRecord {
            location_id,
            related_id,
            sort,
        });
    }

    pub fn add_replacement(&self, key: impl Into<String>, val: impl Into<String>) {
        self.state
            .lock()
            .replacements
            .push(KeyValueRecord::new(key, val));
    }

    pub fn add_related_term(&self, key: impl Into<String>, val: impl Into<String>) {
        self.state
            .lock()
            .related_terms
            .push(KeyValueRecord::new(key, val));
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.state.lock().message = Some(message.into());
    }
}

impl LocationStore for MemoryStore {
    fn locations(&self) -> Result<Vec<LocationRecord>> {
        Ok(self.state.lock().locations.clone())
    }

    fn insert_location(&self, abbr: &str, name: &str, is_language: bool) -> Result<LocationId> {
        let mut state = self.state.lock();
        let next = state
            .locations
            .iter()
            .map(|l| l.id.0)
            .max()
            .map_or(1, |max| max + 1);
        let id = LocationId(next);
        state.locations.push(LocationRecord {
            id,
            abbr: abbr.to_string(),
            name: name.to_string(),
            is_language,
        });
        debug!(%id, abbr, "inserted location");
        Ok(id)
    }

    fn related(&self) -> Result<Vec<RelatedRecord>> {
        // Stable sort: rows sharing a sort key keep insertion order.
        Ok(self
            .state
            .lock()
            .related
            .iter()
            .cloned()
            .sorted_by_key(|r| (r.location_id, r.sort))
            .collect())
    }

    fn replacements(&self) -> Result<Vec<KeyValueRecord>> {
        Ok(self.state.lock().replacements.clone())
    }

    fn related_terms(&self) -> Result<Vec<KeyValueRecord>> {
        Ok(self.state.lock().related_terms.clone())
    }

    fn message(&self) -> Result<Option<String>> {
        Ok(self.state.lock().message.clone())
    }
}
