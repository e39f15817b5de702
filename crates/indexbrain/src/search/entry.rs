use std::sync::Arc;

use crate::{location::Location, query::EntryType};

/// One search result: a matching corpus line and the location it came from.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub entry_type: EntryType,
    pub location: Arc<Location>,
}

impl Entry {
    pub fn new(name: impl Into<String>, entry_type: EntryType, location: Arc<Location>) -> Self {
        Self {
            name: name.into(),
            entry_type,
            location,
        }
    }
}
