use std::collections::BTreeMap;

use indexbrain_data::KeyValueRecord;
use tracing::warn;

/// Literal substitutions applied to a query before it is searched, typically
/// to widen a character into a regular expression alternation
/// (`"ae"` → `"(ae|æ)"`).
///
/// Every key is applied once, replacing all of its occurrences, in byte-wise
/// key order. Applying the normalizer to its own output is a no-op only when no
/// key occurs inside any substitution value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalizer {
    substitutions: BTreeMap<String, String>,
}

impl Normalizer {
    pub fn new<K, V>(mapping: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut substitutions = BTreeMap::new();
        for (key, val) in mapping {
            let key = key.into();
            // An empty key would match between every character.
            if key.is_empty() {
                warn!("ignoring replacement with an empty key");
                continue;
            }
            substitutions.insert(key, val.into());
        }
        Self { substitutions }
    }

    pub fn from_records(records: impl IntoIterator<Item = KeyValueRecord>) -> Self {
        Self::new(records.into_iter().map(|r| (r.key, r.val)))
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.substitutions
            .iter()
            .fold(raw.to_string(), |query, (key, val)| {
                if query.contains(key.as_str()) {
                    query.replace(key.as_str(), val)
                } else {
                    query
                }
            })
    }

    pub fn len(&self) -> usize {
        self.substitutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }
}
