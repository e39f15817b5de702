use std::collections::BTreeMap;

use indexbrain_data::KeyValueRecord;

/// A "could be" hint: when `key` appears in a query the client may also be
/// looking for `val`.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedTerm {
    pub key: String,
    pub val: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelatedTerms {
    terms: BTreeMap<String, String>,
}

impl RelatedTerms {
    pub fn from_records(records: impl IntoIterator<Item = KeyValueRecord>) -> Self {
        Self {
            terms: records
                .into_iter()
                .filter(|r| !r.key.is_empty())
                .map(|r| (r.key, r.val))
                .collect(),
        }
    }

    /// Every hint whose key occurs in `query`, in key order.
    pub fn lookup(&self, query: &str) -> Vec<RelatedTerm> {
        self.terms
            .iter()
            .filter(|(key, _)| query.contains(key.as_str()))
            .map(|(key, val)| RelatedTerm {
                key: key.clone(),
                val: val.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
