//! Record module - one row of archival metadata

use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

/// A single archival record: named string fields mapped to string values.
///
/// Fields that were never captured are simply absent; renderers show them as
/// empty. Records have no identity of their own, so two records are equal
/// exactly when they hold the same fields with the same values.
///
/// # Examples
///
/// ```
/// use arhiv_domain::Record;
///
/// let mut record = Record::new();
/// record.insert("identifikator", "HR-DAVŽ-69");
/// assert_eq!(record.get("identifikator"), Some("HR-DAVŽ-69"));
/// assert_eq!(record.field_or_empty("naslov"), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, String>);

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Get a field value, if captured
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Get a field value, rendering absent fields as the empty string
    pub fn field_or_empty(&self, field: &str) -> &str {
        self.get(field).unwrap_or("")
    }

    /// Set a field, returning the previous value if there was one
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(field.into(), value.into())
    }

    /// Whether the field has been captured
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Number of captured fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no field has been captured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Captured field names, in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Captured `(field, value)` pairs, in sorted field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Case-insensitive substring search over all values.
    ///
    /// Values are joined with single spaces before matching, so a query may
    /// span two adjacent fields. A blank query matches every record.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }

        let haystack = self
            .0
            .values()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        haystack.contains(&query.to_lowercase())
    }
}

impl From<BTreeMap<String, String>> for Record {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, String);
    type IntoIter = btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:?}", k, v)?;
        }
        write!(f, "}}")
    }
}

/// Keep only the records matching `query` (see [`Record::matches`]).
pub fn filter_records<'a>(records: &'a [Record], query: &str) -> Vec<&'a Record> {
    records.iter().filter(|r| r.matches(query)).collect()
}
