//! Filter state and the cleaning gate between raw form input and everything
//! downstream.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The recognized filter fields
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKey {
    StartDate,
    EndDate,
    Level,
    Keyword,
    LogGroup,
    LogType,
    FilePath,
}

impl FilterKey {
    pub const ALL: [FilterKey; 7] = [
        FilterKey::StartDate,
        FilterKey::EndDate,
        FilterKey::Level,
        FilterKey::Keyword,
        FilterKey::LogGroup,
        FilterKey::LogType,
        FilterKey::FilePath,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StartDate => "startDate",
            Self::EndDate => "endDate",
            Self::Level => "level",
            Self::Keyword => "keyword",
            Self::LogGroup => "logGroup",
            Self::LogType => "logType",
            Self::FilePath => "filePath",
        }
    }

    /// Free-text fields go through the debouncer; structured fields
    /// (dates, level, dropdown selections) apply immediately.
    pub fn is_debounced(&self) -> bool {
        matches!(self, Self::Keyword | Self::FilePath)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The cleaned, canonical set of active filter criteria.
///
/// Invariant: a key present in the state has a non-empty value. Clearing a
/// field removes the key entirely; empty values are never stored. Query
/// construction relies on this contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterState {
    entries: BTreeMap<FilterKey, String>,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.entries.get(&key).map(String::as_str)
    }

    pub fn contains(&self, key: FilterKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Set a field. An empty value removes the key, keeping the
    /// no-empty-values invariant in one place.
    pub fn set(&mut self, key: FilterKey, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: FilterKey) {
        self.entries.remove(&key);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Produce a FilterState from raw form input, where unset fields may be
/// empty or absent. This is the sole gate between UI input and everything
/// downstream; it is idempotent.
pub fn clean_filters<I>(raw: I) -> FilterState
where
    I: IntoIterator<Item = (FilterKey, Option<String>)>,
{
    let mut state = FilterState::new();
    for (key, value) in raw {
        if let Some(value) = value {
            state.set(key, value);
        }
    }
    state
}
