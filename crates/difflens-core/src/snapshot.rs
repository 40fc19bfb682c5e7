//! Flat, point-in-time tables of file records.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::record::FileRecord;

/// An ordered collection of [`FileRecord`]s.
///
/// Row order carries no meaning. `relative_path` is expected to be unique,
/// but that is only checked on demand: a snapshot concatenated from several
/// volumes may legitimately repeat a path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: Vec<FileRecord>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<FileRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: FileRecord) {
        self.records.push(record);
    }

    /// Append all rows of `other`, keeping both internal orders.
    pub fn append(&mut self, other: Snapshot) {
        self.records.extend(other.records);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[FileRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<FileRecord> {
        self.records
    }

    /// Set of relative paths present in this snapshot.
    pub fn paths(&self) -> HashSet<&str> {
        self.records.iter().map(|r| r.relative_path.as_str()).collect()
    }

    /// Paths occurring more than once, with their multiplicity, in order of
    /// first occurrence.
    pub fn duplicate_paths(&self) -> Vec<(&str, usize)> {
        let mut counts: IndexMap<&str, usize> = IndexMap::new();
        for record in &self.records {
            *counts.entry(record.relative_path.as_str()).or_default() += 1;
        }
        counts.into_iter().filter(|(_, n)| *n > 1).collect()
    }

    /// Sum of `size_bytes` over all rows.
    pub fn total_size(&self) -> u64 {
        self.records.iter().map(|r| r.size_bytes).sum()
    }
}

impl FromIterator<FileRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Snapshot {
    type Item = FileRecord;
    type IntoIter = std::vec::IntoIter<FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
