//! Duplicate detection within one snapshot.
//!
//! The snapshot already carries a fingerprint per file, so no content is
//! read here: rows are grouped on the chosen field and singleton groups are
//! dropped.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use difflens_core::{DuplicateField, FileRecord, Fingerprint, Snapshot};

/// The value a duplicate group shares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    Fingerprint(Fingerprint),
    Size(u64),
}

impl GroupKey {
    fn of(record: &FileRecord, field: DuplicateField) -> Self {
        match field {
            DuplicateField::Fingerprint => Self::Fingerprint(record.fingerprint.clone()),
            DuplicateField::Size => Self::Size(record.size_bytes),
        }
    }
}

/// Files sharing one field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub key: GroupKey,

    /// Member rows in input order. Always more than one.
    pub records: Vec<FileRecord>,
}

impl DuplicateGroup {
    /// Get the number of duplicate files.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Space held by all copies but one.
    pub fn wasted_bytes(&self) -> u64 {
        let size = self.records.first().map(|r| r.size_bytes).unwrap_or_default();
        size * self.records.len().saturating_sub(1) as u64
    }
}

/// Results from duplicate analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateReport {
    /// Field the rows were grouped on.
    pub field: DuplicateField,

    /// Groups in order of first occurrence.
    pub groups: Vec<DuplicateGroup>,

    /// Number of rows that belong to some group.
    pub files_with_duplicates: usize,

    /// Total wasted space over all groups.
    pub wasted_bytes: u64,
}

impl DuplicateReport {
    /// Check if any duplicates were found.
    pub fn has_duplicates(&self) -> bool {
        !self.groups.is_empty()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Every member row, group by group.
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.groups.iter().flat_map(|g| g.records.iter())
    }
}

/// Group `snapshot` on `field`, keeping only values seen more than once.
pub fn duplicates(snapshot: &Snapshot, field: DuplicateField) -> DuplicateReport {
    let mut buckets: IndexMap<GroupKey, Vec<FileRecord>> = IndexMap::new();
    for record in snapshot {
        buckets
            .entry(GroupKey::of(record, field))
            .or_default()
            .push(record.clone());
    }

    let groups: Vec<DuplicateGroup> = buckets
        .into_iter()
        .filter(|(_, records)| records.len() > 1)
        .map(|(key, records)| DuplicateGroup { key, records })
        .collect();

    let files_with_duplicates: usize = groups.iter().map(DuplicateGroup::count).sum();
    let wasted_bytes: u64 = groups.iter().map(DuplicateGroup::wasted_bytes).sum();
    debug!(
        target: "difflens::analyze",
        "{} duplicate groups on {field} covering {files_with_duplicates} of {} files",
        groups.len(),
        snapshot.len()
    );

    DuplicateReport {
        field,
        groups,
        files_with_duplicates,
        wasted_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(path: &str, fingerprint: &str, size: u64) -> FileRecord {
        FileRecord::new(path, Fingerprint::new(fingerprint), size)
    }

    #[test]
    fn test_groups_keep_first_occurrence_order() {
        let snapshot = Snapshot::from_records(vec![
            rec("1", "b", 10),
            rec("2", "a", 20),
            rec("3", "b", 10),
            rec("4", "c", 5),
            rec("5", "a", 20),
            rec("6", "a", 20),
        ]);

        let report = duplicates(&snapshot, DuplicateField::Fingerprint);
        assert_eq!(report.group_count(), 2);
        assert_eq!(report.groups[0].key, GroupKey::Fingerprint(Fingerprint::new("b")));
        assert_eq!(report.groups[1].count(), 3);
        assert_eq!(report.files_with_duplicates, 5);
        assert_eq!(report.wasted_bytes, 10 + 40);

        let order: Vec<&str> = report.records().map(|r| r.relative_path.as_str()).collect();
        assert_eq!(order, vec!["1", "3", "2", "5", "6"]);
    }

    #[test]
    fn test_size_field_ignores_fingerprint() {
        let snapshot = Snapshot::from_records(vec![rec("x", "p", 7), rec("y", "q", 7), rec("z", "p", 8)]);

        let by_size = duplicates(&snapshot, DuplicateField::Size);
        assert_eq!(by_size.group_count(), 1);
        assert_eq!(by_size.groups[0].key, GroupKey::Size(7));

        let by_hash = duplicates(&snapshot, DuplicateField::Fingerprint);
        assert_eq!(by_hash.groups[0].records.len(), 2);
        assert_eq!(by_hash.groups[0].records[1].relative_path, "z");
    }

    #[test]
    fn test_unique_snapshot_has_no_groups() {
        let snapshot = Snapshot::from_records(vec![rec("x", "p", 1), rec("y", "q", 1)]);
        let report = duplicates(&snapshot, DuplicateField::Fingerprint);
        assert!(!report.has_duplicates());
        assert_eq!(report.wasted_bytes, 0);
    }
}
