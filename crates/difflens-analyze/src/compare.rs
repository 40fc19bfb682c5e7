//! Path-keyed joins between two snapshots.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use tracing::{debug, error};

use difflens_core::{FileRecord, Snapshot};

/// Which input of a comparison a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Original,
    Comparator,
}

/// Errors from joining two snapshots.
#[derive(Debug, Error)]
pub enum CompareError {
    /// A path occurs more than once in one input, so a one-to-one join on
    /// `relative_path` is impossible.
    #[error("relative_path {path:?} appears {count} times in the {side} snapshot; paths must be unique to compare")]
    DuplicatePath { side: Side, path: String, count: usize },
}

/// Removed, added and modified relations between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    /// In the original but not the comparator.
    pub removed: Snapshot,
    /// In the comparator but not the original.
    pub added: Snapshot,
    /// In both, with differing fingerprints.
    pub modified: Vec<String>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.modified.is_empty()
    }
}

/// Index of one side, keyed by path.
fn unique_index(snapshot: &Snapshot, side: Side) -> Result<HashMap<&str, &FileRecord>, CompareError> {
    let mut index = HashMap::with_capacity(snapshot.len());
    for record in snapshot {
        if index.insert(record.relative_path.as_str(), record).is_some() {
            let count = snapshot
                .iter()
                .filter(|r| r.relative_path == record.relative_path)
                .count();
            error!(
                target: "difflens::analyze",
                "Path {} is not unique in the {side} snapshot ({count} rows)",
                record.relative_path
            );
            return Err(CompareError::DuplicatePath {
                side,
                path: record.relative_path.clone(),
                count,
            });
        }
    }
    Ok(index)
}

/// Rows of `left` whose path is absent from `right`, in `left` order.
fn unmatched(left: &Snapshot, left_side: Side, right: &Snapshot, right_side: Side) -> Result<Snapshot, CompareError> {
    unique_index(left, left_side)?;
    let right_index = unique_index(right, right_side)?;

    Ok(left
        .iter()
        .filter(|r| !right_index.contains_key(r.relative_path.as_str()))
        .cloned()
        .collect())
}

/// Files in `original` that are absent from `comparator`.
///
/// Rows keep `original`'s fingerprint and size. Both inputs must have
/// unique paths.
pub fn removed(original: &Snapshot, comparator: &Snapshot) -> Result<Snapshot, CompareError> {
    let result = unmatched(original, Side::Original, comparator, Side::Comparator)?;
    debug!(target: "difflens::analyze", "{} of {} files removed", result.len(), original.len());
    Ok(result)
}

/// Files in `comparator` that are absent from `original`; `removed` with
/// the inputs swapped.
pub fn added(original: &Snapshot, comparator: &Snapshot) -> Result<Snapshot, CompareError> {
    let result = unmatched(comparator, Side::Comparator, original, Side::Original)?;
    debug!(target: "difflens::analyze", "{} of {} files added", result.len(), comparator.len());
    Ok(result)
}

/// Paths present in both inputs whose fingerprints differ, in `original`
/// order.
pub fn modified(original: &Snapshot, comparator: &Snapshot) -> Result<Vec<String>, CompareError> {
    unique_index(original, Side::Original)?;
    let comparator_index = unique_index(comparator, Side::Comparator)?;

    let result: Vec<String> = original
        .iter()
        .filter(|r| {
            comparator_index
                .get(r.relative_path.as_str())
                .is_some_and(|other| other.fingerprint != r.fingerprint)
        })
        .map(|r| r.relative_path.clone())
        .collect();
    debug!(target: "difflens::analyze", "{} files modified", result.len());
    Ok(result)
}

/// All three relations at once.
pub fn diff(original: &Snapshot, comparator: &Snapshot) -> Result<DiffResult, CompareError> {
    Ok(DiffResult {
        removed: removed(original, comparator)?,
        added: added(original, comparator)?,
        modified: modified(original, comparator)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use difflens_core::Fingerprint;

    fn snap(rows: &[(&str, &str)]) -> Snapshot {
        rows.iter()
            .map(|(p, f)| FileRecord::new(*p, Fingerprint::new(*f), 1))
            .collect()
    }

    fn paths(snapshot: &Snapshot) -> Vec<&str> {
        snapshot.iter().map(|r| r.relative_path.as_str()).collect()
    }

    #[test]
    fn test_old_new_scenario() {
        let old = snap(&[("x", "1"), ("y", "2")]);
        let new = snap(&[("y", "3"), ("z", "4")]);

        assert_eq!(paths(&removed(&old, &new).unwrap()), vec!["x"]);
        assert_eq!(paths(&added(&old, &new).unwrap()), vec!["z"]);
        assert_eq!(modified(&old, &new).unwrap(), vec!["y".to_string()]);
    }

    #[test]
    fn test_removed_projects_original_side() {
        let old = Snapshot::from_records(vec![FileRecord::new("gone", Fingerprint::new("aa"), 77)]);
        let result = removed(&old, &Snapshot::new()).unwrap();
        assert_eq!(result.records(), old.records());
    }

    #[test]
    fn test_identical_snapshots_have_no_diff() {
        let s = snap(&[("a", "1"), ("b", "2")]);
        assert!(diff(&s, &s.clone()).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_path_is_fatal_for_joins() {
        let dup = snap(&[("a", "1"), ("a", "2"), ("b", "3")]);
        let clean = snap(&[("a", "1")]);

        let err = removed(&dup, &clean).unwrap_err();
        assert!(matches!(
            err,
            CompareError::DuplicatePath { side: Side::Original, ref path, count: 2 } if path == "a"
        ));

        let err = added(&dup, &clean).unwrap_err();
        assert!(matches!(err, CompareError::DuplicatePath { side: Side::Original, .. }));

        let err = modified(&clean, &dup).unwrap_err();
        assert!(matches!(err, CompareError::DuplicatePath { side: Side::Comparator, .. }));
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let old = snap(&[("x", "1")]);
        let new = snap(&[("x", "2")]);
        let before = (old.clone(), new.clone());
        diff(&old, &new).unwrap();
        assert_eq!((old, new), before);
    }
}
