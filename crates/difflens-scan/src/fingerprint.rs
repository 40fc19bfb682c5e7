//! The transient size → hash grouping built during a scan.
//!
//! Level one is keyed by file size. In size-only mode it holds path lists
//! directly. Otherwise it maps `(partial hash, fully hashed?)` keys to either
//! a path list, or in full mode for files above the threshold, a map from
//! full hash to path list.

use std::collections::BTreeMap;

use difflens_core::{ComparisonMode, ContentHash, FileRecord, Fingerprint, ScanError, Snapshot};

use crate::hasher::{Digest, Observation};

/// Second-level key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartialKey {
    pub hash: ContentHash,
    /// The partial hash covered the whole file.
    pub fully_hashed: bool,
}

/// Node under a file size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeNode {
    Leaf(Vec<String>),
    Branch(BTreeMap<PartialKey, PartialNode>),
}

/// Node under a partial-hash key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartialNode {
    Leaf(Vec<String>),
    Branch(BTreeMap<ContentHash, Vec<String>>),
}

/// Grouping of scanned paths by size and content hash.
#[derive(Debug, Clone)]
pub struct FingerprintTree {
    mode: ComparisonMode,
    sizes: BTreeMap<u64, SizeNode>,
    path_count: usize,
}

impl FingerprintTree {
    pub fn new(mode: ComparisonMode) -> Self {
        Self {
            mode,
            sizes: BTreeMap::new(),
            path_count: 0,
        }
    }

    pub fn mode(&self) -> ComparisonMode {
        self.mode
    }

    /// Number of paths recorded.
    pub fn len(&self) -> usize {
        self.path_count
    }

    pub fn is_empty(&self) -> bool {
        self.path_count == 0
    }

    /// Maximum nesting depth for this tree's mode.
    pub fn depth(&self) -> usize {
        match self.mode {
            ComparisonMode::Size => 1,
            ComparisonMode::Partial => 2,
            ComparisonMode::Full => 3,
        }
    }

    pub fn get(&self, size: u64) -> Option<&SizeNode> {
        self.sizes.get(&size)
    }

    /// Record one observation. Only the coordinator calls this.
    pub fn insert(&mut self, observation: Observation) -> Result<(), ScanError> {
        let Observation {
            relative_path,
            size,
            digest,
            ..
        } = observation;

        let admissible = matches!(
            (self.mode, &digest),
            (ComparisonMode::Size, Digest::NotComputed)
                | (ComparisonMode::Partial, Digest::Complete(_) | Digest::Prefix(_))
                | (ComparisonMode::Full, Digest::Complete(_) | Digest::Full { .. })
        );
        if !admissible {
            return Err(inconsistent(&relative_path, format!("{digest:?} under {} mode", self.mode)));
        }

        match digest {
            Digest::NotComputed => {
                match self.sizes.entry(size).or_insert_with(|| SizeNode::Leaf(Vec::new())) {
                    SizeNode::Leaf(paths) => paths.push(relative_path),
                    SizeNode::Branch(_) => {
                        return Err(inconsistent(&relative_path, "size bucket already holds hashes".to_string()));
                    }
                }
            }
            Digest::Complete(hash) | Digest::Prefix(hash) => {
                let key = PartialKey {
                    hash,
                    fully_hashed: matches!(digest, Digest::Complete(_)),
                };
                let partials = self.partials(size, &relative_path)?;
                match partials.entry(key).or_insert_with(|| PartialNode::Leaf(Vec::new())) {
                    PartialNode::Leaf(paths) => paths.push(relative_path),
                    PartialNode::Branch(_) => {
                        return Err(inconsistent(&relative_path, "partial bucket holds full hashes".to_string()));
                    }
                }
            }
            Digest::Full { partial, full } => {
                let key = PartialKey {
                    hash: partial,
                    fully_hashed: false,
                };
                let partials = self.partials(size, &relative_path)?;
                match partials
                    .entry(key)
                    .or_insert_with(|| PartialNode::Branch(BTreeMap::new()))
                {
                    PartialNode::Branch(fulls) => fulls.entry(full).or_default().push(relative_path),
                    PartialNode::Leaf(_) => {
                        return Err(inconsistent(&relative_path, "partial bucket is terminal".to_string()));
                    }
                }
            }
        }

        self.path_count += 1;
        Ok(())
    }

    /// Second level under `size`, created on first use.
    fn partials(&mut self, size: u64, path: &str) -> Result<&mut BTreeMap<PartialKey, PartialNode>, ScanError> {
        match self
            .sizes
            .entry(size)
            .or_insert_with(|| SizeNode::Branch(BTreeMap::new()))
        {
            SizeNode::Branch(partials) => Ok(partials),
            SizeNode::Leaf(_) => Err(inconsistent(path, "size bucket holds unhashed paths".to_string())),
        }
    }

    /// Flatten into one record per path, consuming the tree.
    pub fn into_snapshot(self) -> Snapshot {
        let mut records = Vec::with_capacity(self.path_count);

        for (size, node) in self.sizes {
            match node {
                SizeNode::Leaf(paths) => {
                    records.extend(
                        paths
                            .into_iter()
                            .map(|p| FileRecord::new(p, Fingerprint::not_computed(), size)),
                    );
                }
                SizeNode::Branch(partials) => {
                    for (key, partial) in partials {
                        match partial {
                            PartialNode::Leaf(paths) => {
                                let fingerprint = Fingerprint::from(key.hash);
                                records.extend(
                                    paths
                                        .into_iter()
                                        .map(|p| FileRecord::new(p, fingerprint.clone(), size)),
                                );
                            }
                            PartialNode::Branch(fulls) => {
                                for (full, paths) in fulls {
                                    let fingerprint = Fingerprint::from(full);
                                    records.extend(
                                        paths
                                            .into_iter()
                                            .map(|p| FileRecord::new(p, fingerprint.clone(), size)),
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }

        Snapshot::from_records(records)
    }
}

impl From<FingerprintTree> for Snapshot {
    fn from(tree: FingerprintTree) -> Self {
        tree.into_snapshot()
    }
}

fn inconsistent(path: &str, message: String) -> ScanError {
    ScanError::InconsistentTree {
        path: path.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> ContentHash {
        ContentHash::new([byte; 32])
    }

    fn obs(path: &str, size: u64, digest: Digest) -> Observation {
        Observation {
            relative_path: path.to_string(),
            size,
            digest,
            bytes_read: 0,
        }
    }

    #[test]
    fn test_size_mode_is_one_level() {
        let mut tree = FingerprintTree::new(ComparisonMode::Size);
        tree.insert(obs("a", 10, Digest::NotComputed)).unwrap();
        tree.insert(obs("b", 10, Digest::NotComputed)).unwrap();

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.get(10), Some(&SizeNode::Leaf(vec!["a".into(), "b".into()])));

        let snapshot = tree.into_snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.iter().all(|r| !r.fingerprint.is_computed()));
    }

    #[test]
    fn test_full_mode_grows_third_level_only_for_large_files() {
        let mut tree = FingerprintTree::new(ComparisonMode::Full);
        tree.insert(obs("small", 5, Digest::Complete(hash(1)))).unwrap();
        tree.insert(obs("big1", 9000, Digest::Full { partial: hash(2), full: hash(3) })).unwrap();
        tree.insert(obs("big2", 9000, Digest::Full { partial: hash(2), full: hash(4) })).unwrap();

        let Some(SizeNode::Branch(partials)) = tree.get(9000) else {
            panic!("expected branch");
        };
        let key = PartialKey { hash: hash(2), fully_hashed: false };
        let Some(PartialNode::Branch(fulls)) = partials.get(&key) else {
            panic!("expected full-hash branch");
        };
        assert_eq!(fulls.len(), 2);

        let snapshot = tree.into_snapshot();
        let fingerprint_of = |path: &str| {
            snapshot
                .iter()
                .find(|r| r.relative_path == path)
                .map(|r| r.fingerprint.clone())
                .unwrap()
        };
        assert_eq!(fingerprint_of("small"), Fingerprint::from(hash(1)));
        assert_eq!(fingerprint_of("big1"), Fingerprint::from(hash(3)));
        assert_eq!(fingerprint_of("big2"), Fingerprint::from(hash(4)));
    }

    #[test]
    fn test_partial_mode_leaves_large_files_at_second_level() {
        let mut tree = FingerprintTree::new(ComparisonMode::Partial);
        tree.insert(obs("big", 9000, Digest::Prefix(hash(5)))).unwrap();

        let Some(SizeNode::Branch(partials)) = tree.get(9000) else {
            panic!("expected branch");
        };
        let key = PartialKey { hash: hash(5), fully_hashed: false };
        assert_eq!(partials.get(&key), Some(&PartialNode::Leaf(vec!["big".into()])));
    }

    #[test]
    fn test_mismatched_digest_is_rejected() {
        let mut tree = FingerprintTree::new(ComparisonMode::Partial);
        let err = tree
            .insert(obs("x", 1, Digest::Full { partial: hash(1), full: hash(2) }))
            .unwrap_err();
        assert!(matches!(err, ScanError::InconsistentTree { .. }));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_every_path_flattens_once() {
        let mut tree = FingerprintTree::new(ComparisonMode::Full);
        for i in 0..50u8 {
            let digest = if i % 2 == 0 {
                Digest::Complete(hash(i % 5))
            } else {
                Digest::Full { partial: hash(i % 3), full: hash(i % 7) }
            };
            tree.insert(obs(&format!("f{i}"), u64::from(i % 4), digest)).unwrap();
        }
        assert_eq!(tree.len(), 50);

        let snapshot = tree.into_snapshot();
        assert_eq!(snapshot.len(), 50);
        assert_eq!(snapshot.paths().len(), 50);
    }
}
