//! File records and the fingerprint tokens they carry.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Token stored in the fingerprint column when no content was hashed.
pub const NOT_COMPUTED: &str = "not_computed";

/// BLAKE3 content hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the hash as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Opaque equality signal for a file.
///
/// Either a hex digest, a raw size, or the [`NOT_COMPUTED`] sentinel. Two
/// records are considered to have the same content iff their fingerprints
/// compare equal, so the token is kept exactly as produced or read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an arbitrary token, e.g. a value read back from disk.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The sentinel used in size-only mode.
    pub fn not_computed() -> Self {
        Self(NOT_COMPUTED.to_string())
    }

    /// Whether this is anything other than the sentinel.
    pub fn is_computed(&self) -> bool {
        self.0 != NOT_COMPUTED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<ContentHash> for Fingerprint {
    fn from(hash: ContentHash) -> Self {
        Self(hash.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the scanned root.
    pub relative_path: String,
    /// Content fingerprint under the snapshot's mode.
    pub fingerprint: Fingerprint,
    /// File size in bytes.
    pub size_bytes: u64,
}

impl FileRecord {
    pub fn new(relative_path: impl Into<String>, fingerprint: Fingerprint, size_bytes: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            fingerprint,
            size_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_hex() {
        let hash = ContentHash::new([0xab; 32]);
        assert_eq!(hash.to_hex().len(), 64);
        assert!(hash.to_hex().starts_with("abab"));
    }

    #[test]
    fn test_fingerprint_sentinel() {
        let fp = Fingerprint::not_computed();
        assert!(!fp.is_computed());
        assert_eq!(fp.as_str(), NOT_COMPUTED);
        assert!(Fingerprint::new("12").is_computed());
    }

    #[test]
    fn test_fingerprint_from_hash() {
        let fp = Fingerprint::from(ContentHash::new([0x01; 32]));
        assert_eq!(fp.as_str(), "01".repeat(32));
    }
}
