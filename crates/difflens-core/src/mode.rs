//! Comparison modes and the on-disk column each one owns.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Which fingerprint layer is authoritative for a scan or a table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonMode {
    /// File size only; no content is read.
    #[strum(serialize = "file-size")]
    Size,
    /// Hash of the first `partial_hash_bytes` of each file.
    #[strum(serialize = "partial-hash")]
    Partial,
    /// Hash of the entire file content.
    #[default]
    #[strum(serialize = "full-hash")]
    Full,
}

impl ComparisonMode {
    /// Name of the fingerprint column in persisted tables.
    ///
    /// Used identically by the writer and the reader, so a table written
    /// under one mode can only be read back under the same mode.
    pub fn column_name(self) -> &'static str {
        match self {
            ComparisonMode::Size => "file_size",
            ComparisonMode::Partial => "partial_hash",
            ComparisonMode::Full => "full_hash",
        }
    }

    /// Field used to group duplicates under this mode.
    pub fn duplicate_field(self) -> DuplicateField {
        match self {
            ComparisonMode::Size => DuplicateField::Size,
            ComparisonMode::Partial | ComparisonMode::Full => DuplicateField::Fingerprint,
        }
    }

    /// Whether file content is read at all.
    pub fn reads_content(self) -> bool {
        !matches!(self, ComparisonMode::Size)
    }
}

/// Record field that duplicate detection groups on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum DuplicateField {
    /// The mode-specific fingerprint token.
    #[strum(serialize = "fingerprint")]
    Fingerprint,
    /// The file size in bytes.
    #[strum(serialize = "size_bytes")]
    Size,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_column_names_are_distinct() {
        let names: HashSet<_> = ComparisonMode::iter().map(|m| m.column_name()).collect();
        assert_eq!(names.len(), 3);
        assert!(!names.contains("size_bytes"));
        assert!(!names.contains("relative_path"));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(ComparisonMode::from_str("full-hash").unwrap(), ComparisonMode::Full);
        assert_eq!(ComparisonMode::from_str("partial-hash").unwrap(), ComparisonMode::Partial);
        assert_eq!(ComparisonMode::from_str("file-size").unwrap(), ComparisonMode::Size);
        assert!(ComparisonMode::from_str("sha1").is_err());
        assert_eq!(ComparisonMode::Partial.to_string(), "partial-hash");
    }

    #[test]
    fn test_duplicate_field() {
        assert_eq!(ComparisonMode::Size.duplicate_field(), DuplicateField::Size);
        assert_eq!(ComparisonMode::Full.duplicate_field(), DuplicateField::Fingerprint);
        assert!(!ComparisonMode::Size.reads_content());
    }
}
