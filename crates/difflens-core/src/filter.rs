//! Exclusion rules for directories and file extensions.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Decides which directories and files are left out of a scan.
///
/// Directory rules are literal string prefixes of the path relative to the
/// scan root. `foo` therefore also excludes `foobar/`; there is no
/// path-boundary matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathFilter {
    excluded_paths: Vec<String>,
    excluded_extensions: Vec<String>,
}

impl PathFilter {
    /// Build a filter from raw user input.
    ///
    /// Extensions lose a leading `*` (`*.nfo` becomes `.nfo`). Paths lose a
    /// leading `./` or `.` and a trailing `/`. Both lists are deduplicated.
    pub fn new<E, P>(extensions: E, paths: P) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        let excluded_extensions: IndexSet<String> = extensions
            .into_iter()
            .map(|e| normalize_extension(e.as_ref()).to_string())
            .collect();

        let mut excluded_paths = IndexSet::new();
        for raw in paths {
            let normalized = normalize_path_prefix(raw.as_ref());
            if normalized.is_empty() {
                // An empty prefix would match every directory, the root included.
                warn!(target: "difflens::filter", "Ignoring exclusion rule {:?}, it names the scan root", raw.as_ref());
                continue;
            }
            excluded_paths.insert(normalized.to_string());
        }

        let filter = Self {
            excluded_paths: excluded_paths.into_iter().collect(),
            excluded_extensions: excluded_extensions.into_iter().collect(),
        };
        info!(
            target: "difflens::filter",
            "PathFilter initialized with excluded dirs {:?} and excluded extensions {:?}",
            filter.excluded_paths, filter.excluded_extensions
        );
        filter
    }

    /// Whether `relative_path` starts with any excluded prefix.
    pub fn is_excluded_dir(&self, relative_path: &str) -> bool {
        match self.excluded_paths.iter().find(|p| relative_path.starts_with(p.as_str())) {
            Some(rule) => {
                info!(target: "difflens::filter", "Directory {relative_path} matched exclusion rule {rule}, skipping");
                true
            }
            None => false,
        }
    }

    /// Whether `file_name` ends with any excluded extension.
    pub fn has_excluded_extension(&self, file_name: &str) -> bool {
        match self.excluded_extensions.iter().find(|e| file_name.ends_with(e.as_str())) {
            Some(rule) => {
                debug!(target: "difflens::filter", "File {file_name} matched exclusion rule {rule}, skipping");
                true
            }
            None => false,
        }
    }

    pub fn excluded_paths(&self) -> &[String] {
        &self.excluded_paths
    }

    pub fn excluded_extensions(&self) -> &[String] {
        &self.excluded_extensions
    }

    /// Whether the filter excludes nothing.
    pub fn is_empty(&self) -> bool {
        self.excluded_paths.is_empty() && self.excluded_extensions.is_empty()
    }
}

fn normalize_extension(raw: &str) -> &str {
    raw.strip_prefix('*').unwrap_or(raw)
}

fn normalize_path_prefix(raw: &str) -> &str {
    let trimmed = raw
        .strip_prefix("./")
        .or_else(|| raw.strip_prefix('.'))
        .unwrap_or(raw);
    trimmed.strip_suffix('/').unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn test_extension_normalization() {
        let filter = PathFilter::new(["*.nfo", ".nfo", ".tmp"], NONE);
        assert_eq!(filter.excluded_extensions(), &[".nfo".to_string(), ".tmp".to_string()]);
        assert!(filter.has_excluded_extension("movie.nfo"));
        assert!(filter.has_excluded_extension("a.tmp"));
        assert!(!filter.has_excluded_extension("a.txt"));
    }

    #[test]
    fn test_path_normalization() {
        let filter = PathFilter::new(NONE, ["./foo/bar/", ".cache", "baz/", "baz"]);
        assert_eq!(
            filter.excluded_paths(),
            &["foo/bar".to_string(), "cache".to_string(), "baz".to_string()]
        );
    }

    #[test]
    fn test_prefix_match_is_literal() {
        let filter = PathFilter::new(NONE, ["foo"]);
        assert!(filter.is_excluded_dir("foo"));
        assert!(filter.is_excluded_dir("foo/sub"));
        assert!(filter.is_excluded_dir("foobar"));
        assert!(!filter.is_excluded_dir("bar/foo"));
    }

    #[test]
    fn test_root_rule_is_dropped() {
        let filter = PathFilter::new(NONE, [".", "./", "/"]);
        assert!(filter.is_empty());
        assert!(!filter.is_excluded_dir("anything"));
    }
}
