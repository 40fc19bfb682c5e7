//! Comparison engine for difflens.
//!
//! All operations are pure functions of their input snapshots:
//!
//! - **removed / added** - paths present on one side only
//! - **modified** - shared paths whose fingerprints differ
//! - **duplicates** - rows sharing a fingerprint or size within one snapshot
//!
//! ```rust,ignore
//! use difflens_analyze::{added, duplicates, modified, removed};
//!
//! let gone = removed(&old, &new)?;
//! let fresh = added(&old, &new)?;
//! let changed = modified(&old, &new)?;
//!
//! let report = duplicates(&new, ComparisonMode::Full.duplicate_field());
//! println!("Found {} duplicate groups", report.group_count());
//! ```
//!
//! The joins require `relative_path` to be unique on both sides and fail
//! with [`CompareError::DuplicatePath`] otherwise.

mod compare;
mod duplicates;

pub use compare::{CompareError, DiffResult, Side, added, diff, modified, removed};
pub use duplicates::{DuplicateGroup, DuplicateReport, GroupKey, duplicates};

// Re-export core types
pub use difflens_core::{DuplicateField, FileRecord, Snapshot};
