//! Core types for difflens.
//!
//! This crate provides the data model shared by the scanner, the table codec
//! and the comparison engine: snapshots of file records, comparison modes,
//! path filters and configuration.

mod config;
mod error;
mod filter;
mod mode;
pub mod paths;
mod record;
mod snapshot;

pub use config::{DEFAULT_PARTIAL_HASH_BYTES, ScanConfig, ScanConfigBuilder};
pub use error::{PathError, ScanError, ScanWarning, WarningKind};
pub use filter::PathFilter;
pub use mode::{ComparisonMode, DuplicateField};
pub use record::{ContentHash, FileRecord, Fingerprint, NOT_COMPUTED};
pub use snapshot::Snapshot;
