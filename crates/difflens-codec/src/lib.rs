//! Persisted snapshot tables for difflens.
//!
//! Tables are UTF-8, tab-separated, with a header row. Every non-numeric
//! field is double-quoted and embedded tabs, quotes and backslashes are
//! escaped with a backslash, so paths survive a write/read cycle unchanged.
//!
//! ```rust,ignore
//! use difflens_codec::SnapshotCodec;
//! use difflens_core::ComparisonMode;
//!
//! let codec = SnapshotCodec::new(ComparisonMode::Full);
//! codec.write_snapshot(&snapshot, Path::new("hashes.tsv"))?;
//! let again = codec.read_snapshot(Path::new("hashes.tsv"))?;
//! ```

mod error;
mod table;

pub use error::CodecError;
pub use table::{RELATIVE_PATH, SIZE_BYTES, SnapshotCodec};
