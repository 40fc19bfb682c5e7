//! Fingerprinting scanner for difflens.
//!
//! This crate walks a directory with jwalk and assigns every regular file a
//! fingerprint using tiered BLAKE3 hashing.
//!
//! # Overview
//!
//! - **Size first**: files are grouped by size before any content is read
//! - **Partial hashing**: the first `partial_hash_bytes` of each file are hashed
//! - **Full hashing**: larger files continue from the same read, never twice
//! - **Progress updates** via tracing and a broadcast channel
//!
//! # Example
//!
//! ```rust,ignore
//! use difflens_scan::{ScanConfig, TieredScanner};
//!
//! let config = ScanConfig::new("/path/to/scan");
//! let result = TieredScanner::new().scan(&config)?;
//!
//! println!("{} files fingerprinted", result.stats.files_fingerprinted);
//! let snapshot = result.into_snapshot();
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,ignore
//! let scanner = TieredScanner::new();
//! let mut progress_rx = scanner.subscribe();
//!
//! std::thread::spawn(move || {
//!     while let Ok(progress) = progress_rx.blocking_recv() {
//!         println!("{progress}");
//!     }
//! });
//! ```

mod fingerprint;
mod hasher;
mod progress;
mod scanner;

pub use fingerprint::{FingerprintTree, PartialKey, PartialNode, SizeNode};
pub use hasher::{Digest, Observation, TieredHasher};
pub use progress::{ScanProgress, ScanStats};
pub use scanner::{ScanResult, TieredScanner};

// Re-export core types for convenience
pub use difflens_core::{ComparisonMode, ScanConfig, ScanError, ScanWarning, Snapshot, WarningKind};
