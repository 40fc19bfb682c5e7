//! Tiered per-file hashing.
//!
//! A file is opened once. The first `threshold` bytes are hashed; if that
//! covered the whole file the digest is final. Otherwise, in full mode, the
//! same hasher keeps consuming the same stream until EOF, so the prefix is
//! never read twice.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use blake3::Hasher;

use difflens_core::{ComparisonMode, ContentHash, ScanError};

/// Bytes read from a file per iteration.
const READ_BLOCK_SIZE: usize = 64 * 1024;

/// What was learned about a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Digest {
    /// Size-only mode: content was never read.
    NotComputed,
    /// The prefix read covered the whole file, so this is also the full hash.
    Complete(ContentHash),
    /// Only the prefix was hashed.
    Prefix(ContentHash),
    /// Prefix hash plus the hash of the entire stream.
    Full { partial: ContentHash, full: ContentHash },
}

/// Independent result of fingerprinting one file.
///
/// Workers produce these without touching shared state; the coordinator
/// inserts them into the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub relative_path: String,
    pub size: u64,
    pub digest: Digest,
    /// Bytes actually fed to the hasher.
    pub bytes_read: u64,
}

/// Hashes files according to a [`ComparisonMode`].
#[derive(Debug, Clone, Copy)]
pub struct TieredHasher {
    mode: ComparisonMode,
    threshold: u64,
}

impl TieredHasher {
    pub fn new(mode: ComparisonMode, threshold: u64) -> Self {
        Self { mode, threshold }
    }

    /// Fingerprint the file at `path`, whose size is already known.
    ///
    /// In size-only mode the file is not opened.
    pub fn observe(
        &self,
        path: &Path,
        relative_path: String,
        size: u64,
    ) -> Result<Observation, ScanError> {
        let (digest, bytes_read) = if self.mode.reads_content() {
            let file = File::open(path).map_err(|e| ScanError::io(path, e))?;
            self.hash_reader(file, size).map_err(|e| ScanError::io(path, e))?
        } else {
            (Digest::NotComputed, 0)
        };

        Ok(Observation {
            relative_path,
            size,
            digest,
            bytes_read,
        })
    }

    /// Hash a stream of `size` bytes. Returns the digest and the number of
    /// bytes consumed.
    pub fn hash_reader<R: Read>(&self, mut reader: R, size: u64) -> io::Result<(Digest, u64)> {
        if !self.mode.reads_content() {
            return Ok((Digest::NotComputed, 0));
        }

        let mut hasher = Hasher::new();
        let mut buffer = vec![0u8; READ_BLOCK_SIZE];

        let mut bytes_read = feed(&mut reader, &mut hasher, &mut buffer, self.threshold)?;
        let partial = ContentHash::new(*hasher.finalize().as_bytes());

        if size <= self.threshold {
            return Ok((Digest::Complete(partial), bytes_read));
        }

        match self.mode {
            ComparisonMode::Full => {
                bytes_read += feed(&mut reader, &mut hasher, &mut buffer, u64::MAX)?;
                let full = ContentHash::new(*hasher.finalize().as_bytes());
                Ok((Digest::Full { partial, full }, bytes_read))
            }
            _ => Ok((Digest::Prefix(partial), bytes_read)),
        }
    }
}

/// Stream up to `limit` bytes from `reader` into `hasher`.
fn feed<R: Read>(
    reader: &mut R,
    hasher: &mut Hasher,
    buffer: &mut [u8],
    limit: u64,
) -> io::Result<u64> {
    let mut consumed: u64 = 0;
    while consumed < limit {
        let want = (limit - consumed).min(buffer.len() as u64) as usize;
        let n = match reader.read(&mut buffer[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..n]);
        consumed += n as u64;
    }
    Ok(consumed)
}
