//! JWalk-based fingerprinting scanner.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use jwalk::{Parallelism, WalkDir};
use rayon::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use difflens_core::paths::resolve_directory;
use difflens_core::{ComparisonMode, PathFilter, ScanConfig, ScanError, ScanWarning, Snapshot};

use crate::fingerprint::FingerprintTree;
use crate::hasher::{Observation, TieredHasher};
use crate::progress::{ProgressTracker, ScanProgress, ScanStats};

/// Files handed to the worker pool at a time.
const HASH_BATCH_SIZE: usize = 256;

/// Outcome of a completed scan.
#[derive(Debug)]
pub struct ScanResult {
    pub tree: FingerprintTree,
    /// Absolute root that was walked.
    pub root_path: PathBuf,
    pub mode: ComparisonMode,
    pub stats: ScanStats,
    pub warnings: Vec<ScanWarning>,
    pub scan_duration: Duration,
}

impl ScanResult {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Flatten the tree into one record per fingerprinted file.
    pub fn into_snapshot(self) -> Snapshot {
        self.tree.into_snapshot()
    }
}

/// A file admitted for fingerprinting but not hashed yet.
struct PendingFile {
    path: PathBuf,
    relative_path: String,
    size: u64,
}

/// Scanner that walks a directory and fingerprints every regular file.
pub struct TieredScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl TieredScanner {
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self { progress_tx }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan `config.root` and build its fingerprint tree.
    pub fn scan(&self, config: &ScanConfig) -> Result<ScanResult, ScanError> {
        let start = Instant::now();
        let root_path = resolve_directory(&config.root)?;
        // A symlinked root would otherwise be walked as a link entry.
        let root_path = root_path.canonicalize().map_err(|e| ScanError::io(&root_path, e))?;
        debug!(
            target: "difflens::scan",
            "Mode {}, hashing the first {} of each file",
            config.mode,
            humansize::format_size(config.partial_hash_bytes, humansize::DECIMAL)
        );

        let filter = Arc::new(config.path_filter());
        let hasher = TieredHasher::new(config.mode, config.partial_hash_bytes);
        let pool = HashPool::new(config.threads)?;
        let dirs_excluded = Arc::new(AtomicU64::new(0));

        let mut tree = FingerprintTree::new(config.mode);
        let mut stats = ScanStats::default();
        let mut warnings = Vec::new();
        let mut tracker = ProgressTracker::new(config.progress_interval(), config.progress_interval_files);
        let mut pending: Vec<PendingFile> = Vec::new();

        let walker = self.walker(config.threads, &root_path, Arc::clone(&filter), Arc::clone(&dirs_excluded));

        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root_path.clone());
                    let warning = ScanWarning::read_dir_error(path, &err);
                    warn!(target: "difflens::scan", "{}", warning.message);
                    warnings.push(warning);
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                stats.dirs_seen += 1;
                continue;
            }

            let now = Instant::now();
            if tracker.due(now, stats.files_seen) {
                self.report(stats.progress(tracker.elapsed()));
                tracker.mark(now, stats.files_seen);
            }
            stats.files_seen += 1;

            let path = entry.path();
            if file_type.is_symlink() {
                let warning = ScanWarning::symlink(&path);
                warn!(target: "difflens::scan", "{}", warning.message);
                warnings.push(warning);
                stats.symlinks_skipped += 1;
                continue;
            }
            if !file_type.is_file() {
                debug!(target: "difflens::scan", "Skipping special file {}", path.display());
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if filter.has_excluded_extension(&file_name) {
                stats.files_excluded += 1;
                continue;
            }

            let relative_path = relative_to(&path, &root_path);
            let size = fs::symlink_metadata(&path)
                .map_err(|e| ScanError::io(&path, e))?
                .len();
            stats.bytes_total += size;

            let file = PendingFile { path, relative_path, size };
            if pool.is_parallel() && config.mode.reads_content() {
                pending.push(file);
                if pending.len() >= HASH_BATCH_SIZE {
                    let batch = pool.hash_batch(&hasher, std::mem::take(&mut pending))?;
                    record_all(&mut tree, &mut stats, batch)?;
                }
            } else {
                let observation = hasher.observe(&file.path, file.relative_path, file.size)?;
                record(&mut tree, &mut stats, observation)?;
            }
        }

        if !pending.is_empty() {
            let batch = pool.hash_batch(&hasher, pending)?;
            record_all(&mut tree, &mut stats, batch)?;
        }
        stats.dirs_excluded = dirs_excluded.load(Ordering::Relaxed);

        let final_progress = stats.progress(tracker.elapsed());
        self.report(final_progress.clone());
        if config.mode != ComparisonMode::Full {
            info!(
                target: "difflens::scan",
                "Tiered hashing skipped reading {} from files on disk under {}",
                humansize::format_size(final_progress.bytes_skipped(), humansize::DECIMAL),
                config.root.display()
            );
        }

        Ok(ScanResult {
            tree,
            root_path,
            mode: config.mode,
            stats,
            warnings,
            scan_duration: start.elapsed(),
        })
    }

    fn walker(
        &self,
        threads: usize,
        root_path: &Path,
        filter: Arc<PathFilter>,
        dirs_excluded: Arc<AtomicU64>,
    ) -> WalkDir {
        let parallelism = match threads {
            1 => Parallelism::Serial,
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            n => Parallelism::RayonNewPool(n),
        };

        let root = root_path.to_path_buf();
        WalkDir::new(root_path)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .process_read_dir(move |_depth, _path, _read_dir_state, children| {
                children.retain(|child| match child {
                    Ok(entry) if entry.file_type().is_dir() => {
                        let relative = relative_to(&entry.path(), &root);
                        let excluded = !relative.is_empty() && filter.is_excluded_dir(&relative);
                        if excluded {
                            dirs_excluded.fetch_add(1, Ordering::Relaxed);
                        }
                        !excluded
                    }
                    _ => true,
                });
            })
    }

    fn report(&self, progress: ScanProgress) {
        info!(target: "difflens::scan", "{progress}");
        // No subscribers is fine.
        let _ = self.progress_tx.send(progress);
    }
}

impl Default for TieredScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Where file hashing runs.
enum HashPool {
    /// On the walking thread.
    Inline,
    /// On rayon's global pool.
    Global,
    Dedicated(rayon::ThreadPool),
}

impl HashPool {
    fn new(threads: usize) -> Result<Self, ScanError> {
        match threads {
            1 => Ok(Self::Inline),
            0 => Ok(Self::Global),
            n => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .thread_name(|i| format!("difflens-hash-{i}"))
                .build()
                .map(Self::Dedicated)
                .map_err(|e| ScanError::InvalidConfig {
                    message: format!("cannot start {n} hashing threads: {e}"),
                }),
        }
    }

    fn is_parallel(&self) -> bool {
        !matches!(self, Self::Inline)
    }

    /// Hash every file in `batch`. Workers touch no shared state; the first
    /// I/O error aborts the batch.
    fn hash_batch(
        &self,
        hasher: &TieredHasher,
        batch: Vec<PendingFile>,
    ) -> Result<Vec<Observation>, ScanError> {
        match self {
            Self::Dedicated(pool) => pool.install(|| hash_parallel(hasher, batch)),
            Self::Global => hash_parallel(hasher, batch),
            Self::Inline => batch
                .into_iter()
                .map(|file| hasher.observe(&file.path, file.relative_path, file.size))
                .collect(),
        }
    }
}

fn hash_parallel(hasher: &TieredHasher, batch: Vec<PendingFile>) -> Result<Vec<Observation>, ScanError> {
    batch
        .into_par_iter()
        .map(|file| hasher.observe(&file.path, file.relative_path, file.size))
        .collect()
}

fn record(tree: &mut FingerprintTree, stats: &mut ScanStats, observation: Observation) -> Result<(), ScanError> {
    stats.bytes_read += observation.bytes_read;
    stats.files_fingerprinted += 1;
    tree.insert(observation)
}

fn record_all(
    tree: &mut FingerprintTree,
    stats: &mut ScanStats,
    observations: Vec<Observation>,
) -> Result<(), ScanError> {
    observations
        .into_iter()
        .try_for_each(|observation| record(tree, stats, observation))
}

/// `path` relative to `root`, as a display string.
fn relative_to(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}
