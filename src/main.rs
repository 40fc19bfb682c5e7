//! difflens - fingerprint file populations and diff them across time.
//!
//! Usage:
//!   difflens -s DIR -o hashes.tsv           Scan and save fingerprints
//!   difflens -s DIR -d dupes.tsv            Find duplicate files
//!   difflens -i new.tsv -c old.tsv -r ...   Compare two saved snapshots
//!   difflens --help                         Show help

use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser, ValueEnum};
use color_eyre::eyre::{Result, WrapErr};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use difflens_analyze::{added, duplicates, modified, removed};
use difflens_codec::SnapshotCodec;
use difflens_core::{ComparisonMode, DEFAULT_PARTIAL_HASH_BYTES, ScanConfig, Snapshot};
use difflens_scan::TieredScanner;

#[derive(Parser)]
#[command(
    name = "difflens",
    version,
    about = "A program to inspect collections of files for differences",
    long_about = "difflens fingerprints every file under a directory, escalating from file size \
                  to a partial hash to a full hash only when needed, and compares the result \
                  against an earlier snapshot."
)]
#[command(group(ArgGroup::new("input").required(true).args(["scan_directory", "input_hash_file"])))]
struct Cli {
    /// Path in which to look for files
    #[arg(short = 's', long)]
    scan_directory: Option<PathBuf>,

    /// Input file for new hash values if live directory scanning should be skipped
    #[arg(short = 'i', long)]
    input_hash_file: Vec<PathBuf>,

    /// Path to delimited file containing old hash values
    #[arg(short = 'c', long)]
    comparison_hash_file: Option<PathBuf>,

    /// Output file for newly computed hash values
    #[arg(short = 'o', long)]
    output_hash_file: Option<PathBuf>,

    /// Output file listing files that have been removed
    #[arg(short = 'r', long)]
    output_removed_files: Option<PathBuf>,

    /// Output file listing files that have been added
    #[arg(short = 'a', long)]
    output_added_files: Option<PathBuf>,

    /// Output file listing files that have been modified
    #[arg(short = 'm', long)]
    output_modified_files: Option<PathBuf>,

    /// Output file listing files that contain matching data
    #[arg(short = 'd', long)]
    output_duplicates: Option<PathBuf>,

    /// File extension such as '*.nfo' that should not be scanned
    #[arg(short = 'e', long)]
    exclude_file_extension: Vec<String>,

    /// Relative dir such as './foo/bar' that should not be scanned
    #[arg(short = 'y', long)]
    exclude_relative_path: Vec<String>,

    /// Set log level
    #[arg(short = 'l', long, value_enum, ignore_case = true, default_value = "info")]
    log_level: LogLevel,

    /// Target interval in seconds between log updates when hashing
    #[arg(short = 't', long, default_value = "30")]
    log_update_interval_seconds: u64,

    /// Target interval of files hashed between log updates
    #[arg(short = 'x', long, default_value = "10000")]
    log_update_interval_files: u64,

    /// Set comparison mode to full file hash, partial file hash, or file size only
    #[arg(short = 'p', long, value_enum, default_value = "full-hash")]
    compare_mode: ModeArg,

    /// Leading bytes of each file hashed before a full read is considered
    #[arg(long, default_value_t = DEFAULT_PARTIAL_HASH_BYTES)]
    partial_hash_bytes: u64,

    /// Hashing threads (1 = single-threaded, 0 = one per core)
    #[arg(long, default_value = "1")]
    threads: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    FullHash,
    PartialHash,
    FileSize,
}

impl From<ModeArg> for ComparisonMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::FullHash => ComparisonMode::Full,
            ModeArg::PartialHash => ComparisonMode::Partial,
            ModeArg::FileSize => ComparisonMode::Size,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cli.log_level.directive()))
        .with_target(true)
        .init();

    run(&cli)?;

    warn!(target: "difflens", "Shutting down difflens");
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let mode = ComparisonMode::from(cli.compare_mode);
    let codec = SnapshotCodec::new(mode);

    let cwd = std::env::current_dir().wrap_err("Cannot determine the working directory")?;
    warn!(target: "difflens", "Starting difflens from current working directory {}", cwd.display());

    let current = load_current(cli, mode, &codec)?;

    if let Some(output) = &cli.output_hash_file {
        if let [only] = cli.input_hash_file.as_slice() {
            info!(
                target: "difflens",
                "Desired output {} would be identical to {}, use that instead as no scan took place",
                output.display(),
                only.display()
            );
        } else {
            info!(
                target: "difflens",
                "Writing newly computed {mode} for {} files to disk at {}",
                current.len(),
                output.display()
            );
            codec
                .write_snapshot(&current, output)
                .wrap_err_with(|| format!("Failed to write {}", output.display()))?;
        }
    }

    info!(target: "difflens", "Beginning analysis of current snapshot with {} rows", current.len());

    if let Some(output) = &cli.output_duplicates {
        let field = mode.duplicate_field();
        info!(target: "difflens", "Finding duplicates in current snapshot based on {field}");
        let report = duplicates(&current, field);
        info!(
            target: "difflens",
            "Writing {} duplicate rows across {} groups to disk at {}",
            report.files_with_duplicates,
            report.group_count(),
            output.display()
        );
        codec
            .write_duplicates(report.records(), field, output)
            .wrap_err_with(|| format!("Failed to write {}", output.display()))?;
    }

    let wants_diff = cli.output_removed_files.is_some()
        || cli.output_added_files.is_some()
        || cli.output_modified_files.is_some();

    let Some(comparison_path) = &cli.comparison_hash_file else {
        if wants_diff {
            warn!(
                target: "difflens",
                "Skipping any added, removed, or modified analysis as no comparison hash file was passed in"
            );
        }
        return Ok(());
    };

    info!(target: "difflens", "Reading comparison snapshot from disk at {}", comparison_path.display());
    let previous = codec
        .read_snapshots(&[comparison_path])
        .wrap_err("Failed to read comparison snapshot")?;

    if let Some(output) = &cli.output_removed_files {
        info!(target: "difflens", "Finding files in the comparison snapshot that have been (re)moved");
        let result = removed(&previous, &current).wrap_err("Cannot compute removed files")?;
        write_table(&codec, &result, output, "(re)moved")?;
    }

    if let Some(output) = &cli.output_added_files {
        info!(target: "difflens", "Finding files that are new since the comparison snapshot");
        let result = added(&previous, &current).wrap_err("Cannot compute added files")?;
        write_table(&codec, &result, output, "added")?;
    }

    if let Some(output) = &cli.output_modified_files {
        info!(target: "difflens", "Finding files whose fingerprints differ from the comparison snapshot");
        let paths = modified(&previous, &current).wrap_err("Cannot compute modified files")?;
        info!(
            target: "difflens",
            "Writing {} modified paths to disk at {}",
            paths.len(),
            output.display()
        );
        codec
            .write_paths(&paths, output)
            .wrap_err_with(|| format!("Failed to write {}", output.display()))?;
    }

    Ok(())
}

/// Scan the directory, or read and merge the given snapshot files.
fn load_current(cli: &Cli, mode: ComparisonMode, codec: &SnapshotCodec) -> Result<Snapshot> {
    if let Some(root) = &cli.scan_directory {
        info!(
            target: "difflens",
            "Beginning directory scan of {} using compare mode {mode}",
            root.display()
        );
        let config = ScanConfig::builder()
            .root(root.as_path())
            .mode(mode)
            .partial_hash_bytes(cli.partial_hash_bytes)
            .progress_interval_secs(cli.log_update_interval_seconds)
            .progress_interval_files(cli.log_update_interval_files)
            .exclude_extensions(cli.exclude_file_extension.clone())
            .exclude_paths(cli.exclude_relative_path.clone())
            .threads(cli.threads)
            .build()
            .wrap_err("Invalid scan configuration")?;

        let result = TieredScanner::new()
            .scan(&config)
            .wrap_err_with(|| format!("Scan of {} failed", root.display()))?;
        if result.has_warnings() {
            warn!(target: "difflens", "Scan finished with {} warnings", result.warnings.len());
        }
        info!(target: "difflens", "Directory scan complete in {:.2?}, flattening output", result.scan_duration);
        return Ok(result.into_snapshot());
    }

    info!(
        target: "difflens",
        "Reading current snapshot from file(s) {:?} rather than directory scan",
        cli.input_hash_file
    );
    codec
        .read_snapshots(cli.input_hash_file.as_slice())
        .wrap_err("Failed to read input hash files")
}

fn write_table(codec: &SnapshotCodec, snapshot: &Snapshot, output: &Path, label: &str) -> Result<()> {
    info!(
        target: "difflens",
        "Writing {label} snapshot with {} rows to disk at {}",
        snapshot.len(),
        output.display()
    );
    codec
        .write_snapshot(snapshot, output)
        .wrap_err_with(|| format!("Failed to write {}", output.display()))?;
    Ok(())
}
