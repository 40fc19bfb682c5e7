//! Reading and writing snapshot tables.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use tracing::{debug, info, warn};

use difflens_core::paths::resolve_file;
use difflens_core::{ComparisonMode, DuplicateField, FileRecord, Fingerprint, Snapshot};

use crate::error::CodecError;

/// Column holding the path relative to the scanned root.
pub const RELATIVE_PATH: &str = "relative_path";
/// Column holding the file size in bytes.
pub const SIZE_BYTES: &str = "size_bytes";

const DELIMITER: u8 = b'\t';
const ESCAPE: u8 = b'\\';
/// Label used in errors for tables read from or written to a stream.
const STREAM: &str = "<stream>";
/// Colliding paths listed in the multi-file warning.
const COLLISION_EXAMPLES: usize = 5;

/// Reads and writes snapshots as tab-separated tables.
///
/// The fingerprint column is named after the comparison mode
/// ([`ComparisonMode::column_name`]) on both the write and the read side,
/// so a table written under one mode fails to load under another.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotCodec {
    mode: ComparisonMode,
}

impl SnapshotCodec {
    pub fn new(mode: ComparisonMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ComparisonMode {
        self.mode
    }

    /// On-disk name of the fingerprint column.
    pub fn column_name(&self) -> &'static str {
        self.mode.column_name()
    }

    /// Write `snapshot` to `path` as `[relative_path, <mode column>, size_bytes]`.
    ///
    /// Returns the number of rows written.
    pub fn write_snapshot(&self, snapshot: &Snapshot, path: &Path) -> Result<usize, CodecError> {
        let path = resolve_file(path)?;
        let file = File::create(&path).map_err(|e| CodecError::io(&path, e))?;
        let rows = self.write_snapshot_into(snapshot, file, &path)?;
        info!(target: "difflens::codec", "Wrote {rows} records to {}", path.display());
        Ok(rows)
    }

    pub fn write_snapshot_to<W: Write>(&self, snapshot: &Snapshot, writer: W) -> Result<usize, CodecError> {
        self.write_snapshot_into(snapshot, writer, Path::new(STREAM))
    }

    fn write_snapshot_into<W: Write>(
        &self,
        snapshot: &Snapshot,
        writer: W,
        source: &Path,
    ) -> Result<usize, CodecError> {
        debug!(target: "difflens::codec", "Renaming column fingerprint to '{}'", self.column_name());
        let mut table = TableWriter::new(writer, source, &[RELATIVE_PATH, self.column_name(), SIZE_BYTES])?;
        for record in snapshot {
            table.row(&[
                Cell::Text(&record.relative_path),
                Cell::Text(record.fingerprint.as_str()),
                Cell::Size(record.size_bytes),
            ])?;
        }
        table.finish()
    }

    /// Write a single `relative_path` column.
    pub fn write_paths<I>(&self, paths: I, path: &Path) -> Result<usize, CodecError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let path = resolve_file(path)?;
        let file = File::create(&path).map_err(|e| CodecError::io(&path, e))?;
        let rows = write_paths_into(paths, file, &path)?;
        info!(target: "difflens::codec", "Wrote {rows} paths to {}", path.display());
        Ok(rows)
    }

    pub fn write_paths_to<I, W>(&self, paths: I, writer: W) -> Result<usize, CodecError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        W: Write,
    {
        write_paths_into(paths, writer, Path::new(STREAM))
    }

    /// Write duplicate rows projected to `[field, relative_path]`, plus
    /// `size_bytes` when the field is not already the size.
    pub fn write_duplicates<'a, I>(&self, records: I, field: DuplicateField, path: &Path) -> Result<usize, CodecError>
    where
        I: IntoIterator<Item = &'a FileRecord>,
    {
        let path = resolve_file(path)?;
        let file = File::create(&path).map_err(|e| CodecError::io(&path, e))?;
        let rows = self.write_duplicates_into(records, field, file, &path)?;
        info!(target: "difflens::codec", "Wrote {rows} duplicate records to {}", path.display());
        Ok(rows)
    }

    pub fn write_duplicates_to<'a, I, W>(&self, records: I, field: DuplicateField, writer: W) -> Result<usize, CodecError>
    where
        I: IntoIterator<Item = &'a FileRecord>,
        W: Write,
    {
        self.write_duplicates_into(records, field, writer, Path::new(STREAM))
    }

    fn write_duplicates_into<'a, I, W>(
        &self,
        records: I,
        field: DuplicateField,
        writer: W,
        source: &Path,
    ) -> Result<usize, CodecError>
    where
        I: IntoIterator<Item = &'a FileRecord>,
        W: Write,
    {
        match field {
            DuplicateField::Size => {
                let mut table = TableWriter::new(writer, source, &[SIZE_BYTES, RELATIVE_PATH])?;
                for record in records {
                    table.row(&[Cell::Size(record.size_bytes), Cell::Text(&record.relative_path)])?;
                }
                table.finish()
            }
            DuplicateField::Fingerprint => {
                let mut table =
                    TableWriter::new(writer, source, &[self.column_name(), RELATIVE_PATH, SIZE_BYTES])?;
                for record in records {
                    table.row(&[
                        Cell::Text(record.fingerprint.as_str()),
                        Cell::Text(&record.relative_path),
                        Cell::Size(record.size_bytes),
                    ])?;
                }
                table.finish()
            }
        }
    }

    /// Read one snapshot table from `path`.
    pub fn read_snapshot(&self, path: &Path) -> Result<Snapshot, CodecError> {
        let path = resolve_file(path)?;
        let file = File::open(&path).map_err(|e| CodecError::io(&path, e))?;
        let snapshot = self.read_snapshot_inner(file, &path)?;
        info!(target: "difflens::codec", "Read {} records from {}", snapshot.len(), path.display());
        Ok(snapshot)
    }

    pub fn read_snapshot_from<R: Read>(&self, reader: R) -> Result<Snapshot, CodecError> {
        self.read_snapshot_inner(reader, Path::new(STREAM))
    }

    fn read_snapshot_inner<R: Read>(&self, reader: R, source: &Path) -> Result<Snapshot, CodecError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(DELIMITER)
            .double_quote(false)
            .escape(Some(ESCAPE))
            .from_reader(reader);

        let headers = reader.headers().map_err(|e| CodecError::csv(source, e))?.clone();
        let path_idx = self.column(&headers, RELATIVE_PATH, source)?;
        let fingerprint_idx = self.column(&headers, self.column_name(), source)?;
        let size_idx = self.column(&headers, SIZE_BYTES, source)?;
        debug!(target: "difflens::codec", "Renaming column {} to 'fingerprint'", self.column_name());

        let mut snapshot = Snapshot::new();
        for result in reader.records() {
            let row = result.map_err(|e| CodecError::csv(source, e))?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();

            let raw_size = row.get(size_idx).unwrap_or_default();
            let size_bytes = raw_size.parse::<u64>().map_err(|_| CodecError::InvalidSize {
                path: source.to_path_buf(),
                line,
                value: raw_size.to_string(),
            })?;

            snapshot.push(FileRecord::new(
                row.get(path_idx).unwrap_or_default(),
                Fingerprint::new(row.get(fingerprint_idx).unwrap_or_default()),
                size_bytes,
            ));
        }
        Ok(snapshot)
    }

    fn column(&self, headers: &StringRecord, name: &str, source: &Path) -> Result<usize, CodecError> {
        headers.iter().position(|h| h == name).ok_or_else(|| CodecError::MissingColumn {
            path: source.to_path_buf(),
            column: name.to_string(),
            mode: self.mode,
        })
    }

    /// Read and concatenate tables, in order.
    ///
    /// A path present in more than one row is expected when merging several
    /// volumes, so collisions are only reported as a warning.
    pub fn read_snapshots<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Snapshot, CodecError> {
        if paths.is_empty() {
            return Err(CodecError::NoInputs);
        }

        let mut combined = Snapshot::new();
        for path in paths {
            combined.append(self.read_snapshot(path.as_ref())?);
        }

        let collisions = combined.duplicate_paths();
        if !collisions.is_empty() {
            let examples: Vec<&str> = collisions
                .iter()
                .take(COLLISION_EXAMPLES)
                .map(|(path, _)| *path)
                .collect();
            warn!(
                target: "difflens::codec",
                "{} relative paths appear more than once across {} input files, e.g. {:?}",
                collisions.len(),
                paths.len(),
                examples
            );
        }
        Ok(combined)
    }
}

fn write_paths_into<I, W>(paths: I, writer: W, source: &Path) -> Result<usize, CodecError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    W: Write,
{
    let mut table = TableWriter::new(writer, source, &[RELATIVE_PATH])?;
    for path in paths {
        table.row(&[Cell::Text(path.as_ref())])?;
    }
    table.finish()
}

/// One field of an output row.
enum Cell<'a> {
    Text(&'a str),
    Size(u64),
}

impl Cell<'_> {
    /// Text is always quoted, whatever it looks like. Sizes are bare.
    fn render(&self) -> String {
        match self {
            Cell::Text(text) => quote_text(text),
            Cell::Size(size) => size.to_string(),
        }
    }
}

struct TableWriter<'p, W: Write> {
    inner: csv::Writer<W>,
    source: &'p Path,
    rows: usize,
}

impl<'p, W: Write> TableWriter<'p, W> {
    fn new(writer: W, source: &'p Path, header: &[&str]) -> Result<Self, CodecError> {
        let mut inner = WriterBuilder::new()
            .delimiter(DELIMITER)
            .quote_style(QuoteStyle::Never)
            .from_writer(writer);
        inner
            .write_record(header.iter().map(|name| quote_text(name)))
            .map_err(|e| CodecError::csv(source, e))?;
        Ok(Self { inner, source, rows: 0 })
    }

    fn row(&mut self, cells: &[Cell<'_>]) -> Result<(), CodecError> {
        self.inner
            .write_record(cells.iter().map(Cell::render))
            .map_err(|e| CodecError::csv(self.source, e))?;
        self.rows += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<usize, CodecError> {
        self.inner.flush().map_err(|e| CodecError::io(self.source, e))?;
        Ok(self.rows)
    }
}

/// Quote `value`, backslash-escaping backslashes, quotes and tabs.
fn quote_text(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '"' | '\t') {
            quoted.push(ESCAPE as char);
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot::from_records(vec![
            FileRecord::new("a.txt", Fingerprint::new("abc123"), 10),
            FileRecord::new("dir/b.txt", Fingerprint::new("def456"), 2048),
        ])
    }

    fn written(codec: &SnapshotCodec, snapshot: &Snapshot) -> String {
        let mut out = Vec::new();
        codec.write_snapshot_to(snapshot, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_header_follows_mode() {
        for (mode, column) in [
            (ComparisonMode::Size, "file_size"),
            (ComparisonMode::Partial, "partial_hash"),
            (ComparisonMode::Full, "full_hash"),
        ] {
            let text = written(&SnapshotCodec::new(mode), &Snapshot::new());
            assert_eq!(text, format!("\"relative_path\"\t\"{column}\"\t\"size_bytes\"\n"));
        }
    }

    #[test]
    fn test_wire_format() {
        let text = written(&SnapshotCodec::new(ComparisonMode::Full), &sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "\"a.txt\"\t\"abc123\"\t10");
        assert_eq!(lines[2], "\"dir/b.txt\"\t\"def456\"\t2048");
    }

    #[test]
    fn test_numeric_looking_text_is_quoted() {
        let snapshot = Snapshot::from_records(vec![
            FileRecord::new("2023", Fingerprint::new("1e5"), 5),
            FileRecord::new("inf", Fingerprint::new("NaN"), 1),
            FileRecord::new("-0", Fingerprint::new(".5"), 2),
        ]);
        let codec = SnapshotCodec::new(ComparisonMode::Full);
        let text = written(&codec, &snapshot);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "\"2023\"\t\"1e5\"\t5");
        assert_eq!(lines[2], "\"inf\"\t\"NaN\"\t1");
        assert_eq!(lines[3], "\"-0\"\t\".5\"\t2");

        assert_eq!(codec.read_snapshot_from(text.as_bytes()).unwrap(), snapshot);
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let snapshot = Snapshot::from_records(vec![FileRecord::new(
            "we\tird \"name\" back\\slash",
            Fingerprint::new("h"),
            1,
        )]);
        let text = written(&SnapshotCodec::new(ComparisonMode::Full), &snapshot);
        let row = text.lines().nth(1).unwrap();
        assert_eq!(row, "\"we\\\tird \\\"name\\\" back\\\\slash\"\t\"h\"\t1");
    }

    #[test]
    fn test_round_trip_is_exact() {
        let codec = SnapshotCodec::new(ComparisonMode::Partial);
        let snapshot = Snapshot::from_records(vec![
            FileRecord::new("tab\there", Fingerprint::new("0123456789"), 0),
            FileRecord::new("\"quoted\"", Fingerprint::new("x"), 5),
            FileRecord::new("C:\\windows\\path\\", Fingerprint::new("y"), 7),
            FileRecord::new("12345", Fingerprint::not_computed(), 9),
            FileRecord::new("line\nbreak", Fingerprint::new(""), 3),
        ]);

        let mut out = Vec::new();
        codec.write_snapshot_to(&snapshot, &mut out).unwrap();
        let back = codec.read_snapshot_from(out.as_slice()).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_mode_mismatch_fails_loudly() {
        let mut out = Vec::new();
        SnapshotCodec::new(ComparisonMode::Partial)
            .write_snapshot_to(&sample(), &mut out)
            .unwrap();

        let err = SnapshotCodec::new(ComparisonMode::Full)
            .read_snapshot_from(out.as_slice())
            .unwrap_err();
        match err {
            CodecError::MissingColumn { column, mode, .. } => {
                assert_eq!(column, "full_hash");
                assert_eq!(mode, ComparisonMode::Full);
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_invalid_size_is_reported_with_line() {
        let table = "\"relative_path\"\t\"full_hash\"\t\"size_bytes\"\n\"a\"\t\"h\"\t-4\n";
        let err = SnapshotCodec::new(ComparisonMode::Full)
            .read_snapshot_from(table.as_bytes())
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidSize { line: 2, ref value, .. } if value == "-4"));
    }

    #[test]
    fn test_column_order_on_read_is_free() {
        let table = "size_bytes\tfull_hash\trelative_path\n3\tabc\tx.bin\n";
        let snapshot = SnapshotCodec::new(ComparisonMode::Full)
            .read_snapshot_from(table.as_bytes())
            .unwrap();
        assert_eq!(snapshot.records(), &[FileRecord::new("x.bin", Fingerprint::new("abc"), 3)]);
    }

    #[test]
    fn test_duplicate_projection() {
        let codec = SnapshotCodec::new(ComparisonMode::Full);
        let snapshot = sample();

        let mut out = Vec::new();
        codec
            .write_duplicates_to(snapshot.iter(), DuplicateField::Fingerprint, &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\"full_hash\"\t\"relative_path\"\t\"size_bytes\"\n\"abc123\"\t\"a.txt\"\t10\n"));

        let mut out = Vec::new();
        codec
            .write_duplicates_to(snapshot.iter(), DuplicateField::Size, &mut out)
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\"size_bytes\"\t\"relative_path\"\n10\t\"a.txt\"\n"));
    }

    #[test]
    fn test_paths_table() {
        let mut out = Vec::new();
        let rows = SnapshotCodec::new(ComparisonMode::Full)
            .write_paths_to(["y", "z"], &mut out)
            .unwrap();
        assert_eq!(rows, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "\"relative_path\"\n\"y\"\n\"z\"\n");
    }

    #[test]
    fn test_no_inputs() {
        let none: [&Path; 0] = [];
        let err = SnapshotCodec::new(ComparisonMode::Full).read_snapshots(&none).unwrap_err();
        assert!(matches!(err, CodecError::NoInputs));
    }
}
