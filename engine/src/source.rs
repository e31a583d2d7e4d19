//! Recipient-list file readers.
//!
//! Two formats: line-delimited text (`.txt`, one address per non-empty line)
//! and tabular (`.csv`/`.tsv`, addresses in the first column). Anything else
//! is an [`SourceError::UnsupportedFormat`]; callers log it and treat the
//! set as empty rather than aborting the process.
//!
//! Addresses come back trimmed, in file order, and otherwise untouched: no
//! deduplication and no syntax validation. The transport rejects malformed
//! addresses per recipient.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read recipient file {path}: {source}")]
    Read {
        path: String,
        source: io::Error,
    },

    #[error("malformed recipient table {path}: {source}")]
    Table {
        path: String,
        source: csv::Error,
    },

    #[error("unsupported recipient file format: {0}")]
    UnsupportedFormat(String),
}

/// Read an ordered recipient set from a file, dispatching on extension.
pub fn read_recipients(path: &Path) -> Result<Vec<String>, SourceError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" => read_lines(path),
        "csv" => read_table(path, b','),
        "tsv" => read_table(path, b'\t'),
        _ => Err(SourceError::UnsupportedFormat(path.display().to_string())),
    }
}

fn read_file(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.display().to_string(),
        source,
    })
}

fn read_lines(path: &Path) -> Result<Vec<String>, SourceError> {
    let content = read_file(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect())
}

fn read_table(path: &Path, delimiter: u8) -> Result<Vec<String>, SourceError> {
    let content = read_file(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(false)
        .from_reader(content.as_bytes());

    let mut recipients = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| SourceError::Table {
            path: path.display().to_string(),
            source,
        })?;
        let Some(first) = record.get(0) else { continue };
        let first = first.trim();
        if !first.is_empty() {
            recipients.push(first.to_owned());
        }
    }

    // A leading row whose first cell is not an address is a header row.
    if recipients.first().is_some_and(|head| !head.contains('@')) {
        recipients.remove(0);
    }

    Ok(recipients)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn txt_trims_and_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "list.txt", "  a@x.com  \n\n\nb@x.com\n   \nc@x.com");

        let recipients = read_recipients(&path).unwrap();

        assert_eq!(recipients, ["a@x.com", "b@x.com", "c@x.com"]);
    }

    #[test]
    fn csv_takes_first_column_and_drops_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "list.csv",
            "email,name\na@x.com,Alice\nb@x.com,Bob\n",
        );

        let recipients = read_recipients(&path).unwrap();

        assert_eq!(recipients, ["a@x.com", "b@x.com"]);
    }

    #[test]
    fn csv_without_header_keeps_first_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "list.csv", "a@x.com,Alice\nb@x.com,Bob\n");

        let recipients = read_recipients(&path).unwrap();

        assert_eq!(recipients, ["a@x.com", "b@x.com"]);
    }

    #[test]
    fn tsv_splits_on_tabs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "list.tsv", "a@x.com\tAlice\nb@x.com\tBob\n");

        let recipients = read_recipients(&path).unwrap();

        assert_eq!(recipients, ["a@x.com", "b@x.com"]);
    }

    #[test]
    fn order_is_preserved_and_duplicates_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "list.txt", "c@x.com\na@x.com\nc@x.com\n");

        let recipients = read_recipients(&path).unwrap();

        assert_eq!(recipients, ["c@x.com", "a@x.com", "c@x.com"]);
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "list.xlsx", "whatever");

        let err = read_recipients(&path).unwrap_err();

        assert!(matches!(err, SourceError::UnsupportedFormat(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = read_recipients(Path::new("/no/such/list.txt")).unwrap_err();

        assert!(matches!(err, SourceError::Read { .. }));
    }
}
