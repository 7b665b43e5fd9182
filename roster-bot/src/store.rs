//! CSV-backed player table.
//!
//! The table is an append-only log: every append re-reads the file, then
//! rewrites header + existing rows + new rows through a sibling temp file
//! that is renamed over the original. Rows edited by hand are carried over
//! verbatim even if they no longer have the expected shape.

use roster_types::{HEADER, Record};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Underlying cause of a store failure.
#[derive(Debug)]
pub enum StoreErrorKind {
    Io(io::Error),
    Csv(csv::Error),
}

/// Local read/write failure on the player table.
#[derive(Debug)]
pub struct StoreError {
    pub path: PathBuf,
    pub op: &'static str,
    pub kind: StoreErrorKind,
}

impl StoreError {
    fn io(path: &Path, op: &'static str, e: io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            op,
            kind: StoreErrorKind::Io(e),
        }
    }

    fn csv(path: &Path, op: &'static str, e: csv::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            op,
            kind: StoreErrorKind::Csv(e),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StoreErrorKind::Io(e) => write!(f, "Failed to {} {}: {}", self.op, self.path.display(), e),
            StoreErrorKind::Csv(e) => write!(f, "Failed to {} {}: {}", self.op, self.path.display(), e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            StoreErrorKind::Io(e) => Some(e),
            StoreErrorKind::Csv(e) => Some(e),
        }
    }
}

pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the table with only the header row if it does not exist yet.
    pub fn ensure_initialized(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, "create directory", e))?;
        }
        self.rewrite(&[], &[])?;
        log::info!("Store: Created {} with header", self.path.display());
        Ok(())
    }

    /// Append records after all existing rows, preserving their order.
    pub fn append(&self, new_rows: &[Record]) -> Result<(), StoreError> {
        let existing = self.read_rows()?;
        self.rewrite(&existing, new_rows)?;
        log::info!(
            "Store: Appended {} row(s) to {} ({} total)",
            new_rows.len(),
            self.path.display(),
            existing.len() + new_rows.len()
        );
        Ok(())
    }

    /// Raw bytes of the table, as published to the mirror.
    pub fn snapshot(&self) -> Result<Vec<u8>, StoreError> {
        fs::read(&self.path).map_err(|e| StoreError::io(&self.path, "read", e))
    }

    /// Full scan of well-formed records. Rows that are not UTF-8, do not have
    /// exactly four fields, or have a blank code or name are skipped.
    pub fn records(&self) -> Result<Vec<Record>, StoreError> {
        let rows = self.read_rows()?;
        let total = rows.len();
        let records: Vec<Record> = rows
            .into_iter()
            .filter_map(|row| csv::StringRecord::from_byte_record(row).ok())
            .filter_map(|row| Record::from_fields(row.iter()))
            .collect();
        if records.len() < total {
            log::warn!(
                "Store: Skipped {} malformed row(s) in {}",
                total - records.len(),
                self.path.display()
            );
        }
        Ok(records)
    }

    /// Existing rows as raw bytes, minus a leading header row. A missing file
    /// reads as empty.
    fn read_rows(&self) -> Result<Vec<csv::ByteRecord>, StoreError> {
        let mut reader = match csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
        {
            Ok(r) => r,
            Err(e) if is_not_found(&e) => {
                log::warn!("Store: {} is missing, treating as empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::csv(&self.path, "open", e)),
        };

        let mut rows = reader
            .byte_records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::csv(&self.path, "read", e))?;

        if rows.first().is_some_and(is_header) {
            rows.remove(0);
        } else if !rows.is_empty() {
            log::warn!("Store: {} has no header row, keeping all rows", self.path.display());
        }
        Ok(rows)
    }

    fn rewrite(&self, existing: &[csv::ByteRecord], new_rows: &[Record]) -> Result<(), StoreError> {
        let tmp = self.temp_path();
        let result = self.write_to(&tmp, existing, new_rows).and_then(|()| {
            fs::rename(&tmp, &self.path).map_err(|e| StoreError::io(&self.path, "replace", e))
        });
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn write_to(
        &self,
        tmp: &Path,
        existing: &[csv::ByteRecord],
        new_rows: &[Record],
    ) -> Result<(), StoreError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(tmp)
            .map_err(|e| StoreError::csv(tmp, "create", e))?;

        writer
            .write_record(HEADER)
            .map_err(|e| StoreError::csv(tmp, "write", e))?;
        for row in existing {
            writer
                .write_record(row)
                .map_err(|e| StoreError::csv(tmp, "write", e))?;
        }
        for record in new_rows {
            writer
                .write_record(record.fields())
                .map_err(|e| StoreError::csv(tmp, "write", e))?;
        }

        writer.flush().map_err(|e| StoreError::io(tmp, "flush", e))?;
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::io(tmp, "flush", io::Error::new(e.error().kind(), e.error().to_string())))?;
        file.sync_all().map_err(|e| StoreError::io(tmp, "sync", e))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn is_header(row: &csv::ByteRecord) -> bool {
    row.iter().eq(HEADER.iter().map(|h| h.as_bytes()))
}

fn is_not_found(e: &csv::Error) -> bool {
    matches!(e.kind(), csv::ErrorKind::Io(io) if io.kind() == io::ErrorKind::NotFound)
}
