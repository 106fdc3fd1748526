//! CSV-backed submission store.
//!
//! The store is a single flat table (see [`COLUMNS`]) holding one row per
//! accepted submission. Every save rewrites the whole file: the full table is
//! written to a temporary file next to the target and renamed over it, so a
//! submission costs O(total rows).
//!
//! There is no locking. The store assumes one writer at a time; two processes
//! running load → append → save concurrently can lose a row or hand out the
//! same ID twice.

use crate::models::{COLUMNS, SubmissionRecord};
use csv::{ReaderBuilder, WriterBuilder};
use std::error::Error;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument};

/// Handle on the shared submissions table.
#[derive(Debug, Clone)]
pub struct SubmissionStore {
    path: PathBuf,
}

impl SubmissionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record in file order. A missing file is an empty table.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Vec<SubmissionRecord>, Box<dyn Error>> {
        if !self.path.exists() {
            debug!("Store does not exist yet; starting with an empty table");
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut records = Vec::new();
        for result in reader.deserialize::<SubmissionRecord>() {
            records.push(result?);
        }
        info!(count = records.len(), "Loaded submissions");
        Ok(records)
    }

    /// ID for the next record: one past the highest ID present.
    ///
    /// For a table only ever appended to, this equals `len + 1`.
    pub fn next_id(records: &[SubmissionRecord]) -> u64 {
        records.iter().map(|r| r.id).max().unwrap_or(0) + 1
    }

    /// Append a record to the in-memory table and rewrite the whole file.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), id = record.id))]
    pub fn append_and_save(
        &self,
        records: &mut Vec<SubmissionRecord>,
        record: SubmissionRecord,
    ) -> Result<(), Box<dyn Error>> {
        records.push(record);
        self.save(records)?;
        info!(count = records.len(), "Saved submissions");
        Ok(())
    }

    /// Rewrite the file from the full table (header always written).
    pub fn save(&self, records: &[SubmissionRecord]) -> Result<(), Box<dyn Error>> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let tmp = NamedTempFile::new_in(&dir)?;
        {
            let mut writer = WriterBuilder::new()
                .has_headers(false)
                .from_writer(tmp.as_file());
            writer.write_record(COLUMNS)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        // Temp files are private; the shared table keeps whatever mode it had.
        if let Ok(existing) = fs::metadata(&self.path) {
            tmp.as_file().set_permissions(existing.permissions())?;
        }
        tmp.persist(&self.path)?;
        Ok(())
    }
}
