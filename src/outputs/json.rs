//! JSON output of submission records.

use crate::models::SubmissionRecord;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Serialize records as a pretty-printed JSON array using the table's column names.
pub fn to_json(records: &[SubmissionRecord]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

/// Write records to a JSON file, creating parent directories as needed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_records(records: &[SubmissionRecord], path: &Path) -> Result<(), Box<dyn Error>> {
    let json = to_json(records)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await?;
    }
    fs::write(path, json).await?;
    info!(count = records.len(), "Wrote JSON export");
    Ok(())
}
