//! Markdown rendering of the submissions table.
//!
//! The header row is always printed, so an empty store still shows the
//! canonical column set.

use crate::models::{COLUMNS, SubmissionRecord};
use crate::utils::escape_cell;
use itertools::Itertools;
use std::fmt::Write;

fn opt_text(value: &Option<String>) -> String {
    value.as_deref().map(escape_cell).unwrap_or_default()
}

fn opt_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn cells(record: &SubmissionRecord) -> [String; 11] {
    [
        record.id.to_string(),
        escape_cell(&record.link),
        escape_cell(&record.project.to_string()),
        escape_cell(&record.address),
        opt_text(&record.name),
        opt_text(&record.town),
        opt_text(&record.keywords),
        escape_cell(&record.citation),
        opt_number(record.latitude),
        opt_number(record.longitude),
        escape_cell(&record.county),
    ]
}

/// Render every record as a Markdown table, in stored order.
pub fn render(records: &[SubmissionRecord]) -> String {
    let mut md = String::new();
    writeln!(md, "| {} |", COLUMNS.iter().join(" | ")).unwrap();
    writeln!(md, "|{}|", COLUMNS.iter().map(|_| "---").join("|")).unwrap();
    for record in records {
        writeln!(md, "| {} |", cells(record).iter().join(" | ")).unwrap();
    }
    md
}
