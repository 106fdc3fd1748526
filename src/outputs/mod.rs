//! Redisplay of the submissions table.
//!
//! # Submodules
//!
//! - [`table`]: Renders the table as Markdown for the terminal
//! - [`json`]: Serializes the table to JSON for other tools

pub mod json;
pub mod table;
