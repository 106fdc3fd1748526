//! Town-to-county reference table.
//!
//! The source is a CSV file with (at least) `Town` and `County` columns:
//!
//! ```text
//! Town,County
//! Chapel Hill,Orange
//! Asheville,Buncombe
//! ```
//!
//! Town names are normalized into lookup keys; county names keep their case.

use csv::ReaderBuilder;
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, instrument, warn};

/// Normalize a town name into a lookup key: lowercase, surrounding whitespace trimmed.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Exact-match lookup table from normalized town name to county name.
#[derive(Debug, Default, Clone)]
pub struct TownTable {
    counties: HashMap<String, String>,
}

impl TownTable {
    /// Load the table from a CSV file on disk.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let file = File::open(path.as_ref())?;
        let table = Self::from_reader(file)?;
        if table.is_empty() {
            warn!("Town reference table is empty; every lookup will miss");
        }
        info!(count = table.len(), "Loaded town reference table");
        Ok(table)
    }

    /// Build the table from any CSV source with `Town` and `County` headers.
    ///
    /// Rows with an empty town are skipped. When two rows normalize to the same
    /// town, the first one is kept.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Box<dyn Error>> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let town_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("town"))
            .ok_or("Town column not found")?;
        let county_idx = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("county"))
            .ok_or("County column not found")?;

        let mut counties = HashMap::new();
        for result in csv_reader.records() {
            let record = result?;
            let key = normalize(record.get(town_idx).unwrap_or_default());
            if key.is_empty() {
                continue;
            }
            let county = record.get(county_idx).unwrap_or_default().trim();
            if counties.contains_key(&key) {
                warn!(town = %key, "Duplicate town in reference table; keeping first entry");
                continue;
            }
            counties.insert(key, county.to_string());
        }

        Ok(Self { counties })
    }

    /// Build a table directly from `(town, county)` pairs.
    #[cfg(test)]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut counties = HashMap::new();
        for (town, county) in pairs {
            let key = normalize(town);
            if !key.is_empty() {
                counties.entry(key).or_insert_with(|| county.trim().to_string());
            }
        }
        Self { counties }
    }

    /// County for a town name, matched exactly after normalization.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.counties.get(&normalize(name)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }
}
