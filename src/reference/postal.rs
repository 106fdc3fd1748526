//! US postal code to county lookup.
//!
//! The dataset is the GeoNames postal code dump for the US (`US.txt`), a
//! tab-separated file without a header:
//!
//! ```text
//! country  postal  place        state           st  county  code ...
//! US       27514   Chapel Hill  North Carolina  NC  Orange  135  ...
//! ```
//!
//! Only the postal code (column 2) and county name (column 6) are kept.

use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{info, instrument, warn};

const POSTAL_IDX: usize = 1;
const COUNTY_IDX: usize = 5;

static US_POSTAL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{5})(?:-\d{4})?$").unwrap());

/// Anything that can map a postal code to a county name.
///
/// Implementations never fail: unknown or malformed codes yield `None`.
pub trait PostalLookup {
    fn lookup_county(&self, postal_code: &str) -> Option<String>;
}

/// Reduce user or geocoder input to a five digit ZIP code.
///
/// Accepts `NNNNN` and ZIP+4 (`NNNNN-NNNN`); anything else is rejected.
pub fn normalize_postal_code(raw: &str) -> Option<&str> {
    US_POSTAL_CODE
        .captures(raw.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// In-memory postal code table loaded from a GeoNames dump.
#[derive(Debug, Default, Clone)]
pub struct PostalTable {
    counties: HashMap<String, String>,
}

impl PostalTable {
    /// Load the table from a GeoNames `US.txt` file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let file = File::open(path.as_ref())?;
        let table = Self::from_reader(file)?;
        if table.is_empty() {
            warn!("Postal code dataset is empty; every lookup will miss");
        }
        info!(count = table.len(), "Loaded postal code dataset");
        Ok(table)
    }

    /// Parse GeoNames rows from any reader.
    ///
    /// Rows too short to carry a county column are ignored. Rows with an empty
    /// county are kept so that the code is known but resolves to nothing.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Box<dyn Error>> {
        let mut tsv = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .flexible(true)
            .quoting(false)
            .from_reader(reader);

        let mut counties = HashMap::new();
        for result in tsv.records() {
            let record = result?;
            let (Some(code), Some(county)) = (record.get(POSTAL_IDX), record.get(COUNTY_IDX))
            else {
                continue;
            };
            counties
                .entry(code.trim().to_string())
                .or_insert_with(|| county.trim().to_string());
        }

        Ok(Self { counties })
    }

    /// Build a table directly from `(postal code, county)` pairs.
    #[cfg(test)]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let counties = pairs
            .into_iter()
            .map(|(code, county)| (code.trim().to_string(), county.trim().to_string()))
            .collect();
        Self { counties }
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }
}

impl PostalLookup for PostalTable {
    fn lookup_county(&self, postal_code: &str) -> Option<String> {
        let code = normalize_postal_code(postal_code)?;
        self.counties
            .get(code)
            .filter(|county| !county.is_empty())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEONAMES_SAMPLE: &str = "\
US\t27514\tChapel Hill\tNorth Carolina\tNC\tOrange\t135\t\t\t35.9203\t-79.0372\t4
US\t27601\tRaleigh\tNorth Carolina\tNC\tWake\t183\t\t\t35.7727\t-78.6324\t4
US\t28778\tSwannanoa\tNorth Carolina\tNC\tBuncombe\t021\t\t\t35.6004\t-82.3979\t4
US\t09001\tAPO\tArmed Forces Europe\tAE\t\t\t\t\t\t\t
US\t99999
";

    fn table() -> PostalTable {
        PostalTable::from_reader(GEONAMES_SAMPLE.as_bytes()).unwrap()
    }

    #[test]
    fn test_normalize_postal_code() {
        assert_eq!(normalize_postal_code("27514"), Some("27514"));
        assert_eq!(normalize_postal_code(" 27514-1234 "), Some("27514"));
        assert_eq!(normalize_postal_code("2751"), None);
        assert_eq!(normalize_postal_code("275144"), None);
        assert_eq!(normalize_postal_code("abcde"), None);
        assert_eq!(normalize_postal_code(""), None);
    }

    #[test]
    fn test_lookup_known_codes() {
        let table = table();
        assert_eq!(table.lookup_county("27514").as_deref(), Some("Orange"));
        assert_eq!(table.lookup_county("27601").as_deref(), Some("Wake"));
        assert_eq!(table.lookup_county("28778-0001").as_deref(), Some("Buncombe"));
    }

    #[test]
    fn test_short_rows_are_skipped() {
        let table = table();
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup_county("99999"), None);
    }

    #[test]
    fn test_empty_county_is_absent() {
        assert_eq!(table().lookup_county("09001"), None);
    }

    #[test]
    fn test_unknown_and_malformed_codes_are_absent() {
        let table = table();
        for code in ["00000", "12345", "not a zip", "", "   ", "27514x", "-27514"] {
            assert_eq!(table.lookup_county(code), None, "code {code:?}");
        }
    }
}
