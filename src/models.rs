//! Data models shared by the submission pipeline.
//!
//! This module defines the core data structures used throughout the application:
//! - [`LocationCandidate`]: Geocoder output (coordinates plus structured address)
//! - [`Project`] / [`ProjectTags`]: The research projects a submission belongs to
//! - [`SubmissionRecord`]: One persisted row of the shared table
//!
//! The record uses the capitalized column names of the shared CSV file, hence
//! the `#[serde(rename = ...)]` attributes.

use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Column header of the backing store, in file order.
pub const COLUMNS: [&str; 11] = [
    "ID",
    "Link",
    "Project",
    "Address",
    "Name",
    "Town",
    "Keywords",
    "Citation",
    "Latitude",
    "Longitude",
    "County",
];

/// County value recorded when no resolution tier produced a result.
pub const UNKNOWN_COUNTY: &str = "Unknown";

/// A geocoded location as returned by the geocoding service.
///
/// All fields are optional: the upstream payload may omit coordinates or the
/// structured address, and callers must degrade gracefully.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LocationCandidate {
    /// Latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    pub longitude: Option<f64>,
    /// Human-readable address chosen by the geocoder.
    pub display_name: Option<String>,
    /// Structured address components keyed by field name (`postcode`, `county`, ...).
    pub address: Option<BTreeMap<String, String>>,
}

impl LocationCandidate {
    /// The postal code reported in the structured address, if any.
    pub fn postal_code(&self) -> Option<&str> {
        self.address
            .as_ref()?
            .get("postcode")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

/// A research project an article can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Project {
    Coastal,
    Healthcare,
}

impl Project {
    pub fn as_str(&self) -> &'static str {
        match self {
            Project::Coastal => "Coastal",
            Project::Healthcare => "Healthcare",
        }
    }

    fn parse(s: &str) -> Option<Project> {
        match s.trim().to_lowercase().as_str() {
            "coastal" => Some(Project::Coastal),
            "healthcare" => Some(Project::Healthcare),
            _ => None,
        }
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The distinct set of projects attached to a submission, in selection order.
///
/// Stored in the table as a comma-joined string such as `"Coastal, Healthcare"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectTags(Vec<Project>);

impl ProjectTags {
    /// Build a tag set, dropping duplicates while keeping first-seen order.
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        Self(projects.into_iter().unique().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the stored comma-joined form. Unrecognized entries are ignored.
    pub fn parse(s: &str) -> Self {
        Self::new(s.split(',').filter_map(Project::parse))
    }
}

impl fmt::Display for ProjectTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.iter().map(Project::as_str).join(", "))
    }
}

impl Serialize for ProjectTags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ProjectTags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ProjectTags::parse(&raw))
    }
}

/// One row of the shared submissions table.
///
/// Records are created once per accepted form submission and never mutated
/// afterwards. Missing coordinates are stored as empty cells, not zero.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SubmissionRecord {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Project")]
    pub project: ProjectTags,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "Town")]
    pub town: Option<String>,
    #[serde(rename = "Keywords")]
    pub keywords: Option<String>,
    #[serde(rename = "Citation")]
    pub citation: String,
    #[serde(rename = "Latitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,
    #[serde(rename = "County")]
    pub county: String,
}
