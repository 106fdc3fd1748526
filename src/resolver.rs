//! County resolution from the location signals collected by the form.
//!
//! Tiers are tried in order and the first hit wins:
//!
//! 1. postal code reported by the geocoder
//! 2. city typed by the user, matched against the town table
//! 3. ZIP code typed by the user
//!
//! When every tier misses, the county is [`UNKNOWN_COUNTY`].

use crate::geocode::extract_postal_code;
use crate::models::{LocationCandidate, UNKNOWN_COUNTY};
use crate::reference::{PostalLookup, TownTable};
use tracing::debug;

/// Resolves a county name from a geocoded location, a city and a ZIP code.
#[derive(Debug)]
pub struct CountyResolver<'a, P> {
    postal: &'a P,
    towns: &'a TownTable,
}

impl<'a, P: PostalLookup> CountyResolver<'a, P> {
    pub fn new(postal: &'a P, towns: &'a TownTable) -> Self {
        Self { postal, towns }
    }

    /// Resolve a county. Never fails and never returns an empty string.
    pub fn resolve(
        &self,
        location: Option<&LocationCandidate>,
        city_input: Option<&str>,
        zip_input: Option<&str>,
    ) -> String {
        if let Some(code) = extract_postal_code(location) {
            if let Some(county) = self.postal_county(&code) {
                debug!(tier = "geocoded_postcode", %code, %county, "Resolved county");
                return county;
            }
        }

        if let Some(city) = filled(city_input) {
            if let Some(county) = self.towns.lookup(city).filter(|c| !c.is_empty()) {
                debug!(tier = "town_table", %city, %county, "Resolved county");
                return county.to_string();
            }
        }

        if let Some(code) = filled(zip_input) {
            if let Some(county) = self.postal_county(code) {
                debug!(tier = "manual_zip", %code, %county, "Resolved county");
                return county;
            }
        }

        debug!("No tier resolved a county");
        UNKNOWN_COUNTY.to_string()
    }

    fn postal_county(&self, code: &str) -> Option<String> {
        self.postal
            .lookup_county(code)
            .filter(|county| !county.trim().is_empty())
    }
}

fn filled(input: Option<&str>) -> Option<&str> {
    input.filter(|s| !s.trim().is_empty())
}
