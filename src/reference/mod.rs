//! Static reference datasets used to turn location signals into a county.
//!
//! # Submodules
//!
//! - [`postal`]: US postal code → county, read from a GeoNames postal dump
//! - [`towns`]: town name → county, read from a two-column CSV table
//!
//! Both tables are loaded once at startup and never change afterwards.

pub mod postal;
pub mod towns;

pub use postal::{PostalLookup, PostalTable};
pub use towns::TownTable;
