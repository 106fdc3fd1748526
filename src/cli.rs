//! Command-line interface definitions for helene_news.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Data file locations can be provided via flags, environment variables or
//! the YAML config file, in that order of precedence.

use crate::config::Config;
use crate::form::SubmissionForm;
use crate::models::Project;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for helene_news.
///
/// # Examples
///
/// ```sh
/// # Submit an article for the Coastal project
/// helene_news submit --link https://www.wral.com/story/... --project coastal \
///     --street-number 100 --street-name "E Franklin St" --city "Chapel Hill"
///
/// # Show everything submitted so far
/// helene_news list
///
/// # Export the table as JSON
/// helene_news list --format json --output ./news.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to config.yaml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Shared CSV table of submissions
    #[arg(long, env = "HELENE_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Town-to-county CSV (Town, County columns)
    #[arg(long, env = "HELENE_TOWNS", global = true)]
    pub towns: Option<PathBuf>,

    /// GeoNames US postal code file (US.txt)
    #[arg(long, env = "HELENE_POSTAL", global = true)]
    pub postal: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Submit a news article and append it to the shared table
    Submit(SubmitArgs),
    /// Display every submitted article
    List(ListArgs),
}

/// The submission form fields.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Link to the article (required)
    #[arg(short, long, default_value = "")]
    pub link: String,

    /// Project; repeat for both
    #[arg(short, long = "project", value_enum)]
    pub projects: Vec<Project>,

    #[arg(long)]
    pub street_number: Option<String>,

    #[arg(long)]
    pub street_name: Option<String>,

    /// City (capitalize first letter of each word)
    #[arg(long)]
    pub city: Option<String>,

    /// State; defaults to the configured default state
    #[arg(long)]
    pub state: Option<String>,

    /// Zip code, used if geocoding fails
    #[arg(long)]
    pub zip: Option<String>,

    /// Latitude, used if geocoding fails
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<String>,

    /// Longitude, used if geocoding fails
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<String>,

    /// Name of a person in the article
    #[arg(long)]
    pub name: Option<String>,

    /// Place or district
    #[arg(long)]
    pub town: Option<String>,

    /// Keywords, e.g. "flooding, illness"
    #[arg(long)]
    pub keywords: Option<String>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(short, long, value_enum, default_value_t = ListFormat::Table)]
    pub format: ListFormat,

    /// Write JSON to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    Json,
}

impl Cli {
    /// Apply path overrides from flags and environment on top of the config file.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(p) = &self.store {
            config.store_path = p.clone();
        }
        if let Some(p) = &self.towns {
            config.towns_path = p.clone();
        }
        if let Some(p) = &self.postal {
            config.postal_path = p.clone();
        }
    }
}

impl SubmitArgs {
    /// Build the form, filling the state from configuration when not given.
    pub fn into_form(self, default_state: &str) -> SubmissionForm {
        SubmissionForm {
            link: self.link,
            projects: self.projects,
            street_number: self.street_number,
            street_name: self.street_name,
            city: self.city,
            state: self
                .state
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| default_state.to_string()),
            zip: self.zip,
            latitude: self.lat,
            longitude: self.lon,
            name: self.name,
            town: self.town,
            keywords: self.keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_parsing() {
        let cli = Cli::parse_from([
            "helene_news",
            "submit",
            "--link",
            "https://example.com/a",
            "--project",
            "coastal",
            "--project",
            "healthcare",
            "--city",
            "Chapel Hill",
            "--lon",
            "-79.05",
        ]);

        let Command::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        let form = args.into_form("North Carolina");
        assert_eq!(form.link, "https://example.com/a");
        assert_eq!(form.projects, vec![Project::Coastal, Project::Healthcare]);
        assert_eq!(form.city.as_deref(), Some("Chapel Hill"));
        assert_eq!(form.state, "North Carolina");
        assert_eq!(form.longitude.as_deref(), Some("-79.05"));
    }

    #[test]
    fn test_submit_without_required_fields_still_parses() {
        let cli = Cli::parse_from(["helene_news", "submit"]);
        let Command::Submit(args) = cli.command else {
            panic!("expected submit");
        };
        let form = args.into_form("North Carolina");
        assert!(form.validate().is_err());
    }

    #[test]
    fn test_list_flags_and_overrides() {
        let cli = Cli::parse_from([
            "helene_news",
            "list",
            "-f",
            "json",
            "--store",
            "/tmp/news.csv",
        ]);
        let Command::List(args) = &cli.command else {
            panic!("expected list");
        };
        assert_eq!(args.format, ListFormat::Json);

        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.store_path, PathBuf::from("/tmp/news.csv"));
        assert_eq!(config.towns_path, Config::default().towns_path);
    }
}
