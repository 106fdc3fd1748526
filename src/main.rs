//! # helene_news
//!
//! A submission tool for collecting news coverage of Hurricane Helene into a
//! shared CSV table. Each submitted article link is turned into a citation,
//! the supplied address is geocoded, a county is resolved, and the row is
//! appended to the table, which is then redisplayed.
//!
//! ## Usage
//!
//! ```sh
//! helene_news submit --link https://... --project coastal --city Asheville
//! helene_news list
//! ```
//!
//! ## Architecture
//!
//! A submission is one linear pipeline:
//! 1. **Validation**: link and at least one project are required
//! 2. **Enrichment**: citation download and geocoding run side by side
//! 3. **Resolution**: geocoded ZIP → town table → typed ZIP → "Unknown"
//! 4. **Persistence**: the full table is rewritten with the new row

use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod citation;
mod cli;
mod config;
mod form;
mod geocode;
mod models;
mod outputs;
mod reference;
mod resolver;
mod store;
mod utils;

use citation::CitationBuilder;
use citation::fetch::{HttpFetcher, RetryFetch};
use cli::{Cli, Command, ListArgs, ListFormat, SubmitArgs};
use config::Config;
use form::{Services, SubmitError, submit};
use geocode::NominatimClient;
use outputs::{json, table};
use reference::{PostalTable, TownTable};
use resolver::CountyResolver;
use store::SubmissionStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();

    let args = Cli::parse();
    let mut config = Config::load_or_default(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    debug!(?config, "Resolved configuration");

    let store = SubmissionStore::new(&config.store_path);

    match args.command {
        Command::Submit(submit_args) => run_submit(submit_args, &config, &store).await?,
        Command::List(list_args) => run_list(list_args, &store).await?,
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, "Execution complete");
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_submit(
    args: SubmitArgs,
    config: &Config,
    store: &SubmissionStore,
) -> Result<(), Box<dyn Error>> {
    let form = args.into_form(&config.default_state);
    if let Err(e) = form.validate() {
        eprintln!("{e}");
        std::process::exit(2);
    }

    // Reference data and clients live for the whole submission.
    let towns = TownTable::load(&config.towns_path)?;
    let postal = PostalTable::load(&config.postal_path)?;
    let resolver = CountyResolver::new(&postal, &towns);
    let geocoder = NominatimClient::new(&config.geocoder)?;
    let fetcher = RetryFetch::new(
        HttpFetcher::new(&config.http)?,
        config.http.max_retries,
        Duration::from_secs(1),
    );
    let citations = CitationBuilder::new(fetcher);

    let services = Services {
        geocoder: &geocoder,
        citations: &citations,
        resolver: &resolver,
        store,
    };

    let record = match submit(&form, &services).await {
        Ok(record) => record,
        Err(SubmitError::Invalid(e)) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
        Err(e) => {
            error!(error = %e, path = %store.path().display(), "Submission failed");
            return Err(e.into());
        }
    };

    println!("Article submitted and saved with ID #{}", record.id);
    println!("{}", serde_json::to_string_pretty(&record)?);
    println!();
    println!("Submitted Articles");
    println!("{}", table::render(&store.load()?));
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn run_list(args: ListArgs, store: &SubmissionStore) -> Result<(), Box<dyn Error>> {
    let records = store.load()?;
    match (args.format, args.output) {
        (ListFormat::Json, Some(path)) => json::write_records(&records, &path).await?,
        (ListFormat::Json, None) => println!("{}", json::to_json(&records)?),
        (ListFormat::Table, _) => print!("{}", table::render(&records)),
    }
    Ok(())
}
