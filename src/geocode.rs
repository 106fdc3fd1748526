//! Address geocoding through the Nominatim search API.
//!
//! # Architecture
//!
//! - [`Geocoder`]: Core trait resolving free text to a [`LocationCandidate`]
//! - [`NominatimClient`]: HTTP implementation against a Nominatim endpoint
//! - [`RateLimiter`]: Enforces a minimum interval between upstream requests
//!
//! # Failure Policy
//!
//! Geocoding never fails a submission. Timeouts, transport errors, bad
//! statuses and undecodable payloads are logged and reported as "no result".

use crate::config::GeocoderConfig;
use crate::models::LocationCandidate;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::time::Duration;
use thiserror::Error as ThisError;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};
use urlencoding::encode;

/// Nominatim's usage policy allows at most one request per second.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(1);

/// Trait for turning an address into a location.
///
/// Implementors return `None` for every kind of failure; callers treat a
/// missing location as a normal outcome.
pub trait Geocoder {
    async fn geocode(&self, address: &str) -> Option<LocationCandidate>;
}

/// Read the postal code out of a candidate's structured address.
pub fn extract_postal_code(location: Option<&LocationCandidate>) -> Option<String> {
    location?.postal_code().map(str::to_string)
}

/// Guarantees a minimum delay between the starts of consecutive calls.
#[derive(Debug)]
pub struct RateLimiter {
    min_delay: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until a call is allowed, then mark it as started.
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(prev) = *last_call {
            let elapsed = prev.elapsed();
            if elapsed < self.min_delay {
                let wait = self.min_delay - elapsed;
                debug!(?wait, "Rate limiting geocoder request");
                sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

#[derive(Debug, ThisError)]
enum GeocodeError {
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// One entry of a Nominatim `jsonv2` search response.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: Option<String>,
    lon: Option<String>,
    display_name: Option<String>,
    #[serde(default)]
    address: Option<BTreeMap<String, serde_json::Value>>,
}

impl From<NominatimPlace> for LocationCandidate {
    fn from(place: NominatimPlace) -> Self {
        let address = place.address.map(|fields| {
            fields
                .into_iter()
                .filter_map(|(k, v)| match v {
                    serde_json::Value::String(s) => Some((k, s)),
                    _ => None,
                })
                .collect()
        });
        LocationCandidate {
            latitude: place.lat.as_deref().and_then(|s| s.trim().parse().ok()),
            longitude: place.lon.as_deref().and_then(|s| s.trim().parse().ok()),
            display_name: place.display_name,
            address,
        }
    }
}

/// Decode a Nominatim search body, keeping the best (first) match.
fn parse_search_response(body: &str) -> Result<Option<LocationCandidate>, serde_json::Error> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)?;
    Ok(places.into_iter().next().map(LocationCandidate::from))
}

/// An address with no letters or digits (e.g. `" ,  , "`) is not worth a request.
fn is_blank_address(address: &str) -> bool {
    !address.chars().any(char::is_alphanumeric)
}

/// Rate-limited Nominatim search client.
#[derive(Debug)]
pub struct NominatimClient {
    client: Client,
    endpoint: String,
    limiter: RateLimiter,
}

impl NominatimClient {
    /// Build a client from configuration.
    ///
    /// The configured delay is raised to [`MIN_REQUEST_INTERVAL`] if lower.
    pub fn new(config: &GeocoderConfig) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let min_delay = Duration::from_millis(config.min_delay_ms).max(MIN_REQUEST_INTERVAL);
        info!(endpoint = %config.endpoint, ?min_delay, "Geocoder initialized");
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            limiter: RateLimiter::new(min_delay),
        })
    }

    fn search_url(&self, address: &str) -> String {
        format!(
            "{}?q={}&format=jsonv2&addressdetails=1&limit=1",
            self.endpoint.trim_end_matches('/'),
            encode(address)
        )
    }

    async fn search(&self, address: &str) -> Result<Option<LocationCandidate>, GeocodeError> {
        self.limiter.acquire().await;
        let url = self.search_url(address);
        let response = self.client.get(&url).send().await.map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status));
        }
        let body = response.text().await.map_err(classify)?;
        Ok(parse_search_response(&body)?)
    }
}

fn classify(e: reqwest::Error) -> GeocodeError {
    if e.is_timeout() {
        GeocodeError::Timeout
    } else {
        GeocodeError::Http(e)
    }
}

impl Geocoder for NominatimClient {
    #[instrument(level = "info", skip_all, fields(%address))]
    async fn geocode(&self, address: &str) -> Option<LocationCandidate> {
        if is_blank_address(address) {
            debug!("Blank address; skipping geocoder");
            return None;
        }

        match self.search(address).await {
            Ok(Some(location)) => {
                info!(
                    lat = ?location.latitude,
                    lon = ?location.longitude,
                    postcode = ?location.postal_code(),
                    "Geocoded address"
                );
                Some(location)
            }
            Ok(None) => {
                info!("Geocoder returned no match");
                None
            }
            Err(GeocodeError::Timeout) => {
                warn!("Geocoder timed out; continuing without coordinates");
                None
            }
            Err(e) => {
                warn!(error = %e, "Geocoding failed; continuing without coordinates");
                None
            }
        }
    }
}
