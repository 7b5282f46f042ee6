//! Geocoding of stops without coordinates through Nominatim.
//!
//! Requests are spaced at least `min_delay` apart, failed lookups are
//! retried, and the catalog is checkpointed after every located stop so an
//! interrupted run loses nothing.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use mpk_transit::catalog::RouteCatalog;
use serde::Deserialize;
use tokio::time::{self, Instant};

use crate::scrape::UNKNOWN_STREET;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const CITY: &str = "Wroclaw, Poland";

pub fn query_for(name: &str, street: Option<&str>) -> String {
    match street {
        Some(street) if street != UNKNOWN_STREET => format!("{name}, {street}, {CITY}"),
        _ => format!("{name}, {CITY}"),
    }
}

pub trait Geocoder {
    /// `(lat, lon)` of the best match, `None` when nothing matched
    fn locate(&mut self, query: &str) -> impl Future<Output = Result<Option<(f64, f64)>>> + Send;
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

/// First place of a Nominatim `format=json` answer
pub fn first_place(body: &[u8]) -> Result<Option<(f64, f64)>> {
    let places: Vec<Place> = serde_json::from_slice(body)?;
    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };
    let lat = place.lat.parse().with_context(|| format!("Invalid latitude {:?}", place.lat))?;
    let lon = place.lon.parse().with_context(|| format!("Invalid longitude {:?}", place.lon))?;
    Ok(Some((lat, lon)))
}

pub struct Nominatim {
    client: reqwest::Client,
    endpoint: String,
    min_delay: Duration,
    next_request: Option<Instant>,
}

impl Nominatim {
    pub fn new(endpoint: impl Into<String>, min_delay: Duration, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("route-data/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            min_delay,
            next_request: None,
        })
    }
}

impl Geocoder for Nominatim {
    async fn locate(&mut self, query: &str) -> Result<Option<(f64, f64)>> {
        if let Some(at) = self.next_request {
            time::sleep_until(at).await;
        }
        self.next_request = Some(Instant::now() + self.min_delay);

        let body = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        first_place(&body)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            wait: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct GeocodeSummary {
    pub located: usize,
    pub not_found: usize,
    pub stops_updated: usize,
}

/// Look up every unique stop missing coordinates and write the result onto
/// all matching stops. `checkpoint` runs after each located stop.
pub async fn geocode_missing<G: Geocoder>(
    catalog: &mut RouteCatalog,
    geocoder: &mut G,
    retry: RetryPolicy,
    mut checkpoint: impl FnMut(&RouteCatalog) -> Result<()>,
) -> Result<GeocodeSummary> {
    let missing = catalog.stops_missing_coordinates();
    let total = missing.len();
    log::info!("Found {total} stops without coordinates");

    let mut summary = GeocodeSummary::default();
    for (i, (name, street)) in missing.into_iter().enumerate() {
        let query = query_for(&name, street.as_deref());
        let Some((lat, lon)) = locate_with_retry(geocoder, &query, retry).await else {
            summary.not_found += 1;
            log::warn!("[{}/{total}] {name} not found", i + 1);
            continue;
        };

        summary.stops_updated += catalog.set_stop_coordinates(&name, street.as_deref(), lat, lon);
        summary.located += 1;
        checkpoint(catalog)?;
        log::info!("[{}/{total}] {name} saved", i + 1);
    }
    Ok(summary)
}

async fn locate_with_retry<G: Geocoder>(
    geocoder: &mut G,
    query: &str,
    retry: RetryPolicy,
) -> Option<(f64, f64)> {
    for attempt in 1..=retry.attempts {
        match geocoder.locate(query).await {
            Ok(found) => return found,
            Err(e) => {
                log::warn!("Error geocoding {query} ({attempt}/{}): {e:#}", retry.attempts);
                time::sleep(retry.wait).await;
            }
        }
    }
    None
}
