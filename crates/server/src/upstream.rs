//! Live positions from the MPK Wrocław vehicle feed.
//!
//! The feed is queried with a form body naming every line of interest,
//! `busList[<kind>][]=<line>`, and answers with records where `x` is the
//! latitude, `y` the longitude and `k` the course number.

use std::time::Duration;

use mpk_transit::api_types::{LineSummary, RouteResponse, VehicleKind, VehicleRecord};
use mpk_transit::{BoxFuture, LineIdentifier, Result, StaticTransitProvider, TransitError, TransitSource};
use serde::Deserialize;

pub const DEFAULT_FEED_URL: &str = "https://mpk.wroc.pl/bus_position";

#[derive(Debug, Deserialize)]
struct FeedRecord {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    x: f64,
    y: f64,
    #[serde(default)]
    k: Option<serde_json::Value>,
}

impl FeedRecord {
    fn into_vehicle(self) -> Option<VehicleRecord> {
        let Ok(kind) = self.kind.parse::<VehicleKind>() else {
            tracing::debug!(kind = %self.kind, line = %self.name, "Skipping vehicle of unknown type");
            return None;
        };
        let id = self.k.map(|k| match k {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        Some(VehicleRecord {
            id,
            lat: self.x,
            lon: self.y,
            line: self.name,
            kind,
        })
    }
}

/// Form fields asking the feed for every line
pub fn request_form(lines: &[LineSummary]) -> Vec<(String, String)> {
    lines
        .iter()
        .map(|summary| (format!("busList[{}][]", summary.kind), summary.line.to_lowercase()))
        .collect()
}

pub fn decode_positions(bytes: &[u8]) -> Result<Vec<VehicleRecord>> {
    let records: Vec<FeedRecord> = serde_json::from_slice(bytes)?;
    Ok(records.into_iter().filter_map(FeedRecord::into_vehicle).collect())
}

/// Routes from the catalog, vehicles from the live feed
pub struct MpkLiveSource {
    catalog: StaticTransitProvider,
    lines: Vec<LineSummary>,
    client: reqwest::Client,
    feed_url: String,
}

impl MpkLiveSource {
    pub fn new(catalog: StaticTransitProvider, lines: Vec<LineSummary>, feed_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mpk-viewer-server/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| TransitError::Request(e.to_string()))?;
        Ok(Self {
            catalog,
            lines,
            client,
            feed_url: feed_url.into(),
        })
    }

    async fn fetch_positions(&self) -> Result<Vec<VehicleRecord>> {
        let response = self
            .client
            .post(&self.feed_url)
            .form(&request_form(&self.lines))
            .send()
            .await
            .map_err(|e| TransitError::Request(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransitError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(TransitError::Status {
                status: status.as_u16(),
                url: self.feed_url.clone(),
                body: body.to_vec(),
            });
        }

        let vehicles = decode_positions(&body)?;
        tracing::debug!(count = vehicles.len(), "Fetched live positions");
        Ok(vehicles)
    }
}

impl TransitSource for MpkLiveSource {
    fn vehicles(&self) -> BoxFuture<'_, Result<Vec<VehicleRecord>>> {
        Box::pin(self.fetch_positions())
    }

    fn lines(&self) -> BoxFuture<'_, Result<Vec<LineSummary>>> {
        self.catalog.lines()
    }

    fn route<'a>(&'a self, line: &'a LineIdentifier) -> BoxFuture<'a, Result<RouteResponse>> {
        self.catalog.route(line)
    }
}
