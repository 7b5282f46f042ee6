//! HTTP-backed transit source talking to the viewer data server.

use api_types::{LineSummary, RouteResponse, VehicleRecord};
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::identifiers::LineIdentifier;
use crate::models::traits::{BoxFuture, TransitSource};
use crate::models::types::{Result, TransitError};
use crate::network::traits::DataFetcher;

pub struct RemoteTransitSource<F> {
    fetcher: F,
    base_url: Url,
}

impl<F: DataFetcher> RemoteTransitSource<F> {
    pub fn new(fetcher: F, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransitError::InvalidData(format!("base url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransitError::InvalidData(format!(
                "base url {base_url} cannot hold a path"
            )));
        }
        Ok(Self { fetcher, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends percent-encoded path segments to the base url
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TransitError::InvalidData(format!("base url {} cannot hold a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments)?;
        let bytes = self.fetcher.fetch(url.as_str()).await?;
        decode(&bytes)
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| TransitError::SerializationError(e.to_string()))
}

impl<F: DataFetcher> TransitSource for RemoteTransitSource<F> {
    fn vehicles(&self) -> BoxFuture<'_, Result<Vec<VehicleRecord>>> {
        Box::pin(async move { self.get_json(&["api", "vehicles"]).await })
    }

    fn lines(&self) -> BoxFuture<'_, Result<Vec<LineSummary>>> {
        Box::pin(async move { self.get_json(&["api", "routes"]).await })
    }

    fn route<'a>(&'a self, line: &'a LineIdentifier) -> BoxFuture<'a, Result<RouteResponse>> {
        Box::pin(async move {
            let url = self.url(&["api", "routes", line.as_str()])?;
            match self.fetcher.fetch(url.as_str()).await {
                Ok(bytes) => decode(&bytes),
                // A 404 still carries `{"error": ...}`; prefer that message
                Err(TransitError::Status { status, url, body }) => match decode(&body) {
                    Ok(response @ RouteResponse::Unavailable(_)) => {
                        tracing::debug!(%line, status, "Route unavailable on data server");
                        Ok(response)
                    }
                    _ => Err(TransitError::Status { status, url, body }),
                },
                Err(err) => Err(err),
            }
        })
    }
}
