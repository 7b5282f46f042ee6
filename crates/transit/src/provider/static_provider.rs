//! In-memory transit provider.
//!
//! Serves a fixed line list and route table plus a vehicle list that can be
//! swapped at any time. Used by the data server (behind its HTTP routes) and
//! as a fake source in client tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use api_types::{LineSummary, RouteResponse, VehicleRecord};

use crate::catalog::RouteCatalog;
use crate::identifiers::*;
use crate::models::traits::{BoxFuture, TransitSource};
use crate::models::types::*;

#[derive(Clone, Debug)]
enum VehicleFeedState {
    Live(Vec<VehicleRecord>),
    Failing(String),
}

/// In-memory transit source
///
/// This type is cheap to clone since all data is stored in `Arc`s; clones
/// share the vehicle feed.
#[derive(Clone)]
pub struct StaticTransitProvider {
    lines: Arc<Vec<LineSummary>>,
    routes: Arc<HashMap<LineIdentifier, RouteResponse>>,
    vehicles: Arc<RwLock<VehicleFeedState>>,
}

impl StaticTransitProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::from_data(Vec::new(), Vec::new())
    }

    pub fn from_data(lines: Vec<LineSummary>, routes: Vec<(LineIdentifier, RouteResponse)>) -> Self {
        Self {
            lines: Arc::new(lines),
            routes: Arc::new(routes.into_iter().collect()),
            vehicles: Arc::new(RwLock::new(VehicleFeedState::Live(Vec::new()))),
        }
    }

    pub fn from_catalog(catalog: &RouteCatalog) -> Self {
        let routes = catalog
            .iter()
            .filter_map(|(name, _)| Some((LineIdentifier::new(name), catalog.route(name)?)))
            .collect();
        Self::from_data(catalog.summaries(), routes)
    }

    pub fn set_vehicles(&self, vehicles: Vec<VehicleRecord>) {
        *self.vehicles.write().unwrap_or_else(|e| e.into_inner()) = VehicleFeedState::Live(vehicles);
    }

    /// Make every vehicle poll fail until `set_vehicles` is called again
    pub fn fail_vehicles(&self, reason: impl Into<String>) {
        *self.vehicles.write().unwrap_or_else(|e| e.into_inner()) =
            VehicleFeedState::Failing(reason.into());
    }

    fn current_vehicles(&self) -> Result<Vec<VehicleRecord>> {
        match &*self.vehicles.read().unwrap_or_else(|e| e.into_inner()) {
            VehicleFeedState::Live(vehicles) => Ok(vehicles.clone()),
            VehicleFeedState::Failing(reason) => Err(TransitError::Request(reason.clone())),
        }
    }
}

impl Default for StaticTransitProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitSource for StaticTransitProvider {
    fn vehicles(&self) -> BoxFuture<'_, Result<Vec<VehicleRecord>>> {
        let result = self.current_vehicles();
        Box::pin(async move { result })
    }

    fn lines(&self) -> BoxFuture<'_, Result<Vec<LineSummary>>> {
        let lines = self.lines.as_ref().clone();
        Box::pin(async move { Ok(lines) })
    }

    fn route<'a>(&'a self, line: &'a LineIdentifier) -> BoxFuture<'a, Result<RouteResponse>> {
        Box::pin(async move {
            self.routes
                .get(line)
                .cloned()
                .ok_or_else(|| TransitError::LineNotFound(line.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use api_types::{VehicleKind, VehicleRecord};

    use super::*;

    fn tram(line: &str) -> VehicleRecord {
        VehicleRecord {
            id: None,
            lat: 51.1,
            lon: 17.03,
            line: line.into(),
            kind: VehicleKind::Tram,
        }
    }

    #[tokio::test]
    async fn test_empty_provider() {
        let provider = StaticTransitProvider::new();
        assert_eq!(provider.lines().await.unwrap().len(), 0);
        assert_eq!(provider.vehicles().await.unwrap().len(), 0);
        assert!(matches!(
            provider.route(&LineIdentifier::new("1")).await,
            Err(TransitError::LineNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_vehicle_feed_is_shared_between_clones() {
        let provider = StaticTransitProvider::new();
        let clone = provider.clone();

        provider.set_vehicles(vec![tram("1"), tram("2")]);
        assert_eq!(clone.vehicles().await.unwrap().len(), 2);

        provider.fail_vehicles("upstream timeout");
        assert!(clone.vehicles().await.is_err());
    }

    #[tokio::test]
    async fn test_from_catalog() {
        let catalog = RouteCatalog::from_json(
            r#"{"1": {"type": "tram", "directions": [{"direction_name": "a", "stops": []}]}}"#,
        )
        .unwrap();
        let provider = StaticTransitProvider::from_catalog(&catalog);

        let lines = provider.lines().await.unwrap();
        assert_eq!(lines[0].kind, VehicleKind::Tram);
        assert!(matches!(
            provider.route(&LineIdentifier::new("1")).await,
            Ok(RouteResponse::Detail(_))
        ));
    }
}
