//! The data source consumed by map clients.
//!
//! Implementations can be remote (HTTP) or in-memory.

use std::future::Future;
use std::pin::Pin;

use api_types::{LineSummary, RouteResponse, VehicleRecord};

use crate::identifiers::LineIdentifier;
use crate::models::types::Result;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Supplier of live vehicles, the line list and per-line route detail
pub trait TransitSource: Send + Sync {
    /// Every vehicle currently reporting a position
    fn vehicles(&self) -> BoxFuture<'_, Result<Vec<VehicleRecord>>>;

    /// All lines with their vehicle kind
    fn lines(&self) -> BoxFuture<'_, Result<Vec<LineSummary>>>;

    /// Directions and stops of one line
    ///
    /// A payload-level error comes back as `Ok(RouteResponse::Unavailable)`;
    /// transport failures as `Err`. Callers treat both as unavailable.
    fn route<'a>(&'a self, line: &'a LineIdentifier) -> BoxFuture<'a, Result<RouteResponse>>;
}
