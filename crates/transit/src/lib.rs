//! # mpk-transit
//!
//! Transit data access for the live map viewer.
//!
//! ## Features
//!
//! - **Pluggable sources**: the [`TransitSource`] trait hides whether data
//!   comes from the HTTP data server or from memory
//! - **Pluggable networking**: implement [`DataFetcher`] to bring your own
//!   HTTP stack; [`HttpFetcher`] uses `reqwest`
//! - **Route catalog**: load and rewrite the scraped `routes.json`
//! - **Stop geometry**: polylines and bounds from stop coordinates
//!
//! ## Example
//!
//! ```
//! use mpk_transit::prelude::*;
//! use mpk_transit::api_types::RouteResponse;
//!
//! let catalog = RouteCatalog::from_json(r#"{
//!     "10": {"type": "tram", "directions": [{
//!         "direction_name": "LEŚNICA -> BISKUPIN",
//!         "stops": [
//!             {"name": "LEŚNICA", "lat": 51.14, "lon": 16.86},
//!             {"name": "Rynek"},
//!             {"name": "BISKUPIN", "lat": 51.10, "lon": 17.10}
//!         ]
//!     }]}
//! }"#).unwrap();
//!
//! let Some(RouteResponse::Detail(detail)) = catalog.route("10") else { unreachable!() };
//! let path = direction_path(&detail.directions[0]);
//! assert_eq!(path.0.len(), 2); // "Rynek" has no coordinates
//! ```

pub mod catalog;
pub mod identifiers;
pub mod models;
pub mod network;
pub mod provider;
pub mod spatial;

pub use api_types;

// Re-exports for convenience
pub mod prelude {
    pub use crate::catalog::RouteCatalog;
    pub use crate::identifiers::*;
    pub use crate::models::{traits::*, types::*};
    pub use crate::network::{DataFetcher, HttpFetcher};
    pub use crate::provider::{RemoteTransitSource, StaticTransitProvider};
    pub use crate::spatial::{bounding_rect, direction_path, stop_location};
}

pub use prelude::*;
