//! # mpk-viewer-core
//!
//! The live map's client-side logic: picking the base layer, keeping
//! vehicle markers in sync with the feed, grouping a line's directions
//! into routes and rendering them, all driven by one [`LiveMap`] loop.
//! Drawing goes through the [`map::MapSurface`] trait, so the same code
//! runs against a real map widget or the in-memory [`map::LayerStore`].

pub mod config;
pub mod grouping;
pub mod lines;
pub mod live;
pub mod map;
pub mod panel;
pub mod session;
pub mod theme;
pub mod vehicles;

// Re-export transit from the transit crate
pub use mpk_transit as transit;

pub use config::{ConfigError, InitialView, ViewerConfig};
pub use grouping::{RouteGroup, RouteGroupKey, group_directions};
pub use live::{Command, LiveMap, LiveMapHandle, ViewerError};
pub use panel::{PanelSnapshot, RoutePanel};
pub use session::{RouteSelection, RouteSession};
pub use theme::{BaseLayer, Theme, ThemeSelector};
pub use vehicles::VehicleReconciler;
