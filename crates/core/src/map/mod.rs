//! The map surface the viewer draws on.
//!
//! Everything the viewer shows (base tiles, route polylines, vehicle and
//! stop markers) goes through [`MapSurface`]. Each `add` hands back a
//! [`DrawableHandle`] that must eventually be passed to `remove`; the
//! components own their handles, so nothing is left behind on the map
//! when a component is torn down.

pub mod layers;
pub mod style;

use geo::{LineString, Point, Rect};

use crate::theme::BaseLayer;

pub use layers::{LayerStore, SharedLayerStore, Viewport};
pub use style::{Color, MarkerStyle, PathStyle, RoutePalette};

#[derive(Clone, Debug, PartialEq)]
pub enum Drawable {
    TileLayer(BaseLayer),
    Polyline {
        path: LineString,
        style: PathStyle,
    },
    Marker {
        position: Point,
        style: MarkerStyle,
        popup: Option<String>,
    },
}

/// Proof that a drawable is on the map
///
/// Not `Clone`: a drawable is removed exactly once, by whoever holds its
/// handle.
#[must_use = "the drawable stays on the map until this handle is passed to `MapSurface::remove`"]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct DrawableHandle(u64);

impl DrawableHandle {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

pub trait MapSurface {
    fn add(&mut self, drawable: Drawable) -> DrawableHandle;

    fn remove(&mut self, handle: DrawableHandle);

    fn fit_bounds(&mut self, bounds: Rect);
}

/// Remove every drawable in `handles`, leaving it empty
pub fn remove_all(surface: &mut dyn MapSurface, handles: &mut Vec<DrawableHandle>) {
    for handle in handles.drain(..) {
        surface.remove(handle);
    }
}
