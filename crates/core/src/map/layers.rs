//! In-memory map surface.
//!
//! [`LayerStore`] keeps every drawable the viewer has put on the map and
//! the current viewport. Front ends render from it (the viewer binary
//! serves it as GeoJSON), and tests inspect it directly.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use geo::{Point, Rect};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};
use serde::Serialize;

use super::style::to_hex;
use super::{Drawable, DrawableHandle, MapSurface, MarkerStyle, PathStyle};
use crate::theme::BaseLayer;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Viewport {
    Center { center: Point, zoom: u8 },
    Bounds(Rect),
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ViewportJson {
    Center { lat: f64, lon: f64, zoom: u8 },
    Bounds { south: f64, west: f64, north: f64, east: f64 },
}

impl From<Viewport> for ViewportJson {
    fn from(viewport: Viewport) -> Self {
        match viewport {
            Viewport::Center { center, zoom } => ViewportJson::Center {
                lat: center.y(),
                lon: center.x(),
                zoom,
            },
            Viewport::Bounds(rect) => ViewportJson::Bounds {
                south: rect.min().y,
                west: rect.min().x,
                north: rect.max().y,
                east: rect.max().x,
            },
        }
    }
}

#[derive(Debug)]
pub struct LayerStore {
    next_id: u64,
    drawables: BTreeMap<u64, Drawable>,
    viewport: Viewport,
}

impl LayerStore {
    pub fn new(center: Point, zoom: u8) -> Self {
        Self {
            next_id: 0,
            drawables: BTreeMap::new(),
            viewport: Viewport::Center { center, zoom },
        }
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    pub fn contains(&self, handle: &DrawableHandle) -> bool {
        self.drawables.contains_key(&handle.id())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn tile_layers(&self) -> Vec<BaseLayer> {
        self.drawables
            .values()
            .filter_map(|d| match d {
                Drawable::TileLayer(layer) => Some(*layer),
                _ => None,
            })
            .collect()
    }

    pub fn polylines(&self) -> impl Iterator<Item = (&geo::LineString, &PathStyle)> {
        self.drawables.values().filter_map(|d| match d {
            Drawable::Polyline { path, style } => Some((path, style)),
            _ => None,
        })
    }

    pub fn markers(&self) -> impl Iterator<Item = (&Point, &MarkerStyle, Option<&str>)> {
        self.drawables.values().filter_map(|d| match d {
            Drawable::Marker {
                position,
                style,
                popup,
            } => Some((position, style, popup.as_deref())),
            _ => None,
        })
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        let features = self
            .drawables
            .iter()
            .map(|(id, drawable)| feature(*id, drawable))
            .collect();

        let mut foreign_members = JsonObject::new();
        if let Ok(viewport) = serde_json::to_value(ViewportJson::from(self.viewport)) {
            foreign_members.insert("viewport".into(), viewport);
        }

        FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(foreign_members),
        }
    }
}

fn feature(id: u64, drawable: &Drawable) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("id".into(), JsonValue::from(id));

    let geometry = match drawable {
        Drawable::TileLayer(layer) => {
            properties.insert("kind".into(), "tile_layer".into());
            properties.insert("layer".into(), layer.to_string().into());
            properties.insert("url".into(), layer.tile_url().into());
            properties.insert("attribution".into(), layer.attribution().into());
            None
        }
        Drawable::Polyline { path, style } => {
            properties.insert("kind".into(), "polyline".into());
            properties.insert("color".into(), to_hex(style.color).into());
            properties.insert("weight".into(), JsonValue::from(style.weight));
            properties.insert("opacity".into(), JsonValue::from(style.opacity));
            // A LineString needs two positions
            if path.0.len() < 2 {
                properties.insert("empty".into(), true.into());
                None
            } else {
                Some(Geometry::new(geojson::Value::from(path)))
            }
        }
        Drawable::Marker {
            position,
            style,
            popup,
        } => {
            properties.insert("kind".into(), "marker".into());
            properties.insert("radius".into(), JsonValue::from(style.radius));
            properties.insert("fill".into(), to_hex(style.fill).into());
            properties.insert("fill_opacity".into(), JsonValue::from(style.fill_opacity));
            properties.insert("border_color".into(), to_hex(style.border_color).into());
            properties.insert("border_width".into(), JsonValue::from(style.border_width));
            if let Some(popup) = popup {
                properties.insert("popup".into(), popup.as_str().into());
            }
            Some(Geometry::new(geojson::Value::from(position)))
        }
    };

    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

impl MapSurface for LayerStore {
    fn add(&mut self, drawable: Drawable) -> DrawableHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.drawables.insert(id, drawable);
        DrawableHandle::from_raw(id)
    }

    fn remove(&mut self, handle: DrawableHandle) {
        if self.drawables.remove(&handle.id()).is_none() {
            tracing::warn!(id = handle.id(), "Removing a drawable that is not on the map");
        }
    }

    fn fit_bounds(&mut self, bounds: Rect) {
        self.viewport = Viewport::Bounds(bounds);
    }
}

/// A [`LayerStore`] shared between the live map loop and whoever renders it
#[derive(Clone, Debug)]
pub struct SharedLayerStore(Arc<Mutex<LayerStore>>);

impl SharedLayerStore {
    pub fn new(store: LayerStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub fn lock(&self) -> MutexGuard<'_, LayerStore> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MapSurface for SharedLayerStore {
    fn add(&mut self, drawable: Drawable) -> DrawableHandle {
        self.lock().add(drawable)
    }

    fn remove(&mut self, handle: DrawableHandle) {
        self.lock().remove(handle)
    }

    fn fit_bounds(&mut self, bounds: Rect) {
        self.lock().fit_bounds(bounds)
    }
}
