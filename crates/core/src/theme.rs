//! Day/night base layer selection.

use chrono::Timelike;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::map::{Drawable, DrawableHandle, MapSurface};

/// First hour (inclusive) that counts as day
pub const DAY_STARTS_AT: u32 = 6;
/// First hour (inclusive) that counts as night
pub const NIGHT_STARTS_AT: u32 = 20;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BaseLayer {
    Street,
    Dark,
    Satellite,
}

impl BaseLayer {
    pub fn tile_url(&self) -> &'static str {
        match self {
            BaseLayer::Street => "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            BaseLayer::Dark => "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
            BaseLayer::Satellite => {
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
            }
        }
    }

    pub fn attribution(&self) -> &'static str {
        match self {
            BaseLayer::Street => "&copy; OpenStreetMap contributors",
            BaseLayer::Dark => "&copy; OpenStreetMap contributors &copy; CARTO",
            BaseLayer::Satellite => "Tiles &copy; Esri",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    Day,
    Night,
}

impl Theme {
    /// Night covers `[20:00, 06:00)` local time
    pub fn for_hour(hour: u32) -> Self {
        if !(DAY_STARTS_AT..NIGHT_STARTS_AT).contains(&hour) {
            Theme::Night
        } else {
            Theme::Day
        }
    }

    pub fn base_layer(self) -> BaseLayer {
        match self {
            Theme::Day => BaseLayer::Street,
            Theme::Night => BaseLayer::Dark,
        }
    }
}

/// Hour of the local wall clock
pub fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

/// Owns the base tile layer
///
/// At most one of the street theme layer and the satellite layer is on the
/// map. While satellite is shown, periodic theme refreshes do nothing.
#[derive(Debug, Default)]
pub struct ThemeSelector {
    current: Option<(BaseLayer, DrawableHandle)>,
    satellite: Option<DrawableHandle>,
}

impl ThemeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_satellite(&self) -> bool {
        self.satellite.is_some()
    }

    /// The base layer currently on the map, if any
    pub fn active_layer(&self) -> Option<BaseLayer> {
        if self.satellite.is_some() {
            Some(BaseLayer::Satellite)
        } else {
            self.current.as_ref().map(|(layer, _)| *layer)
        }
    }

    /// Make the street base layer match the hour. Returns whether the map
    /// changed.
    pub fn refresh(&mut self, surface: &mut dyn MapSurface, hour: u32) -> bool {
        if self.satellite.is_some() {
            return false;
        }

        let target = Theme::for_hour(hour).base_layer();
        if matches!(self.current, Some((layer, _)) if layer == target) {
            return false;
        }

        if let Some((previous, handle)) = self.current.take() {
            tracing::debug!(%previous, %target, "Switching base layer");
            surface.remove(handle);
        }
        let handle = surface.add(Drawable::TileLayer(target));
        self.current = Some((target, handle));
        true
    }

    pub fn show_satellite(&mut self, surface: &mut dyn MapSurface) {
        if let Some((_, handle)) = self.current.take() {
            surface.remove(handle);
        }
        if self.satellite.is_none() {
            self.satellite = Some(surface.add(Drawable::TileLayer(BaseLayer::Satellite)));
        }
    }

    /// Leave satellite mode and restore the layer for `hour`
    pub fn show_street(&mut self, surface: &mut dyn MapSurface, hour: u32) -> bool {
        if let Some(handle) = self.satellite.take() {
            surface.remove(handle);
        }
        self.refresh(surface, hour)
    }
}

#[cfg(test)]
mod tests {
    use geo::Point;

    use super::*;
    use crate::map::LayerStore;

    fn surface() -> LayerStore {
        LayerStore::new(Point::new(17.0385, 51.1079), 13)
    }

    #[test]
    fn test_theme_boundaries() {
        assert_eq!(Theme::for_hour(5), Theme::Night);
        assert_eq!(Theme::for_hour(6), Theme::Day);
        assert_eq!(Theme::for_hour(19), Theme::Day);
        assert_eq!(Theme::for_hour(20), Theme::Night);
        assert_eq!(Theme::for_hour(0), Theme::Night);
    }

    #[test]
    fn test_refresh_swaps_layer_once() {
        let mut surface = surface();
        let mut selector = ThemeSelector::new();

        assert!(selector.refresh(&mut surface, 10));
        assert_eq!(surface.tile_layers(), vec![BaseLayer::Street]);

        assert!(!selector.refresh(&mut surface, 12));
        assert_eq!(surface.len(), 1);

        assert!(selector.refresh(&mut surface, 21));
        assert_eq!(surface.tile_layers(), vec![BaseLayer::Dark]);
        assert_eq!(selector.active_layer(), Some(BaseLayer::Dark));
    }

    #[test]
    fn test_satellite_suspends_theme() {
        let mut surface = surface();
        let mut selector = ThemeSelector::new();
        selector.refresh(&mut surface, 10);

        selector.show_satellite(&mut surface);
        assert_eq!(surface.tile_layers(), vec![BaseLayer::Satellite]);
        assert!(!selector.refresh(&mut surface, 22));
        assert_eq!(surface.tile_layers(), vec![BaseLayer::Satellite]);

        selector.show_street(&mut surface, 22);
        assert_eq!(surface.tile_layers(), vec![BaseLayer::Dark]);
        assert!(!selector.is_satellite());
    }

    #[test]
    fn test_base_layer_names() {
        assert_eq!("satellite".parse::<BaseLayer>().unwrap(), BaseLayer::Satellite);
        assert_eq!(BaseLayer::Street.to_string(), "street");
    }
}
