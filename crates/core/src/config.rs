//! Viewer configuration.

use std::path::Path;
use std::time::Duration;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::map::LayerStore;
use crate::map::style::{ColorError, DEFAULT_ROUTE_COLORS, RoutePalette};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Color(#[from] ColorError),
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialView {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
}

impl InitialView {
    pub fn center(&self) -> Point {
        Point::new(self.lon, self.lat)
    }

    /// Empty layer store looking at this view
    pub fn layer_store(&self) -> LayerStore {
        LayerStore::new(self.center(), self.zoom)
    }
}

impl Default for InitialView {
    fn default() -> Self {
        // Wrocław market square
        Self {
            lat: 51.1079,
            lon: 17.0385,
            zoom: 13,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub api_base_url: String,
    pub poll_interval_secs: u64,
    pub theme_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub route_palette: Vec<String>,
    pub initial_view: InitialView,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000".into(),
            poll_interval_secs: 15,
            theme_interval_secs: 300,
            request_timeout_secs: 10,
            route_palette: DEFAULT_ROUTE_COLORS.iter().map(|c| c.to_string()).collect(),
            initial_view: InitialView::default(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("poll_interval_secs"));
        }
        if self.theme_interval_secs == 0 {
            return Err(ConfigError::ZeroInterval("theme_interval_secs"));
        }
        self.palette()?;
        Ok(())
    }

    pub fn palette(&self) -> Result<RoutePalette, ConfigError> {
        Ok(RoutePalette::from_hex(&self.route_palette)?)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn theme_interval(&self) -> Duration {
        Duration::from_secs(self.theme_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = ViewerConfig::from_json(r#"{"poll_interval_secs": 5}"#).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.theme_interval(), Duration::from_secs(300));
        assert_eq!(config.palette().unwrap(), RoutePalette::default());
    }

    #[test]
    fn test_rejects_short_palette() {
        let err = ViewerConfig::from_json(r##"{"route_palette": ["#000000"]}"##).unwrap_err();
        assert!(matches!(err, ConfigError::Color(ColorError::PaletteTooSmall(1))));
    }

    #[test]
    fn test_rejects_zero_interval() {
        let err = ViewerConfig::from_json(r#"{"theme_interval_secs": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroInterval("theme_interval_secs")));
    }
}
