//! The scraped `routes.json` catalog.
//!
//! The file maps a line name to its type, directions and an optional
//! provenance tag. Unknown fields are carried through untouched so tools can
//! rewrite the file without dropping data they don't understand.

use std::collections::HashSet;
use std::path::Path;

use api_types::{Direction, LineSummary, RouteDetail, RouteResponse, RouteUnavailable, Stop, VehicleKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::types::Result;

/// Suffix the timetable site appends to on-request stops
pub const ON_REQUEST_MARKER: &str = "NŻPrzystanek na życzenie";

pub const LINE_NOT_FOUND: &str = "Line not found";
pub const ROUTE_DETAILS_UNAVAILABLE: &str = "Route details are not available for this line.";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogLine {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub directions: Vec<CatalogDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogDirection {
    pub direction_name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub stops: Vec<CatalogStop>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogStop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CatalogLine {
    pub fn placeholder(kind: VehicleKind, source: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.to_string()),
            directions: Vec::new(),
            source: Some(source.into()),
            extra: Map::new(),
        }
    }

    /// Explicit `type` when it names a known kind, otherwise `tram` if any
    /// direction mentions trams, otherwise `bus`
    pub fn vehicle_kind(&self) -> VehicleKind {
        if let Some(kind) = self.kind.as_deref().and_then(|k| k.parse().ok()) {
            return kind;
        }
        let is_tram = self.directions.iter().any(|d| {
            d.kind
                .as_deref()
                .is_some_and(|k| k.to_lowercase().contains("tram"))
        });
        if is_tram {
            VehicleKind::Tram
        } else {
            VehicleKind::Bus
        }
    }
}

pub fn clean_stop_name(name: &str) -> String {
    name.replace(ON_REQUEST_MARKER, "").trim().to_string()
}

impl From<&CatalogStop> for Stop {
    fn from(stop: &CatalogStop) -> Self {
        Stop {
            id: stop.id.clone(),
            name: clean_stop_name(&stop.name),
            street: stop.street.clone(),
            lat: stop.lat,
            lon: stop.lon,
        }
    }
}

impl From<&CatalogDirection> for Direction {
    fn from(direction: &CatalogDirection) -> Self {
        Direction {
            direction_name: direction.direction_name.clone(),
            stops: direction.stops.iter().map(Stop::from).collect(),
        }
    }
}

/// Lines keyed by name, in file order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteCatalog {
    lines: IndexMap<String, CatalogLine>,
}

impl RouteCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self {
            lines: serde_json::from_str(json)?,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        tracing::debug!(path = %path.display(), lines = catalog.len(), "Loaded route catalog");
        Ok(catalog)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.lines)?;
        std::fs::write(path, json)?;
        tracing::debug!(path = %path.display(), lines = self.len(), "Saved route catalog");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn contains(&self, line: &str) -> bool {
        self.lines.contains_key(line)
    }

    pub fn line(&self, line: &str) -> Option<&CatalogLine> {
        self.lines.get(line)
    }

    pub fn insert(&mut self, line: impl Into<String>, entry: CatalogLine) -> Option<CatalogLine> {
        self.lines.insert(line.into(), entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CatalogLine)> {
        self.lines.iter().map(|(name, line)| (name.as_str(), line))
    }

    pub fn summaries(&self) -> Vec<LineSummary> {
        self.iter()
            .map(|(name, line)| LineSummary {
                line: name.to_string(),
                kind: line.vehicle_kind(),
            })
            .collect()
    }

    /// `None` for an unknown line; an unavailable response for a line
    /// without scraped directions
    pub fn route(&self, line: &str) -> Option<RouteResponse> {
        let entry = self.lines.get(line)?;
        if entry.directions.is_empty() {
            return Some(RouteResponse::Unavailable(RouteUnavailable {
                line: Some(line.to_string()),
                error: ROUTE_DETAILS_UNAVAILABLE.to_string(),
                source: entry.source.clone(),
            }));
        }
        Some(RouteResponse::Detail(RouteDetail {
            line: line.to_string(),
            directions: entry.directions.iter().map(Direction::from).collect(),
        }))
    }

    /// Unique `(name, street)` pairs of stops without both coordinates,
    /// in first-seen order
    pub fn stops_missing_coordinates(&self) -> Vec<(String, Option<String>)> {
        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for line in self.lines.values() {
            for direction in &line.directions {
                for stop in &direction.stops {
                    if stop.lat.is_some() && stop.lon.is_some() {
                        continue;
                    }
                    let key = (clean_stop_name(&stop.name), stop.street.clone());
                    if seen.insert(key.clone()) {
                        missing.push(key);
                    }
                }
            }
        }
        missing
    }

    /// Set coordinates on every stop whose cleaned name and street match.
    /// Returns how many stops were updated.
    pub fn set_stop_coordinates(&mut self, name: &str, street: Option<&str>, lat: f64, lon: f64) -> usize {
        let mut updated = 0;
        let stops = self
            .lines
            .values_mut()
            .flat_map(|line| line.directions.iter_mut())
            .flat_map(|direction| direction.stops.iter_mut());
        for stop in stops {
            if clean_stop_name(&stop.name) == name && stop.street.as_deref() == street {
                stop.lat = Some(lat);
                stop.lon = Some(lon);
                updated += 1;
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "10": {
            "type": "tram",
            "directions": [
                {
                    "direction_name": "LEŚNICA -> BISKUPIN",
                    "stops": [
                        {"name": "LEŚNICA", "street": "Średzka", "lat": 51.14, "lon": 16.86},
                        {"name": "Rynek NŻPrzystanek na życzenie", "street": "N/A"},
                        {"name": "BISKUPIN", "street": "Olszewskiego", "lat": 51.10, "lon": 17.10}
                    ],
                    "path": [[51.14, 16.86]]
                }
            ]
        },
        "D": {"directions": [], "source": "processed_dataset_2022"},
        "0L": {"directions": [{"direction_name": "x", "type": "Tramwaj", "stops": []}]}
    }"#;

    #[test]
    fn test_clean_stop_name() {
        assert_eq!(clean_stop_name("Rynek NŻPrzystanek na życzenie"), "Rynek");
        assert_eq!(clean_stop_name("  Dworzec Główny "), "Dworzec Główny");
    }

    #[test]
    fn test_vehicle_kind_heuristic() {
        let catalog = RouteCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.line("10").unwrap().vehicle_kind(), VehicleKind::Tram);
        assert_eq!(catalog.line("D").unwrap().vehicle_kind(), VehicleKind::Bus);
        assert_eq!(catalog.line("0L").unwrap().vehicle_kind(), VehicleKind::Tram);
    }

    #[test]
    fn test_route_detail_cleans_names() {
        let catalog = RouteCatalog::from_json(SAMPLE).unwrap();
        let Some(RouteResponse::Detail(detail)) = catalog.route("10") else {
            panic!("expected route detail");
        };
        let stops = &detail.directions[0].stops;
        assert_eq!(stops[1].name, "Rynek");
        assert_eq!(stops[1].coordinates(), None);
        assert_eq!(stops[2].coordinates(), Some((51.10, 17.10)));
    }

    #[test]
    fn test_route_without_directions_is_unavailable() {
        let catalog = RouteCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(
            catalog.route("D"),
            Some(RouteResponse::Unavailable(RouteUnavailable {
                line: Some("D".into()),
                error: ROUTE_DETAILS_UNAVAILABLE.into(),
                source: Some("processed_dataset_2022".into()),
            }))
        );
        assert_eq!(catalog.route("999"), None);
    }

    #[test]
    fn test_unknown_fields_survive_a_round_trip() {
        let catalog = RouteCatalog::from_json(SAMPLE).unwrap();
        let direction = &catalog.line("10").unwrap().directions[0];
        assert!(direction.extra.contains_key("path"));

        let rewritten = serde_json::to_string(&catalog.lines).unwrap();
        assert!(rewritten.contains("\"path\""));
    }

    #[test]
    fn test_stops_missing_coordinates() {
        let catalog = RouteCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(
            catalog.stops_missing_coordinates(),
            vec![("Rynek".to_string(), Some("N/A".to_string()))]
        );
    }

    #[test]
    fn test_set_stop_coordinates() {
        let mut catalog = RouteCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.set_stop_coordinates("Rynek", None, 51.11, 17.03), 0);
        assert_eq!(catalog.set_stop_coordinates("Rynek", Some("N/A"), 51.11, 17.03), 1);
        assert!(catalog.stops_missing_coordinates().is_empty());
    }

    #[test]
    fn test_load_and_save() {
        let path = std::env::temp_dir().join(format!("mpk-catalog-{}.json", std::process::id()));
        let mut catalog = RouteCatalog::from_json(SAMPLE).unwrap();
        catalog.insert("146", CatalogLine::placeholder(VehicleKind::Bus, "manual"));
        catalog.save(&path).unwrap();

        let loaded = RouteCatalog::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, catalog);
        assert_eq!(loaded.summaries().len(), 4);
    }

    #[test]
    fn test_save_keeps_file_order() {
        let mut catalog = RouteCatalog::from_json(SAMPLE).unwrap();
        catalog.insert("146", CatalogLine::placeholder(VehicleKind::Bus, "manual"));

        let names: Vec<_> = catalog.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["10", "D", "0L", "146"]);

        let rewritten = serde_json::to_string(&catalog.lines).unwrap();
        let stop = r#"{"name":"LEŚNICA","street":"Średzka","lat":51.14,"lon":16.86}"#;
        assert!(rewritten.contains(stop));
        assert!(rewritten.find("\"D\"").unwrap() < rewritten.find("\"0L\"").unwrap());
    }
}
