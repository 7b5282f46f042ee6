//! JSON payloads exchanged between the data-source server and map clients.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VehicleKind {
    Bus,
    Tram,
}

/// A live vehicle position as returned by `GET /api/vehicles`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub line: String,
    #[serde(rename = "type")]
    pub kind: VehicleKind,
}

/// One entry of `GET /api/routes`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSummary {
    pub line: String,
    #[serde(rename = "type")]
    pub kind: VehicleKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Explicit stop identity, when the source has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Stop {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            street: None,
            lat: None,
            lon: None,
        }
    }

    pub fn at(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            ..Self::named(name)
        }
    }

    /// `(lat, lon)` when both coordinates are present
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

/// One traversal of a line between two termini
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub direction_name: String,
    #[serde(default)]
    pub stops: Vec<Stop>,
}

impl Direction {
    pub fn first_stop(&self) -> Option<&Stop> {
        self.stops.first()
    }

    pub fn last_stop(&self) -> Option<&Stop> {
        self.stops.last()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteDetail {
    pub line: String,
    pub directions: Vec<Direction>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteUnavailable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    pub error: String,
    #[serde(default)]
    pub source: Option<String>,
}

/// Body of `GET /api/routes/{line}`
///
/// The error shape is tried first, so any payload carrying an `error` field is
/// treated as unavailable even if it also lists directions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteResponse {
    Unavailable(RouteUnavailable),
    Detail(RouteDetail),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_record_wire_names() {
        let record: VehicleRecord =
            serde_json::from_str(r#"{"lat":51.1,"lon":17.0,"line":"10","type":"tram"}"#).unwrap();
        assert_eq!(record.kind, VehicleKind::Tram);
        assert_eq!(record.id, None);

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "tram");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_stop_without_coordinates() {
        let stop: Stop = serde_json::from_str(r#"{"name":"C","street":null}"#).unwrap();
        assert_eq!(stop.coordinates(), None);
        assert_eq!(stop.street, None);

        let half: Stop = serde_json::from_str(r#"{"name":"C","lat":51.0}"#).unwrap();
        assert_eq!(half.coordinates(), None);
    }

    #[test]
    fn test_route_response_error_shape() {
        let response: RouteResponse =
            serde_json::from_str(r#"{"error":"no data","source":"GTFS"}"#).unwrap();
        assert_eq!(
            response,
            RouteResponse::Unavailable(RouteUnavailable {
                line: None,
                error: "no data".into(),
                source: Some("GTFS".into()),
            })
        );
    }

    #[test]
    fn test_route_response_detail_shape() {
        let response: RouteResponse = serde_json::from_str(
            r#"{"line":"1","directions":[{"direction_name":"A -> B","stops":[{"name":"A"},{"name":"B"}]}]}"#,
        )
        .unwrap();
        let RouteResponse::Detail(detail) = response else {
            panic!("expected a route detail");
        };
        assert_eq!(detail.directions.len(), 1);
        assert_eq!(detail.directions[0].first_stop().unwrap().name, "A");
        assert_eq!(detail.directions[0].last_stop().unwrap().name, "B");
    }

    #[test]
    fn test_vehicle_kind_strings() {
        assert_eq!(VehicleKind::Bus.to_string(), "bus");
        assert_eq!("tram".parse::<VehicleKind>().unwrap(), VehicleKind::Tram);
    }
}
