//! Geometry derived from stop coordinates.
//!
//! Coordinates follow the `geo` convention: `x` is longitude, `y` latitude.

use api_types::{Direction, Stop};
use geo::{BoundingRect, Coord, LineString, Point, Rect};

/// Position of a stop, if it has both coordinates
pub fn stop_location(stop: &Stop) -> Option<Point> {
    stop.coordinates().map(|(lat, lon)| Point::new(lon, lat))
}

/// Polyline through the positioned stops of a direction, in order.
/// Stops without coordinates are skipped.
pub fn direction_path(direction: &Direction) -> LineString {
    direction
        .stops
        .iter()
        .filter_map(stop_location)
        .map(|p| p.0)
        .collect::<Vec<Coord>>()
        .into()
}

/// Smallest rectangle containing every path; `None` if there are no coordinates
pub fn bounding_rect<'a>(paths: impl IntoIterator<Item = &'a LineString>) -> Option<Rect> {
    paths
        .into_iter()
        .filter_map(|path| path.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
}
