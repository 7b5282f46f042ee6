//! Route rendering sessions.
//!
//! A [`RouteSession`] owns everything drawn for one selected line: one
//! polyline per direction and the line's stop markers. [`RouteSelection`]
//! tracks which line was asked for last and only lets that line's response
//! replace the current session.

use std::collections::HashSet;

use geo::LineString;
use mpk_transit::api_types::{Direction, RouteDetail, RouteResponse};
use mpk_transit::{LineIdentifier, TransitError, bounding_rect, direction_path, stop_location};
use palette::Srgb;
use serde::Serialize;

use crate::grouping::{RouteGroup, RouteGroupKey, group_directions};
use crate::map::{Color, Drawable, DrawableHandle, MapSurface, MarkerStyle, PathStyle, RoutePalette, remove_all};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no route group at index {0}")]
    UnknownGroup(usize),
    #[error("route session is closed")]
    Closed,
}

pub fn stop_marker_style() -> MarkerStyle {
    MarkerStyle::solid_color(4.0, Srgb::new(0xff, 0xff, 0xff)).with_border(1.0, Srgb::new(0, 0, 0))
}

/// Text shown for a stop in the side panel
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StopListing {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// Whether the stop has coordinates and appears on the map
    pub positioned: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DirectionListing {
    pub direction_name: String,
    pub stops: Vec<StopListing>,
}

impl From<&Direction> for DirectionListing {
    fn from(direction: &Direction) -> Self {
        Self {
            direction_name: direction.direction_name.clone(),
            stops: direction
                .stops
                .iter()
                .map(|stop| StopListing {
                    name: stop.name.clone(),
                    street: stop.street.clone(),
                    positioned: stop.coordinates().is_some(),
                })
                .collect(),
        }
    }
}

#[derive(Debug)]
struct SessionDirection {
    name: String,
    color: Color,
    path: LineString,
    polyline: Option<DrawableHandle>,
}

#[derive(Debug)]
pub struct SessionGroup {
    key: RouteGroupKey,
    label: String,
    visible: bool,
    directions: Vec<SessionDirection>,
}

impl SessionGroup {
    pub fn key(&self) -> &RouteGroupKey {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.directions.iter().map(|d| d.color)
    }

    pub fn direction_names(&self) -> impl Iterator<Item = &str> {
        self.directions.iter().map(|d| d.name.as_str())
    }

    /// Number of this group's polylines currently on the map
    pub fn drawn_polylines(&self) -> usize {
        self.directions.iter().filter(|d| d.polyline.is_some()).count()
    }

    fn show(&mut self, surface: &mut dyn MapSurface) {
        for direction in &mut self.directions {
            if direction.polyline.is_none() {
                direction.polyline = Some(surface.add(Drawable::Polyline {
                    path: direction.path.clone(),
                    style: PathStyle::solid(direction.color),
                }));
            }
        }
        self.visible = true;
    }

    fn hide(&mut self, surface: &mut dyn MapSurface) {
        for direction in &mut self.directions {
            if let Some(handle) = direction.polyline.take() {
                surface.remove(handle);
            }
        }
        self.visible = false;
    }
}

#[derive(Debug)]
pub struct RouteSession {
    line: LineIdentifier,
    groups: Vec<SessionGroup>,
    stop_markers: Vec<DrawableHandle>,
    listing: Vec<DirectionListing>,
    closed: bool,
}

impl RouteSession {
    /// Draw a line's routes and fit the viewport to them. Whatever was on
    /// the map before stays; closing the previous session is up to the
    /// caller.
    pub fn open(
        surface: &mut dyn MapSurface,
        line: LineIdentifier,
        detail: &RouteDetail,
        palette: &RoutePalette,
    ) -> Self {
        let route_groups = group_directions(&detail.directions, palette);

        let mut session = Self {
            line,
            groups: Vec::with_capacity(route_groups.len()),
            stop_markers: Vec::new(),
            listing: detail.directions.iter().map(DirectionListing::from).collect(),
            closed: false,
        };
        session.draw_stops(surface, &route_groups);

        for group in route_groups {
            let mut session_group = SessionGroup {
                key: group.key,
                label: group.label,
                visible: false,
                directions: group
                    .directions
                    .into_iter()
                    .map(|d| SessionDirection {
                        path: direction_path(&d.direction),
                        name: d.direction.direction_name,
                        color: d.color,
                        polyline: None,
                    })
                    .collect(),
            };
            session_group.show(surface);
            session.groups.push(session_group);
        }

        let paths = session.groups.iter().flat_map(|g| g.directions.iter().map(|d| &d.path));
        if let Some(bounds) = bounding_rect(paths) {
            surface.fit_bounds(bounds);
        }

        tracing::info!(
            line = %session.line,
            groups = session.groups.len(),
            stops = session.stop_markers.len(),
            "Route session opened"
        );
        session
    }

    fn draw_stops(&mut self, surface: &mut dyn MapSurface, groups: &[RouteGroup]) {
        let mut seen: HashSet<&str> = HashSet::new();
        let stops = groups
            .iter()
            .flat_map(|g| g.directions.iter())
            .flat_map(|d| d.direction.stops.iter());

        for stop in stops {
            let Some(position) = stop_location(stop) else {
                continue;
            };
            if let Some(id) = stop.id.as_deref() {
                if !seen.insert(id) {
                    continue;
                }
            }
            let popup = match &stop.street {
                Some(street) => format!("{}\n{}", stop.name, street),
                None => stop.name.clone(),
            };
            self.stop_markers.push(surface.add(Drawable::Marker {
                position,
                style: stop_marker_style(),
                popup: Some(popup),
            }));
        }
    }

    pub fn line(&self) -> &LineIdentifier {
        &self.line
    }

    pub fn groups(&self) -> &[SessionGroup] {
        &self.groups
    }

    /// Every direction of the line, including those too short to draw
    pub fn listing(&self) -> &[DirectionListing] {
        &self.listing
    }

    pub fn stop_marker_count(&self) -> usize {
        self.stop_markers.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Show or hide one group's polylines. Stop markers are not affected.
    pub fn set_group_visible(
        &mut self,
        surface: &mut dyn MapSurface,
        index: usize,
        visible: bool,
    ) -> Result<(), SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let group = self
            .groups
            .get_mut(index)
            .ok_or(SessionError::UnknownGroup(index))?;
        if visible {
            group.show(surface);
        } else {
            group.hide(surface);
        }
        Ok(())
    }

    /// Flip a group's visibility, returning the new state
    pub fn toggle_group(&mut self, surface: &mut dyn MapSurface, index: usize) -> Result<bool, SessionError> {
        let visible = !self
            .groups
            .get(index)
            .ok_or(SessionError::UnknownGroup(index))?
            .visible;
        self.set_group_visible(surface, index, visible)?;
        Ok(visible)
    }

    /// Remove every drawable of this session. Safe to call more than once.
    pub fn close(&mut self, surface: &mut dyn MapSurface) {
        if self.closed {
            return;
        }
        for group in &mut self.groups {
            group.hide(surface);
        }
        remove_all(surface, &mut self.stop_markers);
        self.closed = true;
        tracing::debug!(line = %self.line, "Route session closed");
    }
}

/// Why a line could not be shown
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Unavailable {
    pub line: LineIdentifier,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Issued when a route fetch starts; hand it back with the fetch result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenTicket {
    generation: u64,
    line: LineIdentifier,
}

impl OpenTicket {
    pub fn line(&self) -> &LineIdentifier {
        &self.line
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenOutcome {
    Rendered { groups: usize, stop_markers: usize },
    Unavailable(Unavailable),
    /// A newer selection or a reset superseded this fetch
    Stale,
}

#[derive(Debug, Default)]
pub struct RouteSelection {
    active: Option<RouteSession>,
    pending: Option<LineIdentifier>,
    unavailable: Option<Unavailable>,
    issued: u64,
}

impl RouteSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_open(&mut self, line: LineIdentifier) -> OpenTicket {
        self.issued += 1;
        self.pending = Some(line.clone());
        OpenTicket {
            generation: self.issued,
            line,
        }
    }

    pub fn complete(
        &mut self,
        surface: &mut dyn MapSurface,
        palette: &RoutePalette,
        ticket: OpenTicket,
        result: Result<RouteResponse, TransitError>,
    ) -> OpenOutcome {
        if ticket.generation != self.issued {
            tracing::debug!(line = %ticket.line, generation = ticket.generation, "Discarding stale route response");
            return OpenOutcome::Stale;
        }
        self.pending = None;

        let detail = match result {
            Ok(RouteResponse::Detail(detail)) => detail,
            Ok(RouteResponse::Unavailable(payload)) => {
                return self.mark_unavailable(Unavailable {
                    line: ticket.line,
                    error: payload.error,
                    source: payload.source,
                });
            }
            Err(error) => {
                tracing::warn!(line = %ticket.line, %error, "Route fetch failed");
                return self.mark_unavailable(Unavailable {
                    line: ticket.line,
                    error: error.to_string(),
                    source: None,
                });
            }
        };

        if let Some(mut previous) = self.active.take() {
            previous.close(surface);
        }
        let session = RouteSession::open(surface, ticket.line, &detail, palette);
        let outcome = OpenOutcome::Rendered {
            groups: session.groups().len(),
            stop_markers: session.stop_marker_count(),
        };
        self.active = Some(session);
        self.unavailable = None;
        outcome
    }

    fn mark_unavailable(&mut self, unavailable: Unavailable) -> OpenOutcome {
        self.unavailable = Some(unavailable.clone());
        OpenOutcome::Unavailable(unavailable)
    }

    /// Close the active session and discard any fetch still in flight
    pub fn reset(&mut self, surface: &mut dyn MapSurface) {
        self.issued += 1;
        self.pending = None;
        self.unavailable = None;
        if let Some(mut session) = self.active.take() {
            session.close(surface);
        }
    }

    pub fn active(&self) -> Option<&RouteSession> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut RouteSession> {
        self.active.as_mut()
    }

    pub fn pending(&self) -> Option<&LineIdentifier> {
        self.pending.as_ref()
    }

    pub fn unavailable(&self) -> Option<&Unavailable> {
        self.unavailable.as_ref()
    }
}
