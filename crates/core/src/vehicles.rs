//! Vehicle marker reconciliation.
//!
//! Every poll replaces the whole marker set: old markers are removed,
//! then one marker is drawn per record that passes the line filter.

use geo::Point;
use mpk_transit::api_types::{VehicleKind, VehicleRecord};
use mpk_transit::{LineIdentifier, TransitError};
use palette::Srgb;

use crate::map::{Color, Drawable, DrawableHandle, MapSurface, MarkerStyle, remove_all};

pub const BUS_COLOR: Color = Srgb::new(0xff, 0x78, 0x00);
pub const TRAM_COLOR: Color = Srgb::new(0x00, 0x78, 0xff);
pub const MARKER_RADIUS: f32 = 8.0;

pub fn marker_style(kind: VehicleKind) -> MarkerStyle {
    let fill = match kind {
        VehicleKind::Bus => BUS_COLOR,
        VehicleKind::Tram => TRAM_COLOR,
    };
    MarkerStyle::solid_color(MARKER_RADIUS, fill)
        .with_border(1.0, Srgb::new(0, 0, 0))
        .with_fill_opacity(0.8)
}

pub fn popup_label(record: &VehicleRecord) -> String {
    format!("Line: {}\nType: {}", record.line, record.kind)
}

/// Issued when a poll starts; hand it back with the poll's result
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollTicket {
    generation: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied { removed: usize, drawn: usize },
    /// A newer poll was already applied
    Stale { generation: u64, latest_applied: u64 },
    /// The poll failed; markers were left as they were
    Failed,
}

#[derive(Debug, Default)]
pub struct VehicleReconciler {
    markers: Vec<DrawableHandle>,
    filter: Option<LineIdentifier>,
    issued: u64,
    applied: u64,
}

impl VehicleReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> Option<&LineIdentifier> {
        self.filter.as_ref()
    }

    /// Returns whether the filter changed
    pub fn set_filter(&mut self, filter: Option<LineIdentifier>) -> bool {
        if self.filter == filter {
            return false;
        }
        self.filter = filter;
        true
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn begin_poll(&mut self) -> PollTicket {
        self.issued += 1;
        PollTicket {
            generation: self.issued,
        }
    }

    pub fn apply(
        &mut self,
        surface: &mut dyn MapSurface,
        ticket: PollTicket,
        result: Result<Vec<VehicleRecord>, TransitError>,
    ) -> ReconcileOutcome {
        if ticket.generation <= self.applied {
            tracing::debug!(
                generation = ticket.generation,
                latest_applied = self.applied,
                "Discarding stale vehicle poll"
            );
            return ReconcileOutcome::Stale {
                generation: ticket.generation,
                latest_applied: self.applied,
            };
        }

        let records = match result {
            Ok(records) => records,
            Err(error) => {
                tracing::warn!(%error, generation = ticket.generation, "Vehicle poll failed, keeping previous markers");
                return ReconcileOutcome::Failed;
            }
        };

        let removed = self.markers.len();
        remove_all(surface, &mut self.markers);

        let filter = self.filter.clone();
        for record in records
            .iter()
            .filter(|r| filter.as_ref().is_none_or(|line| line.matches(&r.line)))
        {
            let handle = surface.add(Drawable::Marker {
                position: Point::new(record.lon, record.lat),
                style: marker_style(record.kind),
                popup: Some(popup_label(record)),
            });
            self.markers.push(handle);
        }

        self.applied = ticket.generation;
        tracing::debug!(removed, drawn = self.markers.len(), total = records.len(), "Vehicle markers reconciled");
        ReconcileOutcome::Applied {
            removed,
            drawn: self.markers.len(),
        }
    }

    pub fn clear(&mut self, surface: &mut dyn MapSurface) {
        remove_all(surface, &mut self.markers);
    }
}
