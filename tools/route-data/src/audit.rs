use std::io::Write;

use anyhow::Result;
use mpk_transit::catalog::RouteCatalog;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum AuditFormat {
    Text,
    Json,
}

/// A stop location, as listed by `audit` and consumed by `apply`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopCoordinates {
    pub name: String,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

pub fn missing_stops(catalog: &RouteCatalog) -> Vec<StopCoordinates> {
    catalog
        .stops_missing_coordinates()
        .into_iter()
        .map(|(name, street)| StopCoordinates {
            name,
            street,
            lat: None,
            lon: None,
        })
        .collect()
}

pub fn write_report(stops: &[StopCoordinates], format: AuditFormat, out: &mut impl Write) -> Result<()> {
    match format {
        AuditFormat::Text => {
            for stop in stops {
                match &stop.street {
                    Some(street) => writeln!(out, "{}\t{}", stop.name, street)?,
                    None => writeln!(out, "{}", stop.name)?,
                }
            }
        }
        AuditFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, stops)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Copy coordinates onto every matching stop. Entries without both
/// coordinates are skipped. Returns (entries applied, stops updated).
pub fn apply_coordinates(catalog: &mut RouteCatalog, entries: &[StopCoordinates]) -> (usize, usize) {
    let mut applied = 0;
    let mut updated = 0;
    for entry in entries {
        let (Some(lat), Some(lon)) = (entry.lat, entry.lon) else {
            log::warn!("No coordinates for {}, skipping", entry.name);
            continue;
        };
        let count = catalog.set_stop_coordinates(&entry.name, entry.street.as_deref(), lat, lon);
        if count == 0 {
            log::warn!("No stop named {} on {:?}", entry.name, entry.street);
            continue;
        }
        log::debug!("{} updated on {count} stops", entry.name);
        applied += 1;
        updated += count;
    }
    (applied, updated)
}
