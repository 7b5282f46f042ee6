use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use mpk_transit::api_types::VehicleKind;
use mpk_transit::catalog::{CatalogLine, RouteCatalog};

pub const ALL_LINES: &str = "all_lines.txt";
pub const BUS_LINES: &str = "bus_lines.txt";
pub const TRAM_LINES: &str = "tram_lines.txt";

/// One line name per row, blank rows ignored
pub fn parse_line_list(text: &str) -> BTreeSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_line_list(path: &Path) -> Result<BTreeSet<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read line list {}", path.display()))?;
    Ok(parse_line_list(&text))
}

#[derive(Debug, Default)]
pub struct LineLists {
    pub all: BTreeSet<String>,
    pub buses: BTreeSet<String>,
    pub trams: BTreeSet<String>,
}

impl LineLists {
    pub fn read(dir: &Path) -> Result<Self> {
        Ok(Self {
            all: read_line_list(&dir.join(ALL_LINES))?,
            buses: read_line_list(&dir.join(BUS_LINES))?,
            trams: read_line_list(&dir.join(TRAM_LINES))?,
        })
    }

    /// Lines not on the bus list are trams
    pub fn kind_of(&self, line: &str) -> VehicleKind {
        if self.buses.contains(line) {
            VehicleKind::Bus
        } else {
            if !self.trams.contains(line) {
                log::debug!("Line {line} is on neither the bus nor the tram list, assuming tram");
            }
            VehicleKind::Tram
        }
    }
}

/// Add every listed line missing from the catalog with no directions.
/// Returns the added lines with their kinds.
pub fn merge_missing_lines(
    catalog: &mut RouteCatalog,
    lists: &LineLists,
    source: &str,
) -> Vec<(String, VehicleKind)> {
    let mut added = Vec::new();
    for line in &lists.all {
        if catalog.contains(line) {
            continue;
        }
        let kind = lists.kind_of(line);
        catalog.insert(line.clone(), CatalogLine::placeholder(kind, source));
        log::info!("Added missing line: {line} ({kind})");
        added.push((line.clone(), kind));
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lists() -> LineLists {
        LineLists {
            all: parse_line_list("4\n145\n\n 0P \nD\n"),
            buses: parse_line_list("145\nD\n"),
            trams: parse_line_list("4\n"),
        }
    }

    #[test]
    fn test_parse_line_list() {
        let lines = parse_line_list("4\n145\n\n 0P \n");
        assert_eq!(lines.len(), 3);
        assert!(lines.contains("0P"));
    }

    #[test]
    fn test_merge_adds_only_missing_lines() {
        let mut catalog = RouteCatalog::from_json(
            r#"{"4": {"type": "tram", "directions": [{"direction_name": "x", "stops": []}]}}"#,
        )
        .unwrap();

        let added = merge_missing_lines(&mut catalog, &lists(), "processed_dataset_2022");

        assert_eq!(
            added,
            vec![
                ("0P".to_string(), VehicleKind::Tram),
                ("145".to_string(), VehicleKind::Bus),
                ("D".to_string(), VehicleKind::Bus),
            ]
        );
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.line("4").unwrap().directions.len(), 1);

        let placeholder = catalog.line("145").unwrap();
        assert!(placeholder.directions.is_empty());
        assert_eq!(placeholder.source.as_deref(), Some("processed_dataset_2022"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut catalog = RouteCatalog::new();
        merge_missing_lines(&mut catalog, &lists(), "a");
        assert!(merge_missing_lines(&mut catalog, &lists(), "a").is_empty());
    }
}
