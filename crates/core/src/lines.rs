//! Line list for the side panel.

use std::cmp::Ordering;

use mpk_transit::api_types::{LineSummary, VehicleKind};
use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LineCatalog {
    pub buses: Vec<String>,
    pub trams: Vec<String>,
}

impl LineCatalog {
    pub fn from_summaries(summaries: impl IntoIterator<Item = LineSummary>) -> Self {
        let mut catalog = Self::default();
        for summary in summaries {
            match summary.kind {
                VehicleKind::Bus => catalog.buses.push(summary.line),
                VehicleKind::Tram => catalog.trams.push(summary.line),
            }
        }
        catalog.buses.sort_by(|a, b| natural_cmp(a, b));
        catalog.trams.sort_by(|a, b| natural_cmp(a, b));
        catalog
    }

    pub fn len(&self) -> usize {
        self.buses.len() + self.trams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty() && self.trams.is_empty()
    }

    pub fn kind_of(&self, line: &str) -> Option<VehicleKind> {
        if self.trams.iter().any(|l| l == line) {
            Some(VehicleKind::Tram)
        } else if self.buses.iter().any(|l| l == line) {
            Some(VehicleKind::Bus)
        } else {
            None
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Number(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut digits = None;
    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match digits {
            Some(prev) if prev != is_digit => {
                out.push(chunk(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        digits = Some(is_digit);
    }
    if let Some(prev) = digits {
        out.push(chunk(&s[start..], prev));
    }
    out
}

fn chunk(s: &str, digits: bool) -> Chunk<'_> {
    if digits { Chunk::Number(s) } else { Chunk::Text(s) }
}

fn cmp_chunk(a: &Chunk<'_>, b: &Chunk<'_>) -> Ordering {
    match (a, b) {
        (Chunk::Number(a), Chunk::Number(b)) => {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
        (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
        (Chunk::Text(a), Chunk::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

/// Compare line names with digit runs ordered by value: `"2" < "10" < "A"`
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ca, cb) = (chunks(a), chunks(b));
    ca.iter()
        .zip(cb.iter())
        .map(|(x, y)| cmp_chunk(x, y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| ca.len().cmp(&cb.len()))
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_order() {
        let mut lines = vec!["A", "10", "2", "D", "110", "C", "31", "3"];
        lines.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(lines, vec!["2", "3", "10", "31", "110", "A", "C", "D"]);
    }

    #[test]
    fn test_mixed_names() {
        assert_eq!(natural_cmp("N2", "N10"), Ordering::Less);
        assert_eq!(natural_cmp("0L", "0P"), Ordering::Less);
        assert_eq!(natural_cmp("a", "B"), Ordering::Less);
        assert_eq!(natural_cmp("7", "7"), Ordering::Equal);
    }

    #[test]
    fn test_split_by_kind() {
        let catalog = LineCatalog::from_summaries([
            LineSummary { line: "145".into(), kind: VehicleKind::Bus },
            LineSummary { line: "10".into(), kind: VehicleKind::Tram },
            LineSummary { line: "D".into(), kind: VehicleKind::Bus },
            LineSummary { line: "2".into(), kind: VehicleKind::Tram },
        ]);
        assert_eq!(catalog.buses, vec!["145", "D"]);
        assert_eq!(catalog.trams, vec!["2", "10"]);
        assert_eq!(catalog.kind_of("10"), Some(VehicleKind::Tram));
        assert_eq!(catalog.kind_of("999"), None);
    }
}
