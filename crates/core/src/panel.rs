//! Serializable view of everything a side panel shows.

use serde::Serialize;

use crate::lines::LineCatalog;
use crate::map::style::to_hex;
use crate::session::{DirectionListing, RouteSelection};
use crate::theme::BaseLayer;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupPanel {
    pub index: usize,
    pub key: String,
    pub label: String,
    pub visible: bool,
    pub colors: Vec<String>,
    pub directions: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RoutePanel {
    #[default]
    Closed,
    Loading {
        line: String,
    },
    Rendered {
        line: String,
        groups: Vec<GroupPanel>,
        directions: Vec<DirectionListing>,
    },
    Unavailable {
        line: String,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        source: Option<String>,
    },
}

impl RoutePanel {
    pub fn capture(selection: &RouteSelection) -> Self {
        if let Some(line) = selection.pending() {
            return RoutePanel::Loading {
                line: line.to_string(),
            };
        }
        if let Some(unavailable) = selection.unavailable() {
            return RoutePanel::Unavailable {
                line: unavailable.line.to_string(),
                error: unavailable.error.clone(),
                source: unavailable.source.clone(),
            };
        }
        let Some(session) = selection.active() else {
            return RoutePanel::Closed;
        };
        RoutePanel::Rendered {
            line: session.line().to_string(),
            groups: session
                .groups()
                .iter()
                .enumerate()
                .map(|(index, group)| GroupPanel {
                    index,
                    key: group.key().to_string(),
                    label: group.label().to_string(),
                    visible: group.is_visible(),
                    colors: group.colors().map(to_hex).collect(),
                    directions: group.direction_names().map(str::to_string).collect(),
                })
                .collect(),
            directions: session.listing().to_vec(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PanelSnapshot {
    pub lines: LineCatalog,
    pub selected_line: Option<String>,
    pub route: RoutePanel,
    pub vehicles_drawn: usize,
    pub base_layer: Option<BaseLayer>,
}
