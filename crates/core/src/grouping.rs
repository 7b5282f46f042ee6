//! Grouping of a line's directions into bidirectional routes.
//!
//! Two directions belong to the same route when they share the same pair
//! of terminal stop names, in either order. Distinct routes that happen to
//! share terminal names (loop lines, for instance) are merged as well.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use mpk_transit::api_types::Direction;
use serde::{Serialize, Serializer};

use crate::map::{Color, RoutePalette};

const KEY_SEPARATOR: &str = " | ";

/// Unordered pair of terminal stop names, stored sorted
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteGroupKey(String, String);

impl RouteGroupKey {
    pub fn from_endpoints(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self(first.to_owned(), second.to_owned())
    }

    /// Key of a direction; `None` when it has fewer than two stops
    pub fn of(direction: &Direction) -> Option<Self> {
        if direction.stops.len() < 2 {
            return None;
        }
        let first = direction.first_stop()?;
        let last = direction.last_stop()?;
        Some(Self::from_endpoints(&first.name, &last.name))
    }

    pub fn endpoints(&self) -> (&str, &str) {
        (&self.0, &self.1)
    }
}

impl fmt::Display for RouteGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{KEY_SEPARATOR}{}", self.0, self.1)
    }
}

impl Serialize for RouteGroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroupedDirection {
    pub direction: Direction,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteGroup {
    pub key: RouteGroupKey,
    pub label: String,
    pub directions: Vec<GroupedDirection>,
}

impl RouteGroup {
    pub fn colors(&self) -> impl Iterator<Item = Color> + '_ {
        self.directions.iter().map(|d| d.color)
    }
}

/// Group directions by terminal pair, keeping first-seen order.
/// Directions with fewer than two stops are left out.
pub fn group_directions(directions: &[Direction], palette: &RoutePalette) -> Vec<RouteGroup> {
    let mut order: Vec<(RouteGroupKey, Vec<&Direction>)> = Vec::new();
    let mut index: HashMap<RouteGroupKey, usize> = HashMap::new();

    for direction in directions {
        let Some(key) = RouteGroupKey::of(direction) else {
            tracing::debug!(direction = %direction.direction_name, "Skipping direction with fewer than two stops");
            continue;
        };
        match index.get(&key) {
            Some(&i) => order[i].1.push(direction),
            None => {
                index.insert(key.clone(), order.len());
                order.push((key, vec![direction]));
            }
        }
    }

    let mut drawn = 0;
    order
        .into_iter()
        .map(|(key, members)| {
            let label = group_label(&members);
            let directions = members
                .into_iter()
                .map(|direction| {
                    let color = palette.color(drawn);
                    drawn += 1;
                    GroupedDirection {
                        direction: direction.clone(),
                        color,
                    }
                })
                .collect();
            RouteGroup {
                key,
                label,
                directions,
            }
        })
        .collect()
}

/// `"start <-> end"` for an exact reverse pair, otherwise the direction
/// names joined by `" / "`
pub fn group_label(directions: &[&Direction]) -> String {
    if let [a, b] = directions {
        if is_reverse_pair(a, b) {
            if let (Some(start), Some(end)) = (a.first_stop(), a.last_stop()) {
                return format!("{} <-> {}", start.name, end.name);
            }
        }
    }
    directions.iter().map(|d| d.direction_name.as_str()).join(" / ")
}

fn is_reverse_pair(a: &Direction, b: &Direction) -> bool {
    let (Some(a_start), Some(a_end), Some(b_start), Some(b_end)) =
        (a.first_stop(), a.last_stop(), b.first_stop(), b.last_stop())
    else {
        return false;
    };
    a_start.name == b_end.name && a_end.name == b_start.name
}

#[cfg(test)]
mod tests {
    use mpk_transit::api_types::Stop;

    use super::*;

    fn direction(name: &str, stops: &[&str]) -> Direction {
        Direction {
            direction_name: name.into(),
            stops: stops.iter().map(|s| Stop::named(*s)).collect(),
        }
    }

    #[test]
    fn test_key_is_order_independent() {
        assert_eq!(
            RouteGroupKey::from_endpoints("Rynek", "Biskupin"),
            RouteGroupKey::from_endpoints("Biskupin", "Rynek")
        );
        assert_eq!(RouteGroupKey::of(&direction("x", &["A"])), None);
        assert_eq!(
            RouteGroupKey::from_endpoints("Rynek", "Biskupin").endpoints(),
            ("Biskupin", "Rynek")
        );
    }

    #[test]
    fn test_separator_in_stop_name_does_not_merge_routes() {
        let groups = group_directions(
            &[direction("one", &["A | B", "C"]), direction("two", &["A", "B | C"])],
            &RoutePalette::default(),
        );

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "one");
        assert_eq!(groups[1].label, "two");
        assert_eq!(groups[0].key.to_string(), "A | B | C");
        assert_eq!(serde_json::to_value(&groups[1].key).unwrap(), "A | B | C");
    }

    #[test]
    fn test_reverse_pair_scenario() {
        let palette = RoutePalette::default();
        let groups = group_directions(
            &[direction("A→B", &["A", "B"]), direction("B→A", &["B", "A"])],
            &palette,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, "A <-> B");
        assert_eq!(
            groups[0].colors().collect::<Vec<_>>(),
            vec![palette.color(0), palette.color(1)]
        );
    }

    #[test]
    fn test_groups_keep_first_seen_order() {
        let palette = RoutePalette::default();
        let groups = group_directions(
            &[
                direction("X→Y", &["X", "M", "Y"]),
                direction("A→B", &["A", "B"]),
                direction("Y→X", &["Y", "X"]),
            ],
            &palette,
        );

        let keys: Vec<_> = groups.iter().map(|g| g.key.clone()).collect();
        assert_eq!(
            keys,
            vec![
                RouteGroupKey::from_endpoints("X", "Y"),
                RouteGroupKey::from_endpoints("A", "B")
            ]
        );
        assert_eq!(groups[0].label, "X <-> Y");
        assert_eq!(groups[1].label, "A→B");
    }

    #[test]
    fn test_partition_excludes_short_directions() {
        let input = [
            direction("empty", &[]),
            direction("single", &["A"]),
            direction("A→B", &["A", "B"]),
            direction("B→C", &["B", "C"]),
            direction("A→B via D", &["A", "D", "B"]),
        ];
        let groups = group_directions(&input, &RoutePalette::default());

        let mut names: Vec<_> = groups
            .iter()
            .flat_map(|g| g.directions.iter().map(|d| d.direction.direction_name.clone()))
            .collect();
        names.sort();
        assert_eq!(names, vec!["A→B", "A→B via D", "B→C"]);
        assert_eq!(groups[0].label, "A→B / A→B via D");
    }

    #[test]
    fn test_same_terminals_not_reversed_are_joined() {
        let label = group_label(&[
            &direction("loop a", &["A", "B", "A"]),
            &direction("loop b", &["A", "C", "A"]),
            &direction("loop c", &["A", "D", "A"]),
        ]);
        assert_eq!(label, "loop a / loop b / loop c");
    }

    #[test]
    fn test_colors_use_a_running_counter() {
        let palette = RoutePalette::default();
        let input: Vec<_> = (0..10)
            .map(|i| {
                let start = format!("S{i}");
                direction(&format!("d{i}"), &[start.as_str(), "T"])
            })
            .collect();
        let groups = group_directions(&input, &palette);

        for (i, group) in groups.iter().enumerate() {
            assert_eq!(group.directions[0].color, palette.color(i % palette.len()));
        }
        assert_eq!(groups[8].directions[0].color, groups[0].directions[0].color);
    }
}
