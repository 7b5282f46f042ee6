//! Type-safe line identifiers.
//!
//! Identifiers use Arc<str> so they can be cloned into every marker
//! and fetch ticket without copying the string.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

macro_rules! impl_identifier {
    ($name:ident) => {
        #[derive(Clone, Debug)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(s.as_ref().into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.0)
            }
        }
    };
}

impl_identifier!(LineIdentifier);

impl LineIdentifier {
    /// Whether a vehicle's `line` field refers to this line
    pub fn matches(&self, line: &str) -> bool {
        &*self.0 == line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_equality() {
        let id1 = LineIdentifier::new("10");
        let id2 = LineIdentifier::new("10");
        let id3 = id1.clone();

        assert_eq!(id1, id2);
        assert_eq!(id1, id3);
        assert!(Arc::ptr_eq(&id1.0, &id3.0)); // Clone shares Arc
    }

    #[test]
    fn test_identifier_hash() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(LineIdentifier::new("D"), 42);

        assert_eq!(map.get(&LineIdentifier::new("D")), Some(&42));
    }

    #[test]
    fn test_identifier_display() {
        let id = LineIdentifier::new("A");
        assert_eq!(format!("{}", id), "A");
    }

    #[test]
    fn test_line_matches_vehicle_line() {
        let line = LineIdentifier::new("33");
        assert!(line.matches("33"));
        assert!(!line.matches("330"));
    }

    #[test]
    fn test_identifier_serializes_as_string() {
        let id: LineIdentifier = "146".into();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"146\"");
    }
}
