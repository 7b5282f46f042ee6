//! Spatial helpers over stop coordinates.

pub mod queries;

pub use queries::{bounding_rect, direction_path, stop_location};
