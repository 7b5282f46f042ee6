//! Transit data source trait and error types.

pub mod traits;
pub mod types;

// Re-exports for convenience
pub use traits::{BoxFuture, TransitSource};
pub use types::{Result, TransitError};
