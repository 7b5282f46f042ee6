//! Network and IO abstractions.

pub mod http;
pub mod traits;

pub use http::HttpFetcher;
pub use traits::DataFetcher;
