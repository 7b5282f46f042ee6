//! Transit data providers.

pub mod remote;
pub mod static_provider;

pub use remote::RemoteTransitSource;
pub use static_provider::StaticTransitProvider;
