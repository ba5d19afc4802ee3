//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod pollutant_feed;
mod storage_gateway;

#[cfg(test)]
pub use pollutant_feed::MockPollutantFeed;
pub use pollutant_feed::{
    DisabledPollutantFeed, FeedObservation, PollutantFeed, PollutantFeedError,
};
#[cfg(test)]
pub use storage_gateway::MockStorageGateway;
pub use storage_gateway::{BackendKind, StorageGateway};
