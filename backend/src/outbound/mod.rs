//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! This module follows the hexagonal architecture pattern, providing concrete
//! implementations of domain port traits:
//!
//! - **persistence**: MongoDB primary and SQLite fallback storage gateways,
//!   plus startup backend selection
//! - **openaq**: HTTP client for the optional live pollutant feed
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod openaq;
pub mod persistence;
