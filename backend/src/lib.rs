//! Air quality backend library.
//!
//! - `domain`: index engine, storage value model, entities, and services.
//! - `outbound`: storage gateways and the live pollutant feed client.
//! - `settings`: startup configuration.

pub mod domain;
pub mod outbound;
pub mod settings;
