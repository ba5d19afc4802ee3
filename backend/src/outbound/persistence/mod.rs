//! Storage gateway adapters for MongoDB and embedded SQLite.
//!
//! This module provides the two concrete implementations of the
//! [`crate::domain::ports::StorageGateway`] port and the startup routine that
//! picks one of them.
//!
//! # Architecture
//!
//! - **Thin adapters**: gateways only translate between the backend-neutral
//!   value model and BSON or SQL. No business logic resides here.
//! - **Shared catalogue checks**: both gateways validate filters, sorts, and
//!   documents against the same field catalogue before touching storage, so
//!   invalid input fails identically on either backend.
//! - **Internal codecs**: BSON and SQL encoding live in private modules and
//!   never leak into the domain layer.
//! - **Blocking isolation**: SQLite calls run on the blocking thread pool.
//!
//! # Example
//!
//! ```ignore
//! use aqi_backend::outbound::persistence::select_backend;
//! use aqi_backend::settings::StorageSettings;
//!
//! let selection = select_backend(&StorageSettings::local("aqi.db")).await?;
//! let gateway = selection.gateway();
//! ```

mod backend_selection;
mod gateway_checks;
mod mongo_codec;
mod mongo_gateway;
mod sqlite_codec;
mod sqlite_gateway;
mod sqlite_query;

pub use backend_selection::{BackendInitError, StorageSelection, select_backend};
pub use mongo_gateway::{MongoConfig, MongoConnectError, MongoGateway};
pub use sqlite_gateway::SqliteGateway;
