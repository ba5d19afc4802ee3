//! Driven port for the optional third-party pollutant feed.
//!
//! The feed is best effort. Callers treat every error as a reason to fall
//! back to synthetic concentrations rather than as a failed request.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::Pollutant;

use super::define_port_error;

/// Latest concentrations reported near a coordinate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedObservation {
    /// Concentrations keyed by pollutant. Pollutants the station does not
    /// measure are absent.
    pub concentrations: BTreeMap<Pollutant, f64>,
    /// Reporting station, when the feed names one.
    pub station: Option<String>,
    /// When the most recent measurement was taken.
    pub observed_at: Option<DateTime<Utc>>,
}

define_port_error! {
    /// Errors surfaced while calling the pollutant feed.
    pub enum PollutantFeedError {
        /// Feed is switched off in configuration.
        Disabled => "pollutant feed disabled",
        /// Network transport failed before receiving a response.
        Transport { message: String } => "pollutant feed transport failed: {message}",
        /// Call exceeded its timeout.
        Timeout { message: String } => "pollutant feed timeout: {message}",
        /// Feed answered with a non-success status.
        Status { status: u16, message: String } =>
            "pollutant feed returned status {status}: {message}",
        /// Response body could not be decoded.
        Decode { message: String } => "pollutant feed decode failed: {message}",
    }
}

/// Port for looking up current concentrations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PollutantFeed: Send + Sync {
    /// Latest observation near `(latitude, longitude)`. `Ok(None)` means the
    /// feed has no station in range.
    async fn latest(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Option<FeedObservation>, PollutantFeedError>;
}

/// Feed used when enrichment is switched off; every lookup reports
/// [`PollutantFeedError::Disabled`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPollutantFeed;

#[async_trait]
impl PollutantFeed for DisabledPollutantFeed {
    async fn latest(
        &self,
        _latitude: f64,
        _longitude: f64,
    ) -> Result<Option<FeedObservation>, PollutantFeedError> {
        Err(PollutantFeedError::disabled())
    }
}
