//! DTOs for decoding OpenAQ `latest` responses.
//!
//! The adapter decodes into these transport DTOs first, then maps the first
//! result into a domain [`FeedObservation`] in one pass.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::Pollutant;
use crate::domain::ports::FeedObservation;

#[derive(Debug, Deserialize)]
pub(super) struct LatestResponseDto {
    #[serde(default)]
    pub(super) results: Vec<LatestResultDto>,
}

#[derive(Debug, Deserialize)]
pub(super) struct LatestResultDto {
    pub(super) location: Option<String>,
    #[serde(default)]
    pub(super) measurements: Vec<MeasurementDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MeasurementDto {
    pub(super) parameter: String,
    pub(super) value: f64,
    pub(super) last_updated: Option<DateTime<Utc>>,
}

impl LatestResponseDto {
    /// First station in range, or `None` when the feed returned no results.
    pub(super) fn into_domain_observation(self) -> Option<FeedObservation> {
        self.results
            .into_iter()
            .next()
            .map(LatestResultDto::into_domain_observation)
    }
}

impl LatestResultDto {
    fn into_domain_observation(self) -> FeedObservation {
        let mut observation = FeedObservation {
            station: self.location.filter(|name| !name.trim().is_empty()),
            ..FeedObservation::default()
        };
        for measurement in self.measurements {
            // Unsupported parameters (bc, pm1, ...) are ignored.
            let Ok(pollutant) = measurement.parameter.parse::<Pollutant>() else {
                continue;
            };
            observation
                .concentrations
                .entry(pollutant)
                .or_insert(measurement.value);
            if let Some(at) = measurement.last_updated {
                observation.observed_at = Some(observation.observed_at.map_or(at, |seen| seen.max(at)));
            }
        }
        observation
    }
}
