//! Current air quality reports and history capture.
//!
//! Reports start from the optional pollutant feed. Any pollutant the feed
//! cannot supply is replaced by a synthetic value from
//! [`synthesize_reading`], and the report says so through
//! [`ReadingProvenance`]. The index engine is fed the merged reading without
//! knowing which values were real.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use mockable::Clock;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, warn};

use super::ports::{FeedObservation, PollutantFeed, PollutantFeedError, StorageGateway};
use super::storage::{
    Filter, FindOptions, RecordId, SortDirection, Stored, find_record, find_records,
    insert_record, storage_now,
};
use super::{
    AirQualityHistoryEntry, AqiCategory, DomainError, Pollutant, PollutantReading,
    MAX_SANE_CONCENTRATION, SavedLocation, compute_overall_index, coordinates_are_valid,
};

/// Most history entries returned by one listing.
pub const MAX_HISTORY_LISTED: u64 = 100;

/// Why a report fell back to fully synthetic values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SyntheticReason {
    /// Enrichment is switched off.
    FeedDisabled,
    /// The feed has no station near the coordinate.
    NoStation,
    /// The feed call failed.
    FeedUnavailable(String),
}

/// Where a report's concentrations came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum ReadingProvenance {
    /// Feed data, with the listed pollutants filled in synthetically.
    Enriched {
        station: Option<String>,
        substituted: Vec<Pollutant>,
    },
    /// Every value is synthetic.
    Synthetic { reason: SyntheticReason },
}

/// Current conditions at a coordinate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualityReport {
    pub latitude: f64,
    pub longitude: f64,
    pub reading: PollutantReading,
    pub aqi: u16,
    pub category: AqiCategory,
    pub provenance: ReadingProvenance,
}

/// Placeholder concentrations used when real data is missing.
///
/// Values are drawn uniformly from typical urban ranges and rounded to one
/// decimal place (two for carbon monoxide).
pub fn synthesize_reading<R: Rng + ?Sized>(rng: &mut R, timestamp: DateTime<Utc>) -> PollutantReading {
    let mut reading = PollutantReading {
        pm25: 0.0,
        pm10: 0.0,
        o3: 0.0,
        no2: 0.0,
        co: 0.0,
        so2: 0.0,
        timestamp,
    };
    for pollutant in Pollutant::ALL {
        reading.set_concentration(pollutant, synthesize_concentration(rng, pollutant));
    }
    reading
}

fn synthesize_concentration<R: Rng + ?Sized>(rng: &mut R, pollutant: Pollutant) -> f64 {
    let (low, high, scale): (f64, f64, f64) = match pollutant {
        Pollutant::Pm25 => (10.0, 50.0, 10.0),
        Pollutant::Pm10 => (15.0, 80.0, 10.0),
        Pollutant::O3 => (20.0, 60.0, 10.0),
        Pollutant::No2 => (10.0, 40.0, 10.0),
        Pollutant::Co => (0.5, 2.5, 100.0),
        Pollutant::So2 => (5.0, 20.0, 10.0),
    };
    (rng.gen_range(low..=high) * scale).round() / scale
}

/// Feed values outside `0..=MAX_SANE_CONCENTRATION` (including NaN) are
/// treated as missing.
fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| (0.0..=MAX_SANE_CONCENTRATION).contains(v))
}

/// Builds reports and records history.
pub struct AirQualityService {
    gateway: Arc<dyn StorageGateway>,
    feed: Arc<dyn PollutantFeed>,
    clock: Arc<dyn Clock>,
    rng: Mutex<SmallRng>,
}

impl AirQualityService {
    /// Construct with an entropy-seeded generator for synthetic readings.
    pub fn new(
        gateway: Arc<dyn StorageGateway>,
        feed: Arc<dyn PollutantFeed>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_rng(gateway, feed, clock, SmallRng::from_entropy())
    }

    /// Construct with a caller-supplied generator, e.g. a seeded one.
    pub fn with_rng(
        gateway: Arc<dyn StorageGateway>,
        feed: Arc<dyn PollutantFeed>,
        clock: Arc<dyn Clock>,
        rng: SmallRng,
    ) -> Self {
        Self {
            gateway,
            feed,
            clock,
            rng: Mutex::new(rng),
        }
    }

    fn merge(
        &self,
        observation: Option<FeedObservation>,
        now: DateTime<Utc>,
    ) -> (PollutantReading, Option<(Option<String>, Vec<Pollutant>)>) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(observation) = observation else {
            return (synthesize_reading(&mut *rng, now), None);
        };

        let timestamp = observation.observed_at.unwrap_or(now);
        let mut reading = synthesize_reading(&mut *rng, timestamp);
        let mut substituted = Vec::new();
        for pollutant in Pollutant::ALL {
            match usable(observation.concentrations.get(&pollutant).copied()) {
                Some(value) => reading.set_concentration(pollutant, value),
                None => substituted.push(pollutant),
            }
        }
        (reading, Some((observation.station, substituted)))
    }

    /// Report current conditions at a coordinate.
    ///
    /// Feed failures never fail the report; they only change its provenance.
    pub async fn current_report(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<AirQualityReport, DomainError> {
        if !coordinates_are_valid(latitude, longitude) {
            return Err(DomainError::invalid_request(format!(
                "coordinates ({latitude}, {longitude}) are out of range"
            )));
        }

        let now = storage_now(self.clock.utc());
        let (observation, fallback_reason) = match self.feed.latest(latitude, longitude).await {
            Ok(Some(observation)) => (Some(observation), None),
            Ok(None) => (None, Some(SyntheticReason::NoStation)),
            Err(PollutantFeedError::Disabled) => {
                (None, Some(SyntheticReason::FeedDisabled))
            }
            Err(err) => {
                warn!(error = %err, latitude, longitude, "pollutant feed lookup failed");
                (None, Some(SyntheticReason::FeedUnavailable(err.to_string())))
            }
        };

        let (reading, enrichment) = self.merge(observation, now);
        let provenance = match (enrichment, fallback_reason) {
            (Some((station, substituted)), _) => ReadingProvenance::Enriched {
                station,
                substituted,
            },
            (None, reason) => ReadingProvenance::Synthetic {
                reason: reason.unwrap_or(SyntheticReason::NoStation),
            },
        };
        let aqi = compute_overall_index(&reading)?;
        debug!(latitude, longitude, aqi, "computed current report");

        Ok(AirQualityReport {
            latitude,
            longitude,
            reading,
            aqi,
            category: AqiCategory::from_index(aqi),
            provenance,
        })
    }

    /// Capture the current report for one of the user's saved locations.
    pub async fn record_history(
        &self,
        user_id: RecordId,
        location_id: RecordId,
    ) -> Result<(Stored<AirQualityHistoryEntry>, AirQualityReport), DomainError> {
        let location: Stored<SavedLocation> = find_record(
            self.gateway.as_ref(),
            &Filter::by_id(location_id).eq("user_id", user_id),
        )
        .await?
        .ok_or_else(|| DomainError::not_found(format!("location {location_id} not found")))?;

        let report = self
            .current_report(location.record.latitude, location.record.longitude)
            .await?;
        let entry = AirQualityHistoryEntry {
            location_id: Some(location.id),
            location_name: location.record.name,
            latitude: report.latitude,
            longitude: report.longitude,
            aqi: report.aqi,
            pm25: report.reading.pm25,
            pm10: report.reading.pm10,
            o3: report.reading.o3,
            no2: report.reading.no2,
            co: report.reading.co,
            so2: report.reading.so2,
            recorded_at: storage_now(report.reading.timestamp),
            created_at: storage_now(self.clock.utc()),
        };
        let stored = insert_record(self.gateway.as_ref(), entry).await?;
        Ok((stored, report))
    }

    /// Most recent history entries for a location, newest first.
    pub async fn recent_history(
        &self,
        location_id: RecordId,
        limit: u64,
    ) -> Result<Vec<Stored<AirQualityHistoryEntry>>, DomainError> {
        let options = FindOptions::new()
            .sort_by("recorded_at", SortDirection::Descending)
            .limit(limit.clamp(1, MAX_HISTORY_LISTED));
        Ok(find_records(
            self.gateway.as_ref(),
            &Filter::new().eq("location_id", location_id),
            &options,
        )
        .await?)
    }
}

#[cfg(test)]
#[path = "air_quality_service_tests.rs"]
mod tests;
