//! Recorded index readings for saved locations.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::PollutantReading;
use super::storage::{Document, DocumentError, EntityKind, FieldValue, Record, RecordId};

/// One reading captured for a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualityHistoryEntry {
    /// Saved location the reading belongs to, if any.
    pub location_id: Option<RecordId>,
    pub location_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub aqi: u16,
    pub pm25: f64,
    pub pm10: f64,
    pub o3: f64,
    pub no2: f64,
    pub co: f64,
    pub so2: f64,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl AirQualityHistoryEntry {
    /// Concentrations as a reading for the index engine.
    pub fn reading(&self) -> PollutantReading {
        PollutantReading {
            pm25: self.pm25,
            pm10: self.pm10,
            o3: self.o3,
            no2: self.no2,
            co: self.co,
            so2: self.so2,
            timestamp: self.recorded_at,
        }
    }
}

impl Record for AirQualityHistoryEntry {
    const KIND: EntityKind = EntityKind::AirQualityHistory;

    fn to_document(&self) -> Document {
        Document::new()
            .with("location_id", FieldValue::from(self.location_id))
            .with("location_name", self.location_name.as_str())
            .with("latitude", self.latitude)
            .with("longitude", self.longitude)
            .with("aqi", i64::from(self.aqi))
            .with("pm25", self.pm25)
            .with("pm10", self.pm10)
            .with("o3", self.o3)
            .with("no2", self.no2)
            .with("co", self.co)
            .with("so2", self.so2)
            .with("recorded_at", self.recorded_at)
            .with("created_at", self.created_at)
    }

    fn from_document(document: &Document) -> Result<Self, DocumentError> {
        let raw_aqi = document.require_integer("aqi")?;
        let aqi = u16::try_from(raw_aqi).map_err(|_| DocumentError::UnknownVariant {
            field: "aqi".to_owned(),
            value: raw_aqi.to_string(),
        })?;
        Ok(Self {
            location_id: document.optional_id("location_id")?,
            location_name: document.require_text("location_name")?,
            latitude: document.require_float("latitude")?,
            longitude: document.require_float("longitude")?,
            aqi,
            pm25: document.require_float("pm25")?,
            pm10: document.require_float("pm10")?,
            o3: document.require_float("o3")?,
            no2: document.require_float("no2")?,
            co: document.require_float("co")?,
            so2: document.require_float("so2")?,
            recorded_at: document.require_timestamp("recorded_at")?,
            created_at: document.require_timestamp("created_at")?,
        })
    }
}
