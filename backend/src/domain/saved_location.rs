//! Locations a user watches.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::storage::{Document, DocumentError, EntityKind, FieldValue, Record, RecordId};

/// A named coordinate owned by one user. `name` is unique per owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedLocation {
    pub user_id: RecordId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for SavedLocation {
    const KIND: EntityKind = EntityKind::SavedLocations;

    fn to_document(&self) -> Document {
        Document::new()
            .with("user_id", self.user_id)
            .with("name", self.name.as_str())
            .with("latitude", self.latitude)
            .with("longitude", self.longitude)
            .with("city", FieldValue::from(self.city.clone()))
            .with("state", FieldValue::from(self.state.clone()))
            .with("country", FieldValue::from(self.country.clone()))
            .with("created_at", self.created_at)
    }

    fn from_document(document: &Document) -> Result<Self, DocumentError> {
        Ok(Self {
            user_id: document.require_id("user_id")?,
            name: document.require_text("name")?,
            latitude: document.require_float("latitude")?,
            longitude: document.require_float("longitude")?,
            city: document.optional_text("city")?,
            state: document.optional_text("state")?,
            country: document.optional_text("country")?,
            created_at: document.require_timestamp("created_at")?,
        })
    }
}

/// Coordinates are valid WGS84 degrees.
pub fn coordinates_are_valid(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}
