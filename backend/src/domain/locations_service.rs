//! Saved location services.

use std::collections::BTreeSet;
use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::info;

use super::ports::StorageGateway;
use super::storage::{
    Document, FieldValue, Filter, FindOptions, Record, RecordId, SortDirection, Stored,
    find_record, find_records, insert_record, storage_now,
};
use super::{DomainError, SavedLocation, coordinates_are_valid};

/// Most locations returned by a listing.
pub const MAX_LOCATIONS_LISTED: u64 = 100;

/// Location creation payload.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// Location change; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationUpdate {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// Owner-scoped saved location operations.
#[derive(Clone)]
pub struct LocationsService {
    gateway: Arc<dyn StorageGateway>,
    clock: Arc<dyn Clock>,
}

fn owned(user_id: RecordId, location_id: RecordId) -> Filter {
    Filter::by_id(location_id).eq("user_id", user_id)
}

fn not_found(location_id: RecordId) -> DomainError {
    DomainError::not_found(format!("location {location_id} not found"))
}

fn name_taken(name: &str) -> DomainError {
    DomainError::conflict(format!("a location named '{name}' already exists"))
        .with_details(json!({ "field": "name", "value": name }))
}

fn validate_name(raw: &str) -> Result<String, DomainError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::invalid_request("location name must not be empty"));
    }
    Ok(name.to_owned())
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), DomainError> {
    if coordinates_are_valid(latitude, longitude) {
        Ok(())
    } else {
        Err(DomainError::invalid_request(format!(
            "coordinates ({latitude}, {longitude}) are out of range"
        )))
    }
}

impl LocationsService {
    /// Build the service over the active gateway.
    pub fn new(gateway: Arc<dyn StorageGateway>, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, clock }
    }

    fn build(&self, user_id: RecordId, request: NewLocation) -> Result<SavedLocation, DomainError> {
        let name = validate_name(&request.name)?;
        validate_coordinates(request.latitude, request.longitude)?;
        Ok(SavedLocation {
            user_id,
            name,
            latitude: request.latitude,
            longitude: request.longitude,
            city: request.city,
            state: request.state,
            country: request.country,
            created_at: storage_now(self.clock.utc()),
        })
    }

    /// Save a location, rejecting a name the owner already uses.
    pub async fn create(
        &self,
        user_id: RecordId,
        request: NewLocation,
    ) -> Result<Stored<SavedLocation>, DomainError> {
        let location = self.build(user_id, request)?;
        let filter = Filter::new()
            .eq("user_id", user_id)
            .eq("name", location.name.as_str());
        if self
            .gateway
            .count_matching(SavedLocation::KIND, &filter)
            .await?
            > 0
        {
            return Err(name_taken(&location.name));
        }

        let stored = insert_record(self.gateway.as_ref(), location).await?;
        info!(user_id = %user_id, location_id = %stored.id, "saved location");
        Ok(stored)
    }

    /// Save several locations at once.
    ///
    /// The whole batch is rejected before anything is written if a name
    /// repeats inside the batch or collides with an existing location.
    pub async fn create_many(
        &self,
        user_id: RecordId,
        requests: Vec<NewLocation>,
    ) -> Result<Vec<Stored<SavedLocation>>, DomainError> {
        if requests.is_empty() {
            return Err(DomainError::invalid_request("no locations supplied"));
        }
        let locations = requests
            .into_iter()
            .map(|request| self.build(user_id, request))
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = BTreeSet::new();
        if let Some(repeat) = locations
            .iter()
            .find(|location| !seen.insert(location.name.as_str()))
        {
            return Err(DomainError::invalid_request(format!(
                "location name '{}' appears more than once",
                repeat.name
            )));
        }

        let existing: BTreeSet<String> = self
            .gateway
            .distinct_values(
                SavedLocation::KIND,
                "name",
                &Filter::new().eq("user_id", user_id),
            )
            .await?
            .into_iter()
            .filter_map(|value| match value {
                FieldValue::Text(name) => Some(name),
                _ => None,
            })
            .collect();
        let clashes: Vec<&str> = locations
            .iter()
            .map(|location| location.name.as_str())
            .filter(|name| existing.contains(*name))
            .collect();
        if !clashes.is_empty() {
            return Err(DomainError::conflict(format!(
                "locations already exist: {}",
                clashes.join(", ")
            ))
            .with_details(json!({ "field": "name", "values": clashes })));
        }

        let mut stored = Vec::with_capacity(locations.len());
        for location in locations {
            stored.push(insert_record(self.gateway.as_ref(), location).await?);
        }
        info!(user_id = %user_id, count = stored.len(), "saved locations in bulk");
        Ok(stored)
    }

    /// The owner's locations, oldest first.
    pub async fn list(&self, user_id: RecordId) -> Result<Vec<Stored<SavedLocation>>, DomainError> {
        let options = FindOptions::new()
            .sort_by("created_at", SortDirection::Ascending)
            .limit(MAX_LOCATIONS_LISTED);
        Ok(find_records(
            self.gateway.as_ref(),
            &Filter::new().eq("user_id", user_id),
            &options,
        )
        .await?)
    }

    /// Fetch one of the user's saved locations.
    pub async fn get(
        &self,
        user_id: RecordId,
        location_id: RecordId,
    ) -> Result<Stored<SavedLocation>, DomainError> {
        find_record(self.gateway.as_ref(), &owned(user_id, location_id))
            .await?
            .ok_or_else(|| not_found(location_id))
    }

    /// Change a location. A rename is checked against the owner's other
    /// locations.
    pub async fn update(
        &self,
        user_id: RecordId,
        location_id: RecordId,
        update: LocationUpdate,
    ) -> Result<Stored<SavedLocation>, DomainError> {
        let mut current = self.get(user_id, location_id).await?;
        let mut changes = Document::new();

        if let Some(raw) = update.name {
            let name = validate_name(&raw)?;
            if name != current.record.name {
                let clash = Filter::new()
                    .eq("user_id", user_id)
                    .eq("name", name.as_str());
                if self
                    .gateway
                    .count_matching(SavedLocation::KIND, &clash)
                    .await?
                    > 0
                {
                    return Err(name_taken(&name));
                }
                changes.insert("name", name.as_str());
                current.record.name = name;
            }
        }

        let latitude = update.latitude.unwrap_or(current.record.latitude);
        let longitude = update.longitude.unwrap_or(current.record.longitude);
        if update.latitude.is_some() || update.longitude.is_some() {
            validate_coordinates(latitude, longitude)?;
            changes.insert("latitude", latitude);
            changes.insert("longitude", longitude);
            current.record.latitude = latitude;
            current.record.longitude = longitude;
        }
        for (field, value, slot) in [
            ("city", update.city, &mut current.record.city),
            ("state", update.state, &mut current.record.state),
            ("country", update.country, &mut current.record.country),
        ] {
            if let Some(value) = value {
                changes.insert(field, value.as_str());
                *slot = Some(value);
            }
        }

        if changes.is_empty() {
            return Ok(current);
        }
        let matched = self
            .gateway
            .update_one(SavedLocation::KIND, &owned(user_id, location_id), changes)
            .await?;
        if matched == 0 {
            return Err(not_found(location_id));
        }
        Ok(current)
    }

    /// Remove a saved location owned by `user_id`.
    pub async fn delete(&self, user_id: RecordId, location_id: RecordId) -> Result<(), DomainError> {
        let deleted = self
            .gateway
            .delete_one(SavedLocation::KIND, &owned(user_id, location_id))
            .await?;
        if deleted == 0 {
            return Err(not_found(location_id));
        }
        info!(user_id = %user_id, location_id = %location_id, "deleted location");
        Ok(())
    }
}

#[cfg(test)]
#[path = "locations_service_tests.rs"]
mod tests;
