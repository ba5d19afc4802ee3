//! User settings services.
//!
//! Settings rows are created lazily. Reads insert the defaults when a user
//! has none; writes replace the row and fall back to an insert when the
//! replace matched nothing. Neither step relies on backend upserts.

use std::sync::Arc;

use mockable::Clock;
use tracing::debug;

use super::ports::StorageGateway;
use super::storage::{
    Filter, RecordId, Stored, find_record, insert_record, replace_record, storage_now,
};
use super::{DomainError, MAX_INDEX, SettingsUpdate, UserSettings};

/// Reads and writes per-user settings.
#[derive(Clone)]
pub struct SettingsService {
    gateway: Arc<dyn StorageGateway>,
    clock: Arc<dyn Clock>,
}

fn owner_filter(user_id: RecordId) -> Filter {
    Filter::new().eq("user_id", user_id)
}

impl SettingsService {
    /// Build the service over the active gateway.
    pub fn new(gateway: Arc<dyn StorageGateway>, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, clock }
    }

    /// Stored settings, if the user has any.
    pub async fn find(&self, user_id: RecordId) -> Result<Option<UserSettings>, DomainError> {
        let stored: Option<Stored<UserSettings>> =
            find_record(self.gateway.as_ref(), &owner_filter(user_id)).await?;
        Ok(stored.map(|row| row.record))
    }

    /// Settings for `user_id`, persisting the defaults on first access.
    pub async fn get_or_create(&self, user_id: RecordId) -> Result<UserSettings, DomainError> {
        if let Some(settings) = self.find(user_id).await? {
            return Ok(settings);
        }

        let defaults = UserSettings::defaults_for(user_id, storage_now(self.clock.utc()));
        match insert_record(self.gateway.as_ref(), defaults).await {
            Ok(stored) => {
                debug!(user_id = %user_id, "created default settings");
                Ok(stored.record)
            }
            Err(err) if err.is_conflict() => self
                .find(user_id)
                .await?
                .ok_or_else(|| DomainError::from(err)),
            Err(err) => Err(err.into()),
        }
    }

    /// Apply `update` and persist the result.
    pub async fn update(
        &self,
        user_id: RecordId,
        update: SettingsUpdate,
    ) -> Result<UserSettings, DomainError> {
        if !update.threshold_is_valid() {
            return Err(DomainError::invalid_request(format!(
                "aqi_threshold must be between 0 and {MAX_INDEX}"
            )));
        }

        let now = storage_now(self.clock.utc());
        let mut settings = match self.find(user_id).await? {
            Some(existing) => existing,
            None => UserSettings::defaults_for(user_id, now),
        };
        update.apply(&mut settings, now);

        let filter = owner_filter(user_id);
        let matched = replace_record(self.gateway.as_ref(), &filter, &settings).await?;
        if matched > 0 {
            return Ok(settings);
        }

        debug!(user_id = %user_id, "no settings row to replace; inserting");
        match insert_record(self.gateway.as_ref(), settings.clone()).await {
            Ok(stored) => Ok(stored.record),
            Err(err) if err.is_conflict() => {
                replace_record(self.gateway.as_ref(), &filter, &settings).await?;
                Ok(settings)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
#[path = "settings_service_tests.rs"]
mod tests;
