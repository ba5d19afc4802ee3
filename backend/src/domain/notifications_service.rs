//! Notification inbox services and AQI alerting.

use std::sync::Arc;

use mockable::Clock;
use tracing::{debug, info};

use super::ports::StorageGateway;
use super::storage::{
    Document, Filter, FindOptions, Record, RecordId, SortDirection, Stored, find_record,
    find_records, insert_record, storage_now,
};
use super::{
    AqiCategory, DomainError, Notification, NotificationPriority, NotificationType, UserSettings,
};

/// Page size used when a listing does not ask for one.
pub const DEFAULT_NOTIFICATION_LIMIT: u64 = 50;
/// Largest page a listing may request.
pub const MAX_NOTIFICATION_LIMIT: u64 = 100;

/// Notification creation payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub location_name: Option<String>,
    pub aqi_value: Option<u16>,
}

/// Listing filters and paging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationQuery {
    pub is_read: Option<bool>,
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
    pub skip: u64,
    /// `1..=100`; defaults to [`DEFAULT_NOTIFICATION_LIMIT`].
    pub limit: Option<u64>,
}

/// Owner-scoped notification operations.
#[derive(Clone)]
pub struct NotificationsService {
    gateway: Arc<dyn StorageGateway>,
    clock: Arc<dyn Clock>,
}

fn inbox(user_id: RecordId) -> Filter {
    Filter::new().eq("user_id", user_id)
}

fn owned(user_id: RecordId, notification_id: RecordId) -> Filter {
    Filter::by_id(notification_id).eq("user_id", user_id)
}

fn not_found(notification_id: RecordId) -> DomainError {
    DomainError::not_found(format!("notification {notification_id} not found"))
}

impl NotificationsService {
    /// Build the service over the active gateway.
    pub fn new(gateway: Arc<dyn StorageGateway>, clock: Arc<dyn Clock>) -> Self {
        Self { gateway, clock }
    }

    fn build(&self, user_id: RecordId, request: NewNotification) -> Result<Notification, DomainError> {
        let title = request.title.trim();
        let message = request.message.trim();
        if title.is_empty() || message.is_empty() {
            return Err(DomainError::invalid_request(
                "notification title and message must not be empty",
            ));
        }
        Ok(Notification {
            user_id,
            title: title.to_owned(),
            message: message.to_owned(),
            notification_type: request.notification_type,
            priority: request.priority,
            location_name: request.location_name,
            aqi_value: request.aqi_value,
            is_read: false,
            created_at: storage_now(self.clock.utc()),
        })
    }

    /// Validate and store a new notification for `user_id`.
    pub async fn create(
        &self,
        user_id: RecordId,
        request: NewNotification,
    ) -> Result<Stored<Notification>, DomainError> {
        let notification = self.build(user_id, request)?;
        Ok(insert_record(self.gateway.as_ref(), notification).await?)
    }

    /// Create several notifications; validation runs before any write.
    pub async fn create_many(
        &self,
        user_id: RecordId,
        requests: Vec<NewNotification>,
    ) -> Result<Vec<Stored<Notification>>, DomainError> {
        let notifications = requests
            .into_iter()
            .map(|request| self.build(user_id, request))
            .collect::<Result<Vec<_>, _>>()?;
        let mut stored = Vec::with_capacity(notifications.len());
        for notification in notifications {
            stored.push(insert_record(self.gateway.as_ref(), notification).await?);
        }
        Ok(stored)
    }

    /// The owner's notifications, newest first.
    pub async fn list(
        &self,
        user_id: RecordId,
        query: &NotificationQuery,
    ) -> Result<Vec<Stored<Notification>>, DomainError> {
        let limit = query.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT);
        if !(1..=MAX_NOTIFICATION_LIMIT).contains(&limit) {
            return Err(DomainError::invalid_request(format!(
                "limit must be between 1 and {MAX_NOTIFICATION_LIMIT}"
            )));
        }

        let mut filter = inbox(user_id);
        if let Some(is_read) = query.is_read {
            filter = filter.eq("is_read", is_read);
        }
        if let Some(kind) = query.notification_type {
            filter = filter.eq("notification_type", kind.as_str());
        }
        if let Some(priority) = query.priority {
            filter = filter.eq("priority", priority.as_str());
        }
        let options = FindOptions::new()
            .sort_by("created_at", SortDirection::Descending)
            .skip(query.skip)
            .limit(limit);
        Ok(find_records(self.gateway.as_ref(), &filter, &options).await?)
    }

    /// Number of unread notifications in the user's inbox.
    pub async fn unread_count(&self, user_id: RecordId) -> Result<u64, DomainError> {
        let filter = inbox(user_id).eq("is_read", false);
        Ok(self
            .gateway
            .count_matching(Notification::KIND, &filter)
            .await?)
    }

    /// Fetch one notification owned by `user_id`.
    pub async fn get(
        &self,
        user_id: RecordId,
        notification_id: RecordId,
    ) -> Result<Stored<Notification>, DomainError> {
        find_record(self.gateway.as_ref(), &owned(user_id, notification_id))
            .await?
            .ok_or_else(|| not_found(notification_id))
    }

    /// Mark one notification read. Already-read notifications are returned
    /// unchanged; the flag never reverts.
    pub async fn mark_read(
        &self,
        user_id: RecordId,
        notification_id: RecordId,
    ) -> Result<Stored<Notification>, DomainError> {
        let unread = owned(user_id, notification_id).eq("is_read", false);
        let matched = self
            .gateway
            .update_one(
                Notification::KIND,
                &unread,
                Document::new().with("is_read", true),
            )
            .await?;
        if matched == 0 {
            debug!(notification_id = %notification_id, "notification already read or absent");
        }
        self.get(user_id, notification_id).await
    }

    /// Mark every unread notification read; returns how many changed.
    pub async fn mark_all_read(&self, user_id: RecordId) -> Result<u64, DomainError> {
        let unread = inbox(user_id).eq("is_read", false);
        let changed = self
            .gateway
            .update_many(
                Notification::KIND,
                &unread,
                Document::new().with("is_read", true),
            )
            .await?;
        info!(user_id = %user_id, changed, "marked notifications read");
        Ok(changed)
    }

    /// Remove a notification owned by `user_id`.
    pub async fn delete(
        &self,
        user_id: RecordId,
        notification_id: RecordId,
    ) -> Result<(), DomainError> {
        let deleted = self
            .gateway
            .delete_one(Notification::KIND, &owned(user_id, notification_id))
            .await?;
        if deleted == 0 {
            return Err(not_found(notification_id));
        }
        Ok(())
    }

    /// Delete the owner's notifications, optionally only read or unread ones.
    pub async fn delete_all(
        &self,
        user_id: RecordId,
        is_read: Option<bool>,
    ) -> Result<u64, DomainError> {
        let mut filter = inbox(user_id);
        if let Some(is_read) = is_read {
            filter = filter.eq("is_read", is_read);
        }
        Ok(self
            .gateway
            .delete_many(Notification::KIND, &filter)
            .await?)
    }

    /// Raise an AQI alert when the user's settings ask for one.
    ///
    /// Users without stored settings are judged against the defaults.
    /// Returns `None` when no alert was warranted.
    pub async fn raise_aqi_alert(
        &self,
        user_id: RecordId,
        location_name: &str,
        index: u16,
    ) -> Result<Option<Stored<Notification>>, DomainError> {
        let stored: Option<Stored<UserSettings>> = find_record(
            self.gateway.as_ref(),
            &Filter::new().eq("user_id", user_id),
        )
        .await?;
        let now = storage_now(self.clock.utc());
        let settings = stored.map_or_else(
            || UserSettings::defaults_for(user_id, now),
            |row| row.record,
        );
        if !settings.should_alert(index) {
            debug!(user_id = %user_id, index, threshold = settings.aqi_threshold, "no alert needed");
            return Ok(None);
        }

        let category = AqiCategory::from_index(index);
        let request = NewNotification {
            title: format!("Air quality alert for {location_name}"),
            message: format!(
                "AQI at {location_name} is {index} ({category}), above your threshold of {}.",
                settings.aqi_threshold
            ),
            notification_type: NotificationType::AqiAlert,
            priority: NotificationPriority::for_category(category),
            location_name: Some(location_name.to_owned()),
            aqi_value: Some(index),
        };
        let stored = self.create(user_id, request).await?;
        info!(user_id = %user_id, index, "raised aqi alert");
        Ok(Some(stored))
    }
}

#[cfg(test)]
#[path = "notifications_service_tests.rs"]
mod tests;
