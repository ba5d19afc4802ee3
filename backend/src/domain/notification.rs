//! In-app notifications.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AqiCategory;
use super::storage::{Document, DocumentError, EntityKind, FieldValue, Record, RecordId};
use super::text_enum::define_text_enum;

define_text_enum! {
    /// What raised the notification.
    pub enum NotificationType / ParseNotificationTypeError ("notification type") {
        AqiAlert => "aqi_alert",
        ForecastAlert => "forecast_alert",
        System => "system",
    }
}

define_text_enum! {
    /// Urgency shown to the user.
    pub enum NotificationPriority / ParseNotificationPriorityError ("notification priority") {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

impl Default for NotificationPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl NotificationPriority {
    /// Priority for an alert raised at the given advisory band.
    ///
    /// # Examples
    ///
    /// ```
    /// # use aqi_backend::domain::{AqiCategory, NotificationPriority};
    /// assert_eq!(
    ///     NotificationPriority::for_category(AqiCategory::Hazardous),
    ///     NotificationPriority::Critical,
    /// );
    /// ```
    pub fn for_category(category: AqiCategory) -> Self {
        match category {
            AqiCategory::Good | AqiCategory::Moderate => Self::Low,
            AqiCategory::UnhealthyForSensitiveGroups => Self::Medium,
            AqiCategory::Unhealthy => Self::High,
            AqiCategory::VeryUnhealthy | AqiCategory::Hazardous => Self::Critical,
        }
    }
}

/// A message addressed to one user.
///
/// `is_read` only ever moves from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub user_id: RecordId,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub location_name: Option<String>,
    pub aqi_value: Option<u16>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for Notification {
    const KIND: EntityKind = EntityKind::Notifications;

    fn to_document(&self) -> Document {
        Document::new()
            .with("user_id", self.user_id)
            .with("title", self.title.as_str())
            .with("message", self.message.as_str())
            .with("notification_type", self.notification_type.as_str())
            .with("priority", self.priority.as_str())
            .with("location_name", FieldValue::from(self.location_name.clone()))
            .with("aqi_value", FieldValue::from(self.aqi_value.map(i64::from)))
            .with("is_read", self.is_read)
            .with("created_at", self.created_at)
    }

    fn from_document(document: &Document) -> Result<Self, DocumentError> {
        let aqi_value = document
            .optional_integer("aqi_value")?
            .map(|raw| {
                u16::try_from(raw).map_err(|_| DocumentError::UnknownVariant {
                    field: "aqi_value".to_owned(),
                    value: raw.to_string(),
                })
            })
            .transpose()?;
        Ok(Self {
            user_id: document.require_id("user_id")?,
            title: document.require_text("title")?,
            message: document.require_text("message")?,
            notification_type: document.require_parsed("notification_type")?,
            priority: document.require_parsed("priority")?,
            location_name: document.optional_text("location_name")?,
            aqi_value,
            is_read: document.require_bool("is_read")?,
            created_at: document.require_timestamp("created_at")?,
        })
    }
}
