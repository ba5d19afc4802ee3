//! Per-user alerting and display settings.
//!
//! Settings are 1:1 with accounts. A user without a stored row is served the
//! defaults, which are persisted on first access.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::MAX_INDEX;
use super::storage::{Document, DocumentError, EntityKind, Record, RecordId};
use super::text_enum::define_text_enum;

/// Threshold assigned to new users.
pub const DEFAULT_AQI_THRESHOLD: u16 = 100;

define_text_enum! {
    /// How often alerts may be delivered.
    pub enum NotificationFrequency / ParseNotificationFrequencyError ("notification frequency") {
        Hourly => "hourly",
        Daily => "daily",
        Weekly => "weekly",
    }
}

define_text_enum! {
    /// Display unit system.
    pub enum UnitPreference / ParseUnitPreferenceError ("unit preference") {
        Metric => "metric",
        Imperial => "imperial",
    }
}

define_text_enum! {
    /// Interface colour scheme.
    pub enum Theme / ParseThemeError ("theme") {
        Light => "light",
        Dark => "dark",
        Auto => "auto",
    }
}

define_text_enum! {
    /// Interface language.
    pub enum LanguageCode / ParseLanguageCodeError ("language code") {
        English => "en",
        Hindi => "hi",
        Tamil => "ta",
        Telugu => "te",
        Bengali => "bn",
        Marathi => "mr",
        Gujarati => "gu",
        Kannada => "kn",
        Malayalam => "ml",
        Punjabi => "pa",
        Odia => "or",
        Assamese => "as",
    }
}

/// Stored settings row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSettings {
    pub user_id: RecordId,
    /// Alert when the overall index exceeds this value; within `0..=500`.
    pub aqi_threshold: u16,
    pub enable_notifications: bool,
    pub notification_frequency: NotificationFrequency,
    pub preferred_units: UnitPreference,
    pub theme: Theme,
    pub language: LanguageCode,
    pub updated_at: DateTime<Utc>,
}

impl UserSettings {
    /// Defaults for a user who has never saved settings.
    pub fn defaults_for(user_id: RecordId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            aqi_threshold: DEFAULT_AQI_THRESHOLD,
            enable_notifications: true,
            notification_frequency: NotificationFrequency::Daily,
            preferred_units: UnitPreference::Metric,
            theme: Theme::Light,
            language: LanguageCode::English,
            updated_at: now,
        }
    }

    /// Whether an overall index should raise an alert for this user.
    pub fn should_alert(&self, index: u16) -> bool {
        self.enable_notifications && index > self.aqi_threshold
    }
}

/// Partial settings change; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub aqi_threshold: Option<u16>,
    pub enable_notifications: Option<bool>,
    pub notification_frequency: Option<NotificationFrequency>,
    pub preferred_units: Option<UnitPreference>,
    pub theme: Option<Theme>,
    pub language: Option<LanguageCode>,
}

impl SettingsUpdate {
    /// Apply onto `settings`, stamping `now`.
    pub fn apply(&self, settings: &mut UserSettings, now: DateTime<Utc>) {
        if let Some(threshold) = self.aqi_threshold {
            settings.aqi_threshold = threshold;
        }
        if let Some(enabled) = self.enable_notifications {
            settings.enable_notifications = enabled;
        }
        if let Some(frequency) = self.notification_frequency {
            settings.notification_frequency = frequency;
        }
        if let Some(units) = self.preferred_units {
            settings.preferred_units = units;
        }
        if let Some(theme) = self.theme {
            settings.theme = theme;
        }
        if let Some(language) = self.language {
            settings.language = language;
        }
        settings.updated_at = now;
    }

    /// Whether the requested threshold lies on the index scale.
    pub fn threshold_is_valid(&self) -> bool {
        self.aqi_threshold
            .is_none_or(|threshold| threshold <= MAX_INDEX)
    }
}

impl Record for UserSettings {
    const KIND: EntityKind = EntityKind::UserSettings;

    fn to_document(&self) -> Document {
        Document::new()
            .with("user_id", self.user_id)
            .with("aqi_threshold", i64::from(self.aqi_threshold))
            .with("enable_notifications", self.enable_notifications)
            .with("notification_frequency", self.notification_frequency.as_str())
            .with("preferred_units", self.preferred_units.as_str())
            .with("theme", self.theme.as_str())
            .with("language", self.language.as_str())
            .with("updated_at", self.updated_at)
    }

    fn from_document(document: &Document) -> Result<Self, DocumentError> {
        let raw_threshold = document.require_integer("aqi_threshold")?;
        let aqi_threshold = u16::try_from(raw_threshold)
            .ok()
            .filter(|threshold| *threshold <= MAX_INDEX)
            .ok_or_else(|| DocumentError::UnknownVariant {
                field: "aqi_threshold".to_owned(),
                value: raw_threshold.to_string(),
            })?;
        Ok(Self {
            user_id: document.require_id("user_id")?,
            aqi_threshold,
            enable_notifications: document.require_bool("enable_notifications")?,
            notification_frequency: document.require_parsed("notification_frequency")?,
            preferred_units: document.require_parsed("preferred_units")?,
            theme: document.require_parsed("theme")?,
            language: document.require_parsed("language")?,
            updated_at: document.require_timestamp("updated_at")?,
        })
    }
}
