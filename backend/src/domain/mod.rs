//! Domain primitives, services, and ports.
//!
//! Purpose: compute the air quality index from pollutant concentrations and
//! manage the records users keep (accounts, saved locations, notifications,
//! settings, history) through a single storage port.
//!
//! Public surface:
//! - Index engine (`compute_sub_index`, `compute_overall_index`,
//!   `AqiCategory`, `Pollutant`, `PollutantReading`).
//! - Storage value model (`storage::*`) and the `StorageGateway` port.
//! - Entities (`UserAccount`, `SavedLocation`, `Notification`,
//!   `UserSettings`, `AirQualityHistoryEntry`).
//! - Services driving the gateway (`AccountsService`, `SettingsService`,
//!   `LocationsService`, `NotificationsService`, `AirQualityService`).
//! - `DomainError` / `ErrorCode`: transport-agnostic failure payload.

pub mod air_quality;
pub mod error;
pub mod ports;
pub mod storage;

mod accounts_service;
mod air_quality_history;
mod air_quality_service;
mod locations_service;
mod notification;
mod notifications_service;
mod saved_location;
mod settings_service;
mod text_enum;
mod user_account;
mod user_settings;

#[cfg(test)]
mod service_fixtures;

pub use self::accounts_service::{AccountsService, NewAccount, ProfileUpdate};
pub use self::air_quality::{
    AqiCategory, Breakpoint, BreakpointTable, IndexError, MAX_INDEX, MAX_SANE_CONCENTRATION,
    ParsePollutantError, Pollutant, PollutantReading, breakpoint_table, compute_overall_index,
    compute_sub_index,
};
pub use self::air_quality_history::AirQualityHistoryEntry;
pub use self::air_quality_service::{
    AirQualityReport, AirQualityService, MAX_HISTORY_LISTED, ReadingProvenance, SyntheticReason,
    synthesize_reading,
};
pub use self::error::{DomainError, DomainErrorValidationError, ErrorCode};
pub use self::locations_service::{
    LocationUpdate, LocationsService, MAX_LOCATIONS_LISTED, NewLocation,
};
pub use self::notification::{
    Notification, NotificationPriority, NotificationType, ParseNotificationPriorityError,
    ParseNotificationTypeError,
};
pub use self::notifications_service::{
    DEFAULT_NOTIFICATION_LIMIT, MAX_NOTIFICATION_LIMIT, NewNotification, NotificationQuery,
    NotificationsService,
};
pub use self::saved_location::{SavedLocation, coordinates_are_valid};
pub use self::settings_service::SettingsService;
pub use self::storage::RecordId;
pub use self::user_account::{UserAccount, normalise_email};
pub use self::user_settings::{
    DEFAULT_AQI_THRESHOLD, LanguageCode, NotificationFrequency, ParseLanguageCodeError,
    ParseNotificationFrequencyError, ParseThemeError, ParseUnitPreferenceError, SettingsUpdate,
    Theme, UnitPreference, UserSettings,
};
