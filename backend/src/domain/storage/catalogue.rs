//! Entity kinds and the field catalogue shared by both backends.
//!
//! Every document crossing the gateway is checked against this catalogue, so
//! the document store and the embedded store accept and reject the same
//! shapes.

use std::fmt;

use super::{Document, FieldValue, Filter, FindOptions, ID_FIELD, StorageFailure};

/// Stored entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Users,
    SavedLocations,
    AirQualityHistory,
    Notifications,
    UserSettings,
}

impl EntityKind {
    pub const ALL: [Self; 5] = [
        Self::Users,
        Self::SavedLocations,
        Self::AirQualityHistory,
        Self::Notifications,
        Self::UserSettings,
    ];

    /// Collection name in the document store and table name in the embedded
    /// store.
    pub fn collection_name(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::SavedLocations => "saved_locations",
            Self::AirQualityHistory => "air_quality_history",
            Self::Notifications => "notifications",
            Self::UserSettings => "user_settings",
        }
    }

    /// Declared fields, excluding the identifier.
    pub fn fields(&self) -> &'static [FieldSpec] {
        match self {
            Self::Users => USERS,
            Self::SavedLocations => SAVED_LOCATIONS,
            Self::AirQualityHistory => AIR_QUALITY_HISTORY,
            Self::Notifications => NOTIFICATIONS,
            Self::UserSettings => USER_SETTINGS,
        }
    }

    /// Field groups that must be unique across the collection.
    pub fn unique_keys(&self) -> &'static [&'static [&'static str]] {
        match self {
            Self::Users => &[&["email"], &["username"]],
            Self::SavedLocations => &[&["user_id", "name"]],
            Self::UserSettings => &[&["user_id"]],
            Self::AirQualityHistory | Self::Notifications => &[],
        }
    }

    /// Look up a declared field.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.name == name)
    }

    /// Kind of a field, treating [`ID_FIELD`] as the identifier.
    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        if name == ID_FIELD {
            return Some(FieldKind::Id);
        }
        self.field(name).map(|spec| spec.kind)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_name())
    }
}

/// Storage type of a catalogued field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// The record's own identifier.
    Id,
    /// Identifier of another record.
    Reference(EntityKind),
    Text,
    Integer,
    Float,
    Bool,
    Timestamp,
}

impl FieldKind {
    /// Whether `value` may be stored in a field of this kind. Null is always
    /// accepted here; required-ness is checked separately.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (_, FieldValue::Null)
                | (Self::Id | Self::Reference(_), FieldValue::Id(_))
                | (Self::Text, FieldValue::Text(_))
                | (Self::Integer, FieldValue::Integer(_))
                | (Self::Float, FieldValue::Float(_))
                | (Self::Bool, FieldValue::Bool(_))
                | (Self::Timestamp, FieldValue::Timestamp(_))
        )
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Id | Self::Reference(_) => "id",
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
        }
    }
}

/// Catalogue entry for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
    }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
    }
}

const USER_REF: FieldKind = FieldKind::Reference(EntityKind::Users);

const USERS: &[FieldSpec] = &[
    required("email", FieldKind::Text),
    required("username", FieldKind::Text),
    optional("full_name", FieldKind::Text),
    required("password_hash", FieldKind::Text),
    required("is_active", FieldKind::Bool),
    required("created_at", FieldKind::Timestamp),
];

const SAVED_LOCATIONS: &[FieldSpec] = &[
    required("user_id", USER_REF),
    required("name", FieldKind::Text),
    required("latitude", FieldKind::Float),
    required("longitude", FieldKind::Float),
    optional("city", FieldKind::Text),
    optional("state", FieldKind::Text),
    optional("country", FieldKind::Text),
    required("created_at", FieldKind::Timestamp),
];

const AIR_QUALITY_HISTORY: &[FieldSpec] = &[
    optional("location_id", FieldKind::Reference(EntityKind::SavedLocations)),
    required("location_name", FieldKind::Text),
    required("latitude", FieldKind::Float),
    required("longitude", FieldKind::Float),
    required("aqi", FieldKind::Integer),
    required("pm25", FieldKind::Float),
    required("pm10", FieldKind::Float),
    required("o3", FieldKind::Float),
    required("no2", FieldKind::Float),
    required("co", FieldKind::Float),
    required("so2", FieldKind::Float),
    required("recorded_at", FieldKind::Timestamp),
    required("created_at", FieldKind::Timestamp),
];

const NOTIFICATIONS: &[FieldSpec] = &[
    required("user_id", USER_REF),
    required("title", FieldKind::Text),
    required("message", FieldKind::Text),
    required("notification_type", FieldKind::Text),
    required("priority", FieldKind::Text),
    optional("location_name", FieldKind::Text),
    optional("aqi_value", FieldKind::Integer),
    required("is_read", FieldKind::Bool),
    required("created_at", FieldKind::Timestamp),
];

const USER_SETTINGS: &[FieldSpec] = &[
    required("user_id", USER_REF),
    required("aqi_threshold", FieldKind::Integer),
    required("enable_notifications", FieldKind::Bool),
    required("notification_frequency", FieldKind::Text),
    required("preferred_units", FieldKind::Text),
    required("theme", FieldKind::Text),
    required("language", FieldKind::Text),
    required("updated_at", FieldKind::Timestamp),
];

/// How much of a document a write must supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    /// Inserts and replacements: every required field must be present.
    Full,
    /// Updates: any subset of fields.
    Partial,
}

/// Reject filters naming unknown fields or carrying mistyped values.
pub fn validate_filter(kind: EntityKind, filter: &Filter) -> Result<(), StorageFailure> {
    for (field, value) in filter.clauses() {
        let field_kind = kind
            .field_kind(field)
            .ok_or_else(|| StorageFailure::invalid_filter(format!("unknown field '{field}'")))?;
        if !field_kind.accepts(value) {
            return Err(StorageFailure::invalid_filter(format!(
                "field '{field}' expects {}, got {}",
                field_kind.name(),
                value.kind_name()
            )));
        }
    }
    Ok(())
}

/// Reject sorts on unknown fields.
pub fn validate_options(kind: EntityKind, options: &FindOptions) -> Result<(), StorageFailure> {
    match &options.sort {
        Some(sort) if kind.field_kind(&sort.field).is_none() => Err(
            StorageFailure::invalid_filter(format!("cannot sort by unknown field '{}'", sort.field)),
        ),
        _ => Ok(()),
    }
}

/// Reject documents that carry an identifier, unknown or mistyped fields, or
/// (for full writes) lack required fields.
pub fn validate_document(
    kind: EntityKind,
    document: &Document,
    completeness: Completeness,
) -> Result<(), StorageFailure> {
    if document.contains(ID_FIELD) {
        return Err(StorageFailure::invalid_document(
            "documents must not carry an identifier",
        ));
    }
    for (field, value) in document.iter() {
        let spec = kind
            .field(field)
            .ok_or_else(|| StorageFailure::invalid_document(format!("unknown field '{field}'")))?;
        if !spec.kind.accepts(value) {
            return Err(StorageFailure::invalid_document(format!(
                "field '{field}' expects {}, got {}",
                spec.kind.name(),
                value.kind_name()
            )));
        }
        if spec.required && value.is_null() {
            return Err(StorageFailure::invalid_document(format!(
                "field '{field}' must not be null"
            )));
        }
    }
    if completeness == Completeness::Full {
        if let Some(missing) = kind
            .fields()
            .iter()
            .find(|spec| spec.required && !document.contains(spec.name))
        {
            return Err(StorageFailure::invalid_document(format!(
                "missing required field '{}'",
                missing.name
            )));
        }
    }
    Ok(())
}
