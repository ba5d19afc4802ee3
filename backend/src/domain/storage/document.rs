//! Backend-neutral field values and documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::RecordId;

/// Name of the identifier field carried by documents read from storage.
pub const ID_FIELD: &str = "id";

/// Scalar value stored in a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Explicit absence; omitted from documents returned by reads.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// UTC instant at millisecond precision.
    Timestamp(DateTime<Utc>),
    /// Identifier of this or another record.
    Id(RecordId),
}

impl FieldValue {
    /// Timestamp value truncated to millisecond precision.
    pub fn timestamp(at: DateTime<Utc>) -> Self {
        Self::Timestamp(truncate_to_millis(at))
    }

    /// Whether this is [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Id(_) => "id",
        }
    }
}

/// Drop sub-millisecond precision, which neither backend preserves.
pub fn truncate_to_millis(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(at.timestamp_millis()).unwrap_or(at)
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::timestamp(value)
    }
}

impl From<RecordId> for FieldValue {
    fn from(value: RecordId) -> Self {
        Self::Id(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Field lookup failure raised while decoding a typed record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    /// A required field was absent.
    #[error("missing field '{field}'")]
    Missing {
        /// Field name.
        field: String,
    },
    /// A field carried a value of the wrong kind.
    #[error("field '{field}' expected {expected}, found {found}")]
    WrongKind {
        /// Field name.
        field: String,
        /// Expected kind.
        expected: &'static str,
        /// Kind actually stored.
        found: &'static str,
    },
    /// A text field held a value outside its enumeration.
    #[error("field '{field}' holds unrecognised value '{value}'")]
    UnknownVariant {
        /// Field name.
        field: String,
        /// Stored text.
        value: String,
    },
}

/// Ordered map of field names to values.
///
/// Documents handed to writes must not carry [`ID_FIELD`]; documents returned
/// by reads always carry it and never carry [`FieldValue::Null`] entries.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document(BTreeMap<String, FieldValue>);

macro_rules! typed_accessors {
    ($( $required:ident, $optional:ident, $variant:ident, $ty:ty, $kind:literal; )+) => {
        $(
            #[doc = concat!("Required ", $kind, " field.")]
            pub fn $required(&self, field: &str) -> Result<$ty, DocumentError> {
                self.$optional(field)?
                    .ok_or_else(|| DocumentError::Missing { field: field.to_owned() })
            }

            #[doc = concat!("Optional ", $kind, " field; absent and null both read as `None`.")]
            pub fn $optional(&self, field: &str) -> Result<Option<$ty>, DocumentError> {
                match self.0.get(field) {
                    None | Some(FieldValue::Null) => Ok(None),
                    Some(FieldValue::$variant(value)) => Ok(Some(value.clone())),
                    Some(other) => Err(DocumentError::WrongKind {
                        field: field.to_owned(),
                        expected: $kind,
                        found: other.kind_name(),
                    }),
                }
            }
        )+
    };
}

impl Document {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Set a field, returning the previous value.
    pub fn insert(
        &mut self,
        field: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.0.insert(field.into(), value.into())
    }

    /// Remove a field.
    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.0.remove(field)
    }

    /// Raw field value.
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    /// Whether the field is present (even if null).
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop null entries.
    pub fn without_nulls(mut self) -> Self {
        self.0.retain(|_, value| !value.is_null());
        self
    }

    /// Identifier of a document read from storage.
    pub fn id(&self) -> Result<RecordId, DocumentError> {
        self.require_id(ID_FIELD)
    }

    typed_accessors! {
        require_bool, optional_bool, Bool, bool, "bool";
        require_integer, optional_integer, Integer, i64, "integer";
        require_float, optional_float, Float, f64, "float";
        require_text, optional_text, Text, String, "text";
        require_timestamp, optional_timestamp, Timestamp, DateTime<Utc>, "timestamp";
        require_id, optional_id, Id, RecordId, "id";
    }

    /// Required text field parsed into an enumeration.
    pub fn require_parsed<T: std::str::FromStr>(&self, field: &str) -> Result<T, DocumentError> {
        let raw = self.require_text(field)?;
        raw.parse().map_err(|_| DocumentError::UnknownVariant {
            field: field.to_owned(),
            value: raw,
        })
    }
}

impl FromIterator<(String, FieldValue)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Document {
    type Item = (String, FieldValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
