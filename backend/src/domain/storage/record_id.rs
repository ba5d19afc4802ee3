//! Backend-assigned record identifiers.

use std::fmt;

use serde::{Serialize, Serializer};

/// Opaque identifier assigned by whichever backend stored the record.
///
/// The document store hands out 12-byte object identifiers and the embedded
/// store hands out autoincrement integers. Callers may compare, order, hash,
/// and display identifiers but must not rely on their representation; text
/// received from outside is turned back into an identifier through
/// [`crate::domain::ports::StorageGateway::parse_id`].
///
/// # Examples
///
/// ```
/// # use aqi_backend::domain::RecordId;
/// let first = RecordId::sequence(1);
/// let second = RecordId::sequence(2);
/// assert!(first < second);
/// assert_eq!(second.to_string(), "2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(Repr);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Repr {
    Sequence(i64),
    Object([u8; 12]),
}

/// Error raised when external text is not a valid identifier for a backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid record identifier '{input}': {reason}")]
pub struct ParseRecordIdError {
    /// Rejected input.
    pub input: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

impl RecordId {
    /// Identifier backed by an integer row key.
    pub fn sequence(value: i64) -> Self {
        Self(Repr::Sequence(value))
    }

    /// Identifier backed by a 12-byte object id.
    pub fn object(bytes: [u8; 12]) -> Self {
        Self(Repr::Object(bytes))
    }

    /// Integer row key, when this identifier came from the embedded store.
    pub fn as_sequence(&self) -> Option<i64> {
        match self.0 {
            Repr::Sequence(value) => Some(value),
            Repr::Object(_) => None,
        }
    }

    /// Object id bytes, when this identifier came from the document store.
    pub fn as_object(&self) -> Option<[u8; 12]> {
        match self.0 {
            Repr::Object(bytes) => Some(bytes),
            Repr::Sequence(_) => None,
        }
    }

    /// Parse a positive decimal row key.
    pub fn parse_sequence(input: &str) -> Result<Self, ParseRecordIdError> {
        let value = input.parse::<i64>().map_err(|_| ParseRecordIdError {
            input: input.to_owned(),
            reason: "expected a decimal integer",
        })?;
        if value <= 0 {
            return Err(ParseRecordIdError {
                input: input.to_owned(),
                reason: "expected a positive integer",
            });
        }
        Ok(Self::sequence(value))
    }

    /// Parse a 24 character hexadecimal object id.
    pub fn parse_object(input: &str) -> Result<Self, ParseRecordIdError> {
        let invalid = || ParseRecordIdError {
            input: input.to_owned(),
            reason: "expected 24 hexadecimal characters",
        };
        let decoded = hex::decode(input).map_err(|_| invalid())?;
        let bytes: [u8; 12] = decoded.try_into().map_err(|_| invalid())?;
        Ok(Self::object(bytes))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Sequence(value) => write!(f, "{value}"),
            Repr::Object(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn object_ids_round_trip_through_text() {
        let id = RecordId::object([0x65, 0x1f, 0, 0, 0, 0, 0, 0, 0, 0, 0xab, 0xcd]);
        let text = id.to_string();

        assert_eq!(text, "651f0000000000000000abcd");
        assert_eq!(RecordId::parse_object(&text), Ok(id));
    }

    #[rstest]
    #[case("0")]
    #[case("-4")]
    #[case("12abc")]
    fn sequence_parsing_rejects_non_positive_or_garbage(#[case] raw: &str) {
        assert!(RecordId::parse_sequence(raw).is_err());
    }

    #[rstest]
    #[case("651f")]
    #[case("zz1f0000000000000000abcd")]
    fn object_parsing_rejects_wrong_shape(#[case] raw: &str) {
        assert!(RecordId::parse_object(raw).is_err());
    }

    #[rstest]
    fn object_ids_order_by_bytes() {
        let earlier = RecordId::object([0x65, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 9]);
        let later = RecordId::object([0x66, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
        assert!(earlier < later);
    }

    #[rstest]
    fn serialises_as_display_text() {
        let json = serde_json::to_string(&RecordId::sequence(42)).expect("serialise");
        assert_eq!(json, "\"42\"");
    }
}
