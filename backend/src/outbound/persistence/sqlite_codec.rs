//! Conversion between storage field values and SQLite cells.
//!
//! Booleans are stored as `0`/`1`, timestamps as RFC 3339 text with
//! millisecond precision and a `Z` suffix, and identifiers as the integer row
//! key. Decoding is driven by the field catalogue so a cell is always read
//! back as the kind it was declared with.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::{Value, ValueRef};

use super::gateway_checks::integral_float;
use crate::domain::storage::{Document, EntityKind, FieldKind, FieldValue, ID_FIELD, RecordId};

/// Render a field value as a bind parameter.
///
/// Fails when an identifier was not issued by this backend.
pub(super) fn encode_value(value: &FieldValue) -> Result<Value, String> {
    Ok(match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Float(number) => Value::Real(*number),
        FieldValue::Text(text) => Value::Text(text.clone()),
        FieldValue::Timestamp(at) => Value::Text(encode_timestamp(*at)),
        FieldValue::Id(id) => Value::Integer(
            id.as_sequence()
                .ok_or_else(|| format!("identifier {id} was not issued by this backend"))?,
        ),
    })
}

pub(super) fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Read one cell back as a field value of `kind`.
///
/// `NULL` cells decode to [`FieldValue::Null`].
pub(super) fn decode_cell(
    column: &str,
    kind: FieldKind,
    cell: ValueRef<'_>,
) -> Result<FieldValue, String> {
    let value = match (kind, cell) {
        (_, ValueRef::Null) => FieldValue::Null,
        (FieldKind::Id | FieldKind::Reference(_), ValueRef::Integer(key)) => {
            FieldValue::Id(RecordId::sequence(key))
        }
        (FieldKind::Integer, ValueRef::Integer(number)) => FieldValue::Integer(number),
        (FieldKind::Float, ValueRef::Real(number)) => FieldValue::Float(number),
        // SQLite stores integral REAL values written by other tools as INTEGER.
        (FieldKind::Float, ValueRef::Integer(number)) => {
            FieldValue::Float(integral_float(column, number)?)
        }
        (FieldKind::Bool, ValueRef::Integer(flag)) => FieldValue::Bool(flag != 0),
        (FieldKind::Text, ValueRef::Text(bytes)) => FieldValue::Text(
            std::str::from_utf8(bytes)
                .map_err(|error| format!("column '{column}' is not UTF-8: {error}"))?
                .to_owned(),
        ),
        (FieldKind::Timestamp, ValueRef::Text(bytes)) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|error| format!("column '{column}' is not UTF-8: {error}"))?;
            let parsed = DateTime::parse_from_rfc3339(text)
                .map_err(|error| format!("column '{column}' holds invalid timestamp '{text}': {error}"))?;
            FieldValue::timestamp(parsed.with_timezone(&Utc))
        }
        (kind, other) => {
            return Err(format!(
                "column '{column}' holds {:?} where {kind:?} was expected",
                other.data_type()
            ));
        }
    };
    Ok(value)
}

/// Column list for reads: the identifier followed by every catalogued field.
pub(super) fn select_columns(kind: EntityKind) -> String {
    std::iter::once(ID_FIELD)
        .chain(kind.fields().iter().map(|spec| spec.name))
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Decode a row selected with [`select_columns`], dropping `NULL` cells.
pub(super) fn decode_row(kind: EntityKind, row: &Row<'_>) -> Result<Document, String> {
    let mut document = Document::new();
    let id = decode_cell(ID_FIELD, FieldKind::Id, cell(row, 0)?)?;
    document.insert(ID_FIELD, id);
    for (offset, spec) in kind.fields().iter().enumerate() {
        let value = decode_cell(spec.name, spec.kind, cell(row, offset + 1)?)?;
        if !value.is_null() {
            document.insert(spec.name, value);
        }
    }
    Ok(document)
}

fn cell<'row>(row: &'row Row<'_>, index: usize) -> Result<ValueRef<'row>, String> {
    row.get_ref(index)
        .map_err(|error| format!("column {index} unreadable: {error}"))
}

/// Double-quote a catalogued column or table name.
pub(super) fn quote_identifier(name: &str) -> String {
    format!("\"{name}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    fn timestamps_render_with_millis_and_zulu_suffix() {
        let at = Utc
            .with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
            .single()
            .expect("valid fixture time")
            + chrono::Duration::milliseconds(678);
        assert_eq!(encode_timestamp(at), "2026-01-02T03:04:05.678Z");
    }

    #[rstest]
    fn foreign_identifiers_are_rejected() {
        let error = encode_value(&FieldValue::Id(RecordId::object([7; 12])))
            .expect_err("object ids are not row keys");
        assert!(error.contains("not issued by this backend"));
    }

    #[rstest]
    #[case(FieldKind::Bool, ValueRef::Integer(1), FieldValue::Bool(true))]
    #[case(FieldKind::Float, ValueRef::Integer(3), FieldValue::Float(3.0))]
    #[case(
        FieldKind::Reference(EntityKind::Users),
        ValueRef::Integer(9),
        FieldValue::Id(RecordId::sequence(9))
    )]
    #[case(FieldKind::Text, ValueRef::Null, FieldValue::Null)]
    fn cells_decode_by_declared_kind(
        #[case] kind: FieldKind,
        #[case] cell: ValueRef<'static>,
        #[case] expected: FieldValue,
    ) {
        assert_eq!(decode_cell("pm25", kind, cell), Ok(expected));
    }

    #[rstest]
    fn mismatched_cells_are_reported() {
        let error = decode_cell("aqi", FieldKind::Integer, ValueRef::Text(b"high"))
            .expect_err("text in an integer column");
        assert!(error.contains("'aqi'"));
    }

    #[rstest]
    fn oversized_integers_in_float_columns_are_reported() {
        let error = decode_cell("pm25", FieldKind::Float, ValueRef::Integer(i64::MAX))
            .expect_err("value would round");
        assert!(error.contains("'pm25'"));
    }
}
