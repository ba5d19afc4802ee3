//! Conversion between storage documents and BSON.
//!
//! The identifier field is stored as `_id` and every identifier value as an
//! `ObjectId`. Timestamps become BSON dates. Decoding follows the field
//! catalogue: unknown stored fields are ignored, nulls are dropped, and
//! numeric widths written by other clients (`Int32`, integral values in
//! float fields) are accepted.

use chrono::DateTime;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, DateTime as BsonDateTime, Document as BsonDocument, doc};

use super::gateway_checks::integral_float;
use crate::domain::storage::{
    Document, EntityKind, FieldKind, FieldValue, Filter, FindOptions, ID_FIELD, RecordId,
    SortDirection,
};

pub(super) const MONGO_ID_FIELD: &str = "_id";

/// Field name as stored in the collection.
pub(super) fn stored_name(field: &str) -> &str {
    if field == ID_FIELD { MONGO_ID_FIELD } else { field }
}

/// Encode one value. Fails when an identifier was not issued by this
/// backend.
pub(super) fn encode_value(value: &FieldValue) -> Result<Bson, String> {
    Ok(match value {
        FieldValue::Null => Bson::Null,
        FieldValue::Bool(flag) => Bson::Boolean(*flag),
        FieldValue::Integer(number) => Bson::Int64(*number),
        FieldValue::Float(number) => Bson::Double(*number),
        FieldValue::Text(text) => Bson::String(text.clone()),
        FieldValue::Timestamp(at) => {
            Bson::DateTime(BsonDateTime::from_millis(at.timestamp_millis()))
        }
        FieldValue::Id(id) => Bson::ObjectId(ObjectId::from_bytes(
            id.as_object()
                .ok_or_else(|| format!("identifier {id} was not issued by this backend"))?,
        )),
    })
}

/// Equality filter document. A null clause matches missing fields too.
pub(super) fn encode_filter(filter: &Filter) -> Result<BsonDocument, String> {
    let mut encoded = BsonDocument::new();
    for (field, value) in filter.clauses() {
        encoded.insert(stored_name(field), encode_value(value)?);
    }
    Ok(encoded)
}

/// Document body for inserts and replacements; null fields are omitted.
pub(super) fn encode_document(document: &Document) -> Result<BsonDocument, String> {
    let mut encoded = BsonDocument::new();
    for (field, value) in document.iter().filter(|(_, value)| !value.is_null()) {
        encoded.insert(stored_name(field), encode_value(value)?);
    }
    Ok(encoded)
}

/// `$set` for non-null changes and `$unset` for null ones.
pub(super) fn encode_update(changes: &Document) -> Result<BsonDocument, String> {
    let mut set = BsonDocument::new();
    let mut unset = BsonDocument::new();
    for (field, value) in changes.iter() {
        if value.is_null() {
            unset.insert(stored_name(field), "");
        } else {
            set.insert(stored_name(field), encode_value(value)?);
        }
    }
    let mut update = BsonDocument::new();
    if !set.is_empty() {
        update.insert("$set", set);
    }
    if !unset.is_empty() {
        update.insert("$unset", unset);
    }
    Ok(update)
}

/// Sort document with an identifier tie-break; unsorted listings follow
/// identifier order.
pub(super) fn encode_sort(options: &FindOptions) -> BsonDocument {
    match &options.sort {
        Some(sort) => {
            let direction = match sort.direction {
                SortDirection::Ascending => 1,
                SortDirection::Descending => -1,
            };
            let mut encoded = BsonDocument::new();
            encoded.insert(stored_name(&sort.field), direction);
            encoded.insert(MONGO_ID_FIELD, direction);
            encoded
        }
        None => doc! { MONGO_ID_FIELD: 1 },
    }
}

/// Decode one stored value as `kind`; `Null` means absent.
pub(super) fn decode_value(field: &str, kind: FieldKind, value: &Bson) -> Result<FieldValue, String> {
    let decoded = match (kind, value) {
        (_, Bson::Null | Bson::Undefined) => FieldValue::Null,
        (FieldKind::Id | FieldKind::Reference(_), Bson::ObjectId(oid)) => {
            FieldValue::Id(RecordId::object(oid.bytes()))
        }
        (FieldKind::Text, Bson::String(text)) => FieldValue::Text(text.clone()),
        (FieldKind::Integer, Bson::Int32(number)) => FieldValue::Integer(i64::from(*number)),
        (FieldKind::Integer, Bson::Int64(number)) => FieldValue::Integer(*number),
        (FieldKind::Float, Bson::Double(number)) => FieldValue::Float(*number),
        (FieldKind::Float, Bson::Int32(number)) => FieldValue::Float(f64::from(*number)),
        (FieldKind::Float, Bson::Int64(number)) => {
            FieldValue::Float(integral_float(field, *number)?)
        }
        (FieldKind::Bool, Bson::Boolean(flag)) => FieldValue::Bool(*flag),
        (FieldKind::Timestamp, Bson::DateTime(at)) => {
            let millis = at.timestamp_millis();
            FieldValue::Timestamp(DateTime::from_timestamp_millis(millis).ok_or_else(|| {
                format!("field '{field}' holds out-of-range date {millis}")
            })?)
        }
        (kind, other) => {
            return Err(format!(
                "field '{field}' holds {:?} where {kind:?} was expected",
                other.element_type()
            ));
        }
    };
    Ok(decoded)
}

/// Decode a stored document, keeping only catalogued, non-null fields.
pub(super) fn decode_document(kind: EntityKind, stored: &BsonDocument) -> Result<Document, String> {
    let mut document = Document::new();
    for (name, value) in stored {
        let (field, field_kind) = if name == MONGO_ID_FIELD {
            (ID_FIELD, FieldKind::Id)
        } else {
            match kind.field(name) {
                Some(spec) => (spec.name, spec.kind),
                None => continue,
            }
        };
        let decoded = decode_value(field, field_kind, value)?;
        if !decoded.is_null() {
            document.insert(field, decoded);
        }
    }
    Ok(document)
}
