//! Typed records layered over the document gateway.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::ports::StorageGateway;

use super::{
    Document, DocumentError, EntityKind, Filter, FindOptions, RecordId, StorageError,
    StorageFailure, StorageOperation,
};

/// An entity that can be written to and read from a collection.
pub trait Record: Sized + Send + Sync {
    /// Collection the entity lives in.
    const KIND: EntityKind;

    /// Encode every field except the identifier.
    fn to_document(&self) -> Document;

    /// Decode from a stored document.
    fn from_document(document: &Document) -> Result<Self, DocumentError>;
}

/// A record together with its backend-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stored<T> {
    pub id: RecordId,
    #[serde(flatten)]
    pub record: T,
}

impl<T: Record> Stored<T> {
    /// Decode a document read from storage.
    pub fn decode(document: &Document) -> Result<Self, DocumentError> {
        Ok(Self {
            id: document.id()?,
            record: T::from_document(document)?,
        })
    }
}

fn decode_failure<T: Record>(operation: StorageOperation, error: &DocumentError) -> StorageError {
    StorageError::new(
        T::KIND,
        operation,
        StorageFailure::serialization(error.to_string()),
    )
}

/// Fetch and decode the first matching record.
pub async fn find_record<T, G>(gateway: &G, filter: &Filter) -> Result<Option<Stored<T>>, StorageError>
where
    T: Record,
    G: StorageGateway + ?Sized,
{
    let Some(document) = gateway.find_one(T::KIND, filter).await? else {
        return Ok(None);
    };
    Stored::decode(&document)
        .map(Some)
        .map_err(|err| decode_failure::<T>(StorageOperation::FindOne, &err))
}

/// Fetch and decode every matching record.
pub async fn find_records<T, G>(
    gateway: &G,
    filter: &Filter,
    options: &FindOptions,
) -> Result<Vec<Stored<T>>, StorageError>
where
    T: Record,
    G: StorageGateway + ?Sized,
{
    gateway
        .find_many(T::KIND, filter, options)
        .await?
        .iter()
        .map(|document| {
            Stored::decode(document)
                .map_err(|err| decode_failure::<T>(StorageOperation::FindMany, &err))
        })
        .collect()
}

/// Insert a record and pair it with its new identifier.
pub async fn insert_record<T, G>(gateway: &G, record: T) -> Result<Stored<T>, StorageError>
where
    T: Record,
    G: StorageGateway + ?Sized,
{
    let id = gateway.insert_one(T::KIND, record.to_document()).await?;
    Ok(Stored { id, record })
}

/// Replace every field of the first matching record. Returns the matched
/// count.
pub async fn replace_record<T, G>(gateway: &G, filter: &Filter, record: &T) -> Result<u64, StorageError>
where
    T: Record,
    G: StorageGateway + ?Sized,
{
    gateway
        .replace_one(T::KIND, filter, record.to_document())
        .await
}

/// Current instant at the precision both backends store.
pub fn storage_now(now: DateTime<Utc>) -> DateTime<Utc> {
    super::truncate_to_millis(now)
}
