//! MongoDB implementation of the storage gateway.
//!
//! Connecting pings the server within the configured timeouts and ensures a
//! unique index for every catalogued unique key, so duplicate writes are
//! rejected by the server and surface as conflicts.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{Bson, Document as BsonDocument, doc};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{debug, info};

use super::gateway_checks::{check_distinct, check_insert, check_read, check_replace, check_update};
use super::mongo_codec::{
    MONGO_ID_FIELD, decode_document, decode_value, encode_document, encode_filter, encode_sort,
    encode_update, stored_name,
};
use crate::domain::ports::{BackendKind, StorageGateway};
use crate::domain::storage::{
    Document, EntityKind, FieldValue, Filter, FindOptions, ParseRecordIdError, RecordId,
    StorageError, StorageFailure, StorageOperation,
};

const APP_NAME: &str = "aqi-backend";
const DUPLICATE_KEY_CODE: i32 = 11_000;

/// Errors raised while establishing the primary connection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MongoConnectError {
    /// The connection string could not be parsed or resolved.
    #[error("invalid document store options: {message}")]
    Options { message: String },

    /// The server did not answer a ping within the timeouts.
    #[error("document store unreachable: {message}")]
    Unreachable { message: String },

    /// Unique indexes could not be created.
    #[error("failed to ensure document store indexes: {message}")]
    Indexes { message: String },
}

impl MongoConnectError {
    /// Build an [`Self::Options`] error.
    pub fn options(message: impl Into<String>) -> Self {
        Self::Options {
            message: message.into(),
        }
    }

    /// Build an [`Self::Unreachable`] error.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }

    /// Build an [`Self::Indexes`] error.
    pub fn indexes(message: impl Into<String>) -> Self {
        Self::Indexes {
            message: message.into(),
        }
    }
}

/// Connection settings for the primary backend.
///
/// # Example
///
/// ```ignore
/// let config = MongoConfig::new("mongodb://localhost:27017", "air_pollution_tracker")
///     .with_connect_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct MongoConfig {
    url: String,
    database: String,
    connect_timeout: Duration,
    server_selection_timeout: Duration,
}

impl MongoConfig {
    /// Defaults: 15 s connect timeout, 10 s server selection timeout.
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            connect_timeout: Duration::from_secs(15),
            server_selection_timeout: Duration::from_secs(10),
        }
    }

    /// Override how long a single connection attempt may take.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override how long the driver waits for a usable server.
    pub fn with_server_selection_timeout(mut self, timeout: Duration) -> Self {
        self.server_selection_timeout = timeout;
        self
    }

    /// Name of the database the gateway will use.
    pub fn database(&self) -> &str {
        &self.database
    }
}

/// Primary gateway over one MongoDB database.
#[derive(Clone)]
pub struct MongoGateway {
    database: Database,
}

impl MongoGateway {
    /// Connect, ping, and ensure unique indexes.
    ///
    /// # Errors
    ///
    /// Returns [`MongoConnectError`] when any step fails; callers treat this
    /// as a reason to fall back.
    pub async fn connect(config: &MongoConfig) -> Result<Self, MongoConnectError> {
        let mut options = ClientOptions::parse(&config.url)
            .await
            .map_err(|error| MongoConnectError::options(error.to_string()))?;
        options.app_name = Some(APP_NAME.to_owned());
        options.connect_timeout = Some(config.connect_timeout);
        options.server_selection_timeout = Some(config.server_selection_timeout);

        let client = Client::with_options(options)
            .map_err(|error| MongoConnectError::options(error.to_string()))?;
        let database = client.database(&config.database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|error| MongoConnectError::unreachable(error.to_string()))?;
        ensure_indexes(&database)
            .await
            .map_err(|error| MongoConnectError::indexes(error.to_string()))?;

        info!(database = %config.database, "document store ready");
        Ok(Self { database })
    }

    /// Drop the whole database, every collection and index included.
    ///
    /// # Errors
    ///
    /// Returns the driver error when the server rejects the command.
    pub async fn drop_database(&self) -> Result<(), MongoError> {
        self.database.drop().await
    }

    fn collection(&self, kind: EntityKind) -> Collection<BsonDocument> {
        self.database.collection(kind.collection_name())
    }
}

/// Identifier of the lowest-`_id` document matching `filter`.
///
/// Single-row writes go through this so both backends pick the same row
/// when several documents match.
async fn first_match_id(
    collection: &Collection<BsonDocument>,
    filter: BsonDocument,
) -> Result<Option<Bson>, MongoError> {
    let found = collection
        .find_one(filter)
        .sort(doc! { MONGO_ID_FIELD: 1 })
        .projection(doc! { MONGO_ID_FIELD: 1 })
        .await?;
    Ok(found.and_then(|mut stored| stored.remove(MONGO_ID_FIELD)))
}

async fn ensure_indexes(database: &Database) -> Result<(), MongoError> {
    for kind in EntityKind::ALL {
        let collection = database.collection::<BsonDocument>(kind.collection_name());
        for key in kind.unique_keys() {
            let mut keys = BsonDocument::new();
            for field in *key {
                keys.insert(*field, 1);
            }
            let model = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build();
            collection.create_index(model).await?;
        }
    }
    Ok(())
}

fn fail(kind: EntityKind, operation: StorageOperation, failure: StorageFailure) -> StorageError {
    debug!(entity = %kind, operation = %operation, error = %failure, "primary storage call failed");
    StorageError::new(kind, operation, failure)
}

/// Classify a driver error. Duplicate-key write errors become conflicts.
fn map_mongo_error(error: &MongoError) -> StorageFailure {
    match error.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE => {
            StorageFailure::conflict(write.message.clone())
        }
        ErrorKind::Command(command) if command.code == DUPLICATE_KEY_CODE => {
            StorageFailure::conflict(command.message.clone())
        }
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => StorageFailure::connection(error.to_string()),
        ErrorKind::BsonDeserialization(_) | ErrorKind::BsonSerialization(_) => {
            StorageFailure::serialization(error.to_string())
        }
        _ => StorageFailure::query(error.to_string()),
    }
}

#[async_trait]
impl StorageGateway for MongoGateway {
    fn backend(&self) -> BackendKind {
        BackendKind::Primary
    }

    fn parse_id(&self, raw: &str) -> Result<RecordId, ParseRecordIdError> {
        RecordId::parse_object(raw)
    }

    async fn find_one(
        &self,
        kind: EntityKind,
        filter: &Filter,
    ) -> Result<Option<Document>, StorageError> {
        let operation = StorageOperation::FindOne;
        let fail = |failure| fail(kind, operation, failure);
        check_read(kind, filter, &FindOptions::new()).map_err(fail)?;
        let encoded = encode_filter(filter)
            .map_err(StorageFailure::invalid_filter)
            .map_err(fail)?;
        let stored = self
            .collection(kind)
            .find_one(encoded)
            .sort(doc! { MONGO_ID_FIELD: 1 })
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?;
        stored
            .map(|found| decode_document(kind, &found).map_err(StorageFailure::serialization))
            .transpose()
            .map_err(fail)
    }

    async fn find_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StorageError> {
        let operation = StorageOperation::FindMany;
        let fail = |failure| fail(kind, operation, failure);
        check_read(kind, filter, options).map_err(fail)?;
        let encoded = encode_filter(filter)
            .map_err(StorageFailure::invalid_filter)
            .map_err(fail)?;
        // The server reads a zero limit as "no limit".
        if options.limit == Some(0) {
            return Ok(Vec::new());
        }

        let collection = self.collection(kind);
        let mut query = collection.find(encoded).sort(encode_sort(options));
        if options.skip > 0 {
            query = query.skip(options.skip);
        }
        if let Some(limit) = options.limit {
            query = query.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }
        let stored: Vec<BsonDocument> = query
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?
            .try_collect()
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?;
        stored
            .iter()
            .map(|found| decode_document(kind, found).map_err(StorageFailure::serialization))
            .collect::<Result<_, _>>()
            .map_err(fail)
    }

    async fn insert_one(
        &self,
        kind: EntityKind,
        document: Document,
    ) -> Result<RecordId, StorageError> {
        let operation = StorageOperation::InsertOne;
        let fail = |failure| fail(kind, operation, failure);
        check_insert(kind, &document).map_err(fail)?;
        let encoded = encode_document(&document)
            .map_err(StorageFailure::invalid_document)
            .map_err(fail)?;
        let inserted = self
            .collection(kind)
            .insert_one(encoded)
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?;
        match inserted.inserted_id {
            Bson::ObjectId(oid) => Ok(RecordId::object(oid.bytes())),
            other => Err(fail(StorageFailure::serialization(format!(
                "server assigned non-ObjectId identifier {other}"
            )))),
        }
    }

    async fn update_one(
        &self,
        kind: EntityKind,
        filter: &Filter,
        changes: Document,
    ) -> Result<u64, StorageError> {
        let operation = StorageOperation::UpdateOne;
        let fail = |failure| fail(kind, operation, failure);
        check_update(kind, filter, &changes).map_err(fail)?;
        let encoded = encode_filter(filter)
            .map_err(StorageFailure::invalid_filter)
            .map_err(fail)?;
        let update = encode_update(&changes)
            .map_err(StorageFailure::invalid_document)
            .map_err(fail)?;
        let collection = self.collection(kind);
        let Some(id) = first_match_id(&collection, encoded)
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?
        else {
            return Ok(0);
        };
        let result = collection
            .update_one(doc! { MONGO_ID_FIELD: id }, update)
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?;
        Ok(result.matched_count)
    }

    async fn update_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        changes: Document,
    ) -> Result<u64, StorageError> {
        let operation = StorageOperation::UpdateMany;
        let fail = |failure| fail(kind, operation, failure);
        check_update(kind, filter, &changes).map_err(fail)?;
        let encoded = encode_filter(filter)
            .map_err(StorageFailure::invalid_filter)
            .map_err(fail)?;
        let update = encode_update(&changes)
            .map_err(StorageFailure::invalid_document)
            .map_err(fail)?;
        let result = self
            .collection(kind)
            .update_many(encoded, update)
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?;
        Ok(result.matched_count)
    }

    async fn replace_one(
        &self,
        kind: EntityKind,
        filter: &Filter,
        document: Document,
    ) -> Result<u64, StorageError> {
        let operation = StorageOperation::ReplaceOne;
        let fail = |failure| fail(kind, operation, failure);
        check_replace(kind, filter, &document).map_err(fail)?;
        let encoded = encode_filter(filter)
            .map_err(StorageFailure::invalid_filter)
            .map_err(fail)?;
        let replacement = encode_document(&document)
            .map_err(StorageFailure::invalid_document)
            .map_err(fail)?;
        let collection = self.collection(kind);
        let Some(id) = first_match_id(&collection, encoded)
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?
        else {
            return Ok(0);
        };
        let result = collection
            .replace_one(doc! { MONGO_ID_FIELD: id }, replacement)
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?;
        Ok(result.matched_count)
    }

    async fn delete_one(&self, kind: EntityKind, filter: &Filter) -> Result<u64, StorageError> {
        let operation = StorageOperation::DeleteOne;
        let fail = |failure| fail(kind, operation, failure);
        check_read(kind, filter, &FindOptions::new()).map_err(fail)?;
        let encoded = encode_filter(filter)
            .map_err(StorageFailure::invalid_filter)
            .map_err(fail)?;
        let collection = self.collection(kind);
        let Some(id) = first_match_id(&collection, encoded)
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?
        else {
            return Ok(0);
        };
        let result = collection
            .delete_one(doc! { MONGO_ID_FIELD: id })
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?;
        Ok(result.deleted_count)
    }

    async fn delete_many(&self, kind: EntityKind, filter: &Filter) -> Result<u64, StorageError> {
        let operation = StorageOperation::DeleteMany;
        let fail = |failure| fail(kind, operation, failure);
        check_read(kind, filter, &FindOptions::new()).map_err(fail)?;
        let encoded = encode_filter(filter)
            .map_err(StorageFailure::invalid_filter)
            .map_err(fail)?;
        let result = self
            .collection(kind)
            .delete_many(encoded)
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?;
        Ok(result.deleted_count)
    }

    async fn count_matching(
        &self,
        kind: EntityKind,
        filter: &Filter,
    ) -> Result<u64, StorageError> {
        let operation = StorageOperation::CountMatching;
        let fail = |failure| fail(kind, operation, failure);
        check_read(kind, filter, &FindOptions::new()).map_err(fail)?;
        let encoded = encode_filter(filter)
            .map_err(StorageFailure::invalid_filter)
            .map_err(fail)?;
        self.collection(kind)
            .count_documents(encoded)
            .await
            .map_err(|error| fail(map_mongo_error(&error)))
    }

    async fn distinct_values(
        &self,
        kind: EntityKind,
        field: &str,
        filter: &Filter,
    ) -> Result<Vec<FieldValue>, StorageError> {
        let operation = StorageOperation::DistinctValues;
        let fail = |failure| fail(kind, operation, failure);
        check_distinct(kind, field, filter).map_err(fail)?;
        let field_kind = kind.field_kind(field).ok_or_else(|| {
            fail(StorageFailure::invalid_filter(format!(
                "unknown field '{field}'"
            )))
        })?;
        let encoded = encode_filter(filter)
            .map_err(StorageFailure::invalid_filter)
            .map_err(fail)?;
        let values = self
            .collection(kind)
            .distinct(stored_name(field), encoded)
            .await
            .map_err(|error| fail(map_mongo_error(&error)))?;

        let mut decoded = Vec::with_capacity(values.len());
        for value in &values {
            let value = decode_value(field, field_kind, value)
                .map_err(StorageFailure::serialization)
                .map_err(fail)?;
            if !value.is_null() {
                decoded.push(value);
            }
        }
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    //! Configuration checks. Behaviour against a live server is covered by
    //! the contract suite under `tests/` when a test server is configured.

    use super::*;
    use rstest::rstest;

    #[rstest]
    fn config_defaults_and_overrides() {
        let config = MongoConfig::new("mongodb://localhost:27017", "air_pollution_tracker");
        assert_eq!(config.connect_timeout, Duration::from_secs(15));
        assert_eq!(config.server_selection_timeout, Duration::from_secs(10));

        let config = config
            .with_connect_timeout(Duration::from_millis(200))
            .with_server_selection_timeout(Duration::from_millis(300));
        assert_eq!(config.connect_timeout, Duration::from_millis(200));
        assert_eq!(config.server_selection_timeout, Duration::from_millis(300));
        assert_eq!(config.database(), "air_pollution_tracker");
    }

    #[tokio::test]
    async fn malformed_connection_strings_are_rejected_before_dialling() {
        let config = MongoConfig::new("postgres://localhost", "aqi");
        let error = MongoGateway::connect(&config)
            .await
            .err()
            .expect("scheme must be rejected");
        assert!(matches!(error, MongoConnectError::Options { .. }));
    }
}
