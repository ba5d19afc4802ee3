//! Embedded SQLite implementation of the storage gateway.
//!
//! SQLite calls block, so every operation runs on the blocking thread pool
//! via `tokio::task::spawn_blocking` and takes the single connection through
//! a mutex. The schema is created idempotently each time a file is opened.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{Connection, ErrorCode as SqliteErrorCode, ffi, params_from_iter};
use tracing::{debug, info};

use super::gateway_checks::{check_distinct, check_insert, check_read, check_replace, check_update};
use super::sqlite_codec::{decode_cell, decode_row};
use super::sqlite_query::{self, Statement};
use crate::domain::ports::{BackendKind, StorageGateway};
use crate::domain::storage::{
    Document, EntityKind, FieldValue, Filter, FindOptions, ParseRecordIdError, RecordId,
    StorageError, StorageFailure, StorageOperation,
};

const SCHEMA_SQL: &str = include_str!("sqlite_schema.sql");
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Fallback gateway over a single SQLite connection.
#[derive(Clone)]
pub struct SqliteGateway {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteGateway {
    /// Open (or create) the database file at `path` and ensure the schema.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error when the file cannot be opened or the schema
    /// cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, rusqlite::Error> {
        let path = path.as_ref();
        let connection = Connection::open(path)?;
        let gateway = Self::bootstrap(connection)?;
        info!(path = %path.display(), "fallback database ready");
        Ok(gateway)
    }

    /// Open a private in-memory database with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns the SQLite error when the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(connection: Connection) -> Result<Self, rusqlite::Error> {
        connection.execute_batch("PRAGMA foreign_keys = ON;")?;
        connection.busy_timeout(BUSY_TIMEOUT)?;
        connection.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    async fn run<T, F>(
        &self,
        kind: EntityKind,
        operation: StorageOperation,
        work: F,
    ) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageFailure> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        let outcome = tokio::task::spawn_blocking(move || {
            let guard = connection.lock().unwrap_or_else(PoisonError::into_inner);
            work(&guard)
        })
        .await
        .unwrap_or_else(|error| {
            Err(StorageFailure::connection(format!(
                "blocking storage task failed: {error}"
            )))
        });
        outcome.map_err(|failure| fail(kind, operation, failure))
    }

    async fn query_documents(
        &self,
        kind: EntityKind,
        operation: StorageOperation,
        statement: Statement,
    ) -> Result<Vec<Document>, StorageError> {
        self.run(kind, operation, move |connection| {
            let mut prepared = connection
                .prepare(&statement.sql)
                .map_err(map_sqlite_error)?;
            let mut rows = prepared
                .query(params_from_iter(statement.binds))
                .map_err(map_sqlite_error)?;
            let mut documents = Vec::new();
            while let Some(row) = rows.next().map_err(map_sqlite_error)? {
                documents.push(decode_row(kind, row).map_err(StorageFailure::serialization)?);
            }
            Ok(documents)
        })
        .await
    }

    async fn execute(
        &self,
        kind: EntityKind,
        operation: StorageOperation,
        statement: Statement,
    ) -> Result<u64, StorageError> {
        self.run(kind, operation, move |connection| {
            let changed = connection
                .execute(&statement.sql, params_from_iter(statement.binds))
                .map_err(map_sqlite_error)?;
            Ok(changed as u64)
        })
        .await
    }
}

fn fail(kind: EntityKind, operation: StorageOperation, failure: StorageFailure) -> StorageError {
    debug!(entity = %kind, operation = %operation, error = %failure, "fallback storage call failed");
    StorageError::new(kind, operation, failure)
}

/// Classify a SQLite error by its extended result code.
fn map_sqlite_error(error: rusqlite::Error) -> StorageFailure {
    match &error {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    StorageFailure::conflict(detail)
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                | ffi::SQLITE_CONSTRAINT_NOTNULL
                | ffi::SQLITE_CONSTRAINT_CHECK => StorageFailure::constraint(detail),
                _ => match failure.code {
                    SqliteErrorCode::CannotOpen
                    | SqliteErrorCode::DatabaseBusy
                    | SqliteErrorCode::DatabaseLocked
                    | SqliteErrorCode::SystemIoFailure => StorageFailure::connection(detail),
                    _ => StorageFailure::query(detail),
                },
            }
        }
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..) => {
            StorageFailure::serialization(error.to_string())
        }
        _ => StorageFailure::query(error.to_string()),
    }
}

fn render<T>(
    kind: EntityKind,
    operation: StorageOperation,
    rendered: Result<T, StorageFailure>,
) -> Result<T, StorageError> {
    rendered.map_err(|failure| fail(kind, operation, failure))
}

#[async_trait]
impl StorageGateway for SqliteGateway {
    fn backend(&self) -> BackendKind {
        BackendKind::Fallback
    }

    fn parse_id(&self, raw: &str) -> Result<RecordId, ParseRecordIdError> {
        RecordId::parse_sequence(raw)
    }

    async fn find_one(
        &self,
        kind: EntityKind,
        filter: &Filter,
    ) -> Result<Option<Document>, StorageError> {
        let operation = StorageOperation::FindOne;
        let statement = render(
            kind,
            operation,
            check_read(kind, filter, &FindOptions::new())
                .and_then(|()| sqlite_query::find_one(kind, filter)),
        )?;
        let documents = self.query_documents(kind, operation, statement).await?;
        Ok(documents.into_iter().next())
    }

    async fn find_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StorageError> {
        let operation = StorageOperation::FindMany;
        let statement = render(
            kind,
            operation,
            check_read(kind, filter, options)
                .and_then(|()| sqlite_query::find_many(kind, filter, options)),
        )?;
        self.query_documents(kind, operation, statement).await
    }

    async fn insert_one(
        &self,
        kind: EntityKind,
        document: Document,
    ) -> Result<RecordId, StorageError> {
        let operation = StorageOperation::InsertOne;
        let statement = render(
            kind,
            operation,
            check_insert(kind, &document).and_then(|()| sqlite_query::insert(kind, &document)),
        )?;
        self.run(kind, operation, move |connection| {
            connection
                .execute(&statement.sql, params_from_iter(statement.binds))
                .map_err(map_sqlite_error)?;
            Ok(RecordId::sequence(connection.last_insert_rowid()))
        })
        .await
    }

    async fn update_one(
        &self,
        kind: EntityKind,
        filter: &Filter,
        changes: Document,
    ) -> Result<u64, StorageError> {
        let operation = StorageOperation::UpdateOne;
        let statement = render(
            kind,
            operation,
            check_update(kind, filter, &changes)
                .and_then(|()| sqlite_query::update(kind, filter, &changes, true)),
        )?;
        self.execute(kind, operation, statement).await
    }

    async fn update_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        changes: Document,
    ) -> Result<u64, StorageError> {
        let operation = StorageOperation::UpdateMany;
        let statement = render(
            kind,
            operation,
            check_update(kind, filter, &changes)
                .and_then(|()| sqlite_query::update(kind, filter, &changes, false)),
        )?;
        self.execute(kind, operation, statement).await
    }

    async fn replace_one(
        &self,
        kind: EntityKind,
        filter: &Filter,
        document: Document,
    ) -> Result<u64, StorageError> {
        let operation = StorageOperation::ReplaceOne;
        let statement = render(
            kind,
            operation,
            check_replace(kind, filter, &document)
                .and_then(|()| sqlite_query::replace(kind, filter, &document)),
        )?;
        self.execute(kind, operation, statement).await
    }

    async fn delete_one(&self, kind: EntityKind, filter: &Filter) -> Result<u64, StorageError> {
        let operation = StorageOperation::DeleteOne;
        let statement = render(
            kind,
            operation,
            check_read(kind, filter, &FindOptions::new())
                .and_then(|()| sqlite_query::delete(kind, filter, true)),
        )?;
        self.execute(kind, operation, statement).await
    }

    async fn delete_many(&self, kind: EntityKind, filter: &Filter) -> Result<u64, StorageError> {
        let operation = StorageOperation::DeleteMany;
        let statement = render(
            kind,
            operation,
            check_read(kind, filter, &FindOptions::new())
                .and_then(|()| sqlite_query::delete(kind, filter, false)),
        )?;
        self.execute(kind, operation, statement).await
    }

    async fn count_matching(
        &self,
        kind: EntityKind,
        filter: &Filter,
    ) -> Result<u64, StorageError> {
        let operation = StorageOperation::CountMatching;
        let statement = render(
            kind,
            operation,
            check_read(kind, filter, &FindOptions::new())
                .and_then(|()| sqlite_query::count(kind, filter)),
        )?;
        self.run(kind, operation, move |connection| {
            let count: i64 = connection
                .query_row(&statement.sql, params_from_iter(statement.binds), |row| {
                    row.get(0)
                })
                .map_err(map_sqlite_error)?;
            u64::try_from(count)
                .map_err(|_| StorageFailure::serialization(format!("negative count {count}")))
        })
        .await
    }

    async fn distinct_values(
        &self,
        kind: EntityKind,
        field: &str,
        filter: &Filter,
    ) -> Result<Vec<FieldValue>, StorageError> {
        let operation = StorageOperation::DistinctValues;
        let statement = render(
            kind,
            operation,
            check_distinct(kind, field, filter)
                .and_then(|()| sqlite_query::distinct(kind, field, filter)),
        )?;
        let field = field.to_owned();
        self.run(kind, operation, move |connection| {
            let Some(field_kind) = kind.field_kind(&field) else {
                return Err(StorageFailure::invalid_filter(format!("unknown field '{field}'")));
            };
            let mut prepared = connection
                .prepare(&statement.sql)
                .map_err(map_sqlite_error)?;
            let mut rows = prepared
                .query(params_from_iter(statement.binds))
                .map_err(map_sqlite_error)?;
            let mut values = Vec::new();
            while let Some(row) = rows.next().map_err(map_sqlite_error)? {
                let cell = row.get_ref(0).map_err(map_sqlite_error)?;
                values.push(
                    decode_cell(&field, field_kind, cell).map_err(StorageFailure::serialization)?,
                );
            }
            Ok(values)
        })
        .await
    }
}
