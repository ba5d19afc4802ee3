//! Port for backend-neutral document storage.
//!
//! [`StorageGateway`] is the single persistence contract used by every domain
//! service. One implementation is chosen at startup (see
//! [`crate::outbound::persistence::select_backend`]) and injected as
//! `Arc<dyn StorageGateway>`; services never learn which backend they hold.

use std::fmt;

use async_trait::async_trait;

use crate::domain::storage::{
    Document, EntityKind, FieldValue, Filter, FindOptions, ParseRecordIdError, RecordId,
    StorageError,
};

/// Which backend won startup selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Remote document store.
    Primary,
    /// Embedded relational store.
    Fallback,
}

impl BackendKind {
    /// Lowercase name used in logs and the storage report.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform CRUD contract over the active backend.
///
/// Filters are conjunctions of exact-match clauses. Sorting, skip, and limit
/// are applied by the backend query itself. Documents returned by reads carry
/// the record identifier under [`crate::domain::storage::ID_FIELD`] and omit
/// null fields.
///
/// No operation upserts: `update_*` and `replace_one` with a filter matching
/// nothing report `0` and leave storage untouched. No operation retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Backend serving this gateway.
    fn backend(&self) -> BackendKind;

    /// Parse identifier text received from outside the process.
    fn parse_id(&self, raw: &str) -> Result<RecordId, ParseRecordIdError>;

    /// First record matching `filter`, if any.
    async fn find_one(
        &self,
        kind: EntityKind,
        filter: &Filter,
    ) -> Result<Option<Document>, StorageError>;

    /// Records matching `filter`, sorted and paged by `options`.
    async fn find_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Document>, StorageError>;

    /// Insert a complete document and return its new identifier.
    async fn insert_one(
        &self,
        kind: EntityKind,
        document: Document,
    ) -> Result<RecordId, StorageError>;

    /// Set `changes` on the first matching record. Returns the matched count
    /// (0 or 1).
    async fn update_one(
        &self,
        kind: EntityKind,
        filter: &Filter,
        changes: Document,
    ) -> Result<u64, StorageError>;

    /// Set `changes` on every matching record. Returns the matched count.
    async fn update_many(
        &self,
        kind: EntityKind,
        filter: &Filter,
        changes: Document,
    ) -> Result<u64, StorageError>;

    /// Replace every field of the first matching record, keeping its
    /// identifier. Returns the matched count (0 or 1).
    async fn replace_one(
        &self,
        kind: EntityKind,
        filter: &Filter,
        document: Document,
    ) -> Result<u64, StorageError>;

    /// Delete the first matching record. Returns the deleted count (0 or 1).
    async fn delete_one(&self, kind: EntityKind, filter: &Filter) -> Result<u64, StorageError>;

    /// Delete every matching record. Returns the deleted count.
    async fn delete_many(&self, kind: EntityKind, filter: &Filter) -> Result<u64, StorageError>;

    /// Number of matching records.
    async fn count_matching(&self, kind: EntityKind, filter: &Filter)
    -> Result<u64, StorageError>;

    /// Distinct non-null values of `field` across matching records.
    async fn distinct_values(
        &self,
        kind: EntityKind,
        field: &str,
        filter: &Filter,
    ) -> Result<Vec<FieldValue>, StorageError>;
}
