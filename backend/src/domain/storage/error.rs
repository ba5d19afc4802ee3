//! Storage failures shared by every backend.

use std::fmt;

use crate::domain::ports::define_port_error;

use super::EntityKind;

define_port_error! {
    /// Backend-neutral classification of a failed storage call.
    pub enum StorageFailure {
        /// A unique key was already taken.
        Conflict { message: String } => "unique constraint violated: {message}",
        /// The operation required a match and found none.
        NotFound => "no matching record",
        /// The filter or sort named an unknown field or a mistyped value.
        InvalidFilter { message: String } => "invalid filter: {message}",
        /// The document carried an unknown, mistyped, or missing field.
        InvalidDocument { message: String } => "invalid document: {message}",
        /// A referential or check constraint rejected the write.
        Constraint { message: String } => "constraint violated: {message}",
        /// Stored data could not be converted to or from the value model.
        Serialization { message: String } => "serialization failed: {message}",
        /// The backend could not be reached.
        Connection { message: String } => "storage connection failed: {message}",
        /// The backend rejected or failed the query.
        Query { message: String } => "storage query failed: {message}",
    }
}

/// Gateway call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOperation {
    /// Lowest-identifier match, if any.
    FindOne,
    /// Filtered, sorted page of matches.
    FindMany,
    /// Insert of a complete document.
    InsertOne,
    /// Partial update of the first match.
    UpdateOne,
    /// Partial update of every match.
    UpdateMany,
    /// Whole-document replacement of the first match.
    ReplaceOne,
    /// Removal of the first match.
    DeleteOne,
    /// Removal of every match.
    DeleteMany,
    /// Count of matches.
    CountMatching,
    /// Distinct non-null values of one field.
    DistinctValues,
}

impl StorageOperation {
    /// Stable snake_case name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FindOne => "find_one",
            Self::FindMany => "find_many",
            Self::InsertOne => "insert_one",
            Self::UpdateOne => "update_one",
            Self::UpdateMany => "update_many",
            Self::ReplaceOne => "replace_one",
            Self::DeleteOne => "delete_one",
            Self::DeleteMany => "delete_many",
            Self::CountMatching => "count_matching",
            Self::DistinctValues => "distinct_values",
        }
    }
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single gateway call, tagged with where it happened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation} on {entity} failed: {failure}")]
pub struct StorageError {
    entity: EntityKind,
    operation: StorageOperation,
    #[source]
    failure: StorageFailure,
}

impl StorageError {
    /// Tag `failure` with the call that produced it.
    pub fn new(entity: EntityKind, operation: StorageOperation, failure: StorageFailure) -> Self {
        Self {
            entity,
            operation,
            failure,
        }
    }

    /// Collection the call targeted.
    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    /// Gateway operation that failed.
    pub fn operation(&self) -> StorageOperation {
        self.operation
    }

    /// Underlying cause.
    pub fn failure(&self) -> &StorageFailure {
        &self.failure
    }

    /// Whether a unique key collision caused the failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self.failure, StorageFailure::Conflict { .. })
    }
}
