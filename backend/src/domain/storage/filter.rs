//! Equality filters and listing options.

use super::{FieldValue, ID_FIELD, RecordId};

/// Conjunction of field equality clauses.
///
/// An empty filter matches every record. Setting the same field twice keeps
/// the last value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    clauses: Vec<(String, FieldValue)>,
}

impl Filter {
    /// Filter matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter matching a single identifier.
    pub fn by_id(id: RecordId) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    /// Require `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.clauses.iter_mut().find(|(name, _)| *name == field) {
            Some(existing) => existing.1 = value,
            None => self.clauses.push((field, value)),
        }
        self
    }

    /// Clauses in insertion order.
    pub fn clauses(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.clauses
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    /// Whether the filter has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// Single-field ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Field to order by.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

/// Sorting and pagination for [`crate::domain::ports::StorageGateway::find_many`].
///
/// Records with equal sort keys are ordered by identifier in the same
/// direction, so pages are stable across calls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FindOptions {
    /// Optional ordering.
    pub sort: Option<Sort>,
    /// Records to skip.
    pub skip: u64,
    /// Maximum records to return.
    pub limit: Option<u64>,
}

impl FindOptions {
    /// Unsorted, unbounded listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Order by `field`.
    pub fn sort_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(Sort {
            field: field.into(),
            direction,
        });
        self
    }

    /// Skip the first `skip` matches.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    /// Return at most `limit` matches.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
