//! Catalogue checks run by both gateways before touching their backend, and
//! decoding rules they share.

use crate::domain::storage::catalogue::{validate_document, validate_filter, validate_options};
use crate::domain::storage::{Completeness, Document, EntityKind, Filter, FindOptions, StorageFailure};

pub(super) fn check_read(
    kind: EntityKind,
    filter: &Filter,
    options: &FindOptions,
) -> Result<(), StorageFailure> {
    validate_filter(kind, filter)?;
    validate_options(kind, options)
}

pub(super) fn check_insert(kind: EntityKind, document: &Document) -> Result<(), StorageFailure> {
    validate_document(kind, document, Completeness::Full)
}

pub(super) fn check_update(
    kind: EntityKind,
    filter: &Filter,
    changes: &Document,
) -> Result<(), StorageFailure> {
    validate_filter(kind, filter)?;
    if changes.is_empty() {
        return Err(StorageFailure::invalid_document(
            "update must change at least one field",
        ));
    }
    validate_document(kind, changes, Completeness::Partial)
}

pub(super) fn check_replace(
    kind: EntityKind,
    filter: &Filter,
    document: &Document,
) -> Result<(), StorageFailure> {
    validate_filter(kind, filter)?;
    validate_document(kind, document, Completeness::Full)
}

pub(super) fn check_distinct(
    kind: EntityKind,
    field: &str,
    filter: &Filter,
) -> Result<(), StorageFailure> {
    if kind.field_kind(field).is_none() {
        return Err(StorageFailure::invalid_filter(format!(
            "unknown field '{field}'"
        )));
    }
    validate_filter(kind, filter)
}

/// Largest integer magnitude a float holds exactly (2^53).
const EXACT_FLOAT_LIMIT: i64 = 1 << 53;

/// Read an integer stored in a float field, refusing values the float would
/// round.
pub(super) fn integral_float(field: &str, number: i64) -> Result<f64, String> {
    if !(-EXACT_FLOAT_LIMIT..=EXACT_FLOAT_LIMIT).contains(&number) {
        return Err(format!(
            "field '{field}' holds integer {number}, too large for an exact float"
        ));
    }
    #[expect(
        clippy::cast_precision_loss,
        reason = "magnitude is checked against 2^53 above"
    )]
    let exact = number as f64;
    Ok(exact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero(0, 0.0)]
    #[case::reading(42, 42.0)]
    #[case::negative(-7, -7.0)]
    #[case::upper_bound(1 << 53, 9_007_199_254_740_992.0)]
    fn integral_floats_within_range_are_exact(#[case] number: i64, #[case] expected: f64) {
        assert_eq!(integral_float("pm25", number), Ok(expected));
    }

    #[rstest]
    #[case::above((1 << 53) + 1)]
    #[case::below(-(1 << 53) - 1)]
    #[case::max(i64::MAX)]
    fn integral_floats_that_would_round_are_rejected(#[case] number: i64) {
        let error = integral_float("pm25", number).expect_err("value would round");
        assert!(error.contains("pm25"));
    }
}
