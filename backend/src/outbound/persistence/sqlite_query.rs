//! SQL rendering for gateway operations.
//!
//! Column names come from the field catalogue and are validated before
//! rendering; values are always bound positionally.

use rusqlite::types::Value;

use super::sqlite_codec::{encode_value, quote_identifier, select_columns};
use crate::domain::storage::{
    Document, EntityKind, FieldValue, Filter, FindOptions, ID_FIELD, SortDirection, StorageFailure,
};

/// Rendered SQL with its positional binds.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Statement {
    pub(super) sql: String,
    pub(super) binds: Vec<Value>,
}

fn table(kind: EntityKind) -> String {
    quote_identifier(kind.collection_name())
}

fn direction_keyword(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    }
}

/// ` WHERE a = ? AND b IS NULL`, or an empty string for an empty filter.
fn where_clause(filter: &Filter, binds: &mut Vec<Value>) -> Result<String, StorageFailure> {
    let mut predicates = Vec::new();
    for (field, value) in filter.clauses() {
        let column = quote_identifier(field);
        if value.is_null() {
            predicates.push(format!("{column} IS NULL"));
        } else {
            predicates.push(format!("{column} = ?"));
            binds.push(encode_value(value).map_err(StorageFailure::invalid_filter)?);
        }
    }
    if predicates.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", predicates.join(" AND ")))
    }
}

/// ` WHERE id = (first matching id)`, used by the single-row writes.
fn first_match_clause(
    kind: EntityKind,
    filter: &Filter,
    binds: &mut Vec<Value>,
) -> Result<String, StorageFailure> {
    let id = quote_identifier(ID_FIELD);
    let inner = where_clause(filter, binds)?;
    Ok(format!(
        " WHERE {id} = (SELECT {id} FROM {table}{inner} ORDER BY {id} LIMIT 1)",
        table = table(kind)
    ))
}

fn set_clause(changes: &Document, binds: &mut Vec<Value>) -> Result<String, StorageFailure> {
    let mut assignments = Vec::with_capacity(changes.len());
    for (field, value) in changes.iter() {
        assignments.push(format!("{} = ?", quote_identifier(field)));
        binds.push(encode_value(value).map_err(StorageFailure::invalid_document)?);
    }
    Ok(assignments.join(", "))
}

pub(super) fn find_one(kind: EntityKind, filter: &Filter) -> Result<Statement, StorageFailure> {
    find_many(kind, filter, &FindOptions::new().limit(1))
}

pub(super) fn find_many(
    kind: EntityKind,
    filter: &Filter,
    options: &FindOptions,
) -> Result<Statement, StorageFailure> {
    let mut binds = Vec::new();
    let mut sql = format!(
        "SELECT {} FROM {}{}",
        select_columns(kind),
        table(kind),
        where_clause(filter, &mut binds)?
    );

    let id = quote_identifier(ID_FIELD);
    match &options.sort {
        Some(sort) if sort.field == ID_FIELD => {
            sql.push_str(&format!(" ORDER BY {id} {}", direction_keyword(sort.direction)));
        }
        Some(sort) => {
            let direction = direction_keyword(sort.direction);
            sql.push_str(&format!(
                " ORDER BY {} {direction}, {id} {direction}",
                quote_identifier(&sort.field)
            ));
        }
        None => sql.push_str(&format!(" ORDER BY {id} ASC")),
    }

    let skip = to_sql_integer(options.skip)?;
    match options.limit {
        Some(limit) => {
            sql.push_str(" LIMIT ?");
            binds.push(Value::Integer(to_sql_integer(limit)?));
            if skip > 0 {
                sql.push_str(" OFFSET ?");
                binds.push(Value::Integer(skip));
            }
        }
        None if skip > 0 => {
            sql.push_str(" LIMIT -1 OFFSET ?");
            binds.push(Value::Integer(skip));
        }
        None => {}
    }

    Ok(Statement { sql, binds })
}

pub(super) fn insert(kind: EntityKind, document: &Document) -> Result<Statement, StorageFailure> {
    let mut columns = Vec::with_capacity(document.len());
    let mut binds = Vec::with_capacity(document.len());
    for (field, value) in document.iter().filter(|(_, value)| !value.is_null()) {
        columns.push(quote_identifier(field));
        binds.push(encode_value(value).map_err(StorageFailure::invalid_document)?);
    }
    let sql = if columns.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", table(kind))
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table(kind),
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        )
    };
    Ok(Statement { sql, binds })
}

pub(super) fn update(
    kind: EntityKind,
    filter: &Filter,
    changes: &Document,
    first_only: bool,
) -> Result<Statement, StorageFailure> {
    let mut binds = Vec::new();
    let assignments = set_clause(changes, &mut binds)?;
    let predicate = if first_only {
        first_match_clause(kind, filter, &mut binds)?
    } else {
        where_clause(filter, &mut binds)?
    };
    Ok(Statement {
        sql: format!("UPDATE {} SET {assignments}{predicate}", table(kind)),
        binds,
    })
}

/// Overwrite every catalogued column of the first match; fields absent from
/// `document` become `NULL`.
pub(super) fn replace(
    kind: EntityKind,
    filter: &Filter,
    document: &Document,
) -> Result<Statement, StorageFailure> {
    let full: Document = kind
        .fields()
        .iter()
        .map(|spec| {
            let value = document.get(spec.name).cloned().unwrap_or(FieldValue::Null);
            (spec.name.to_owned(), value)
        })
        .collect();
    update(kind, filter, &full, true)
}

pub(super) fn delete(
    kind: EntityKind,
    filter: &Filter,
    first_only: bool,
) -> Result<Statement, StorageFailure> {
    let mut binds = Vec::new();
    let predicate = if first_only {
        first_match_clause(kind, filter, &mut binds)?
    } else {
        where_clause(filter, &mut binds)?
    };
    Ok(Statement {
        sql: format!("DELETE FROM {}{predicate}", table(kind)),
        binds,
    })
}

pub(super) fn count(kind: EntityKind, filter: &Filter) -> Result<Statement, StorageFailure> {
    let mut binds = Vec::new();
    let predicate = where_clause(filter, &mut binds)?;
    Ok(Statement {
        sql: format!("SELECT COUNT(*) FROM {}{predicate}", table(kind)),
        binds,
    })
}

pub(super) fn distinct(
    kind: EntityKind,
    field: &str,
    filter: &Filter,
) -> Result<Statement, StorageFailure> {
    let mut binds = Vec::new();
    let column = quote_identifier(field);
    let predicate = where_clause(filter, &mut binds)?;
    let null_guard = if predicate.is_empty() {
        format!(" WHERE {column} IS NOT NULL")
    } else {
        format!("{predicate} AND {column} IS NOT NULL")
    };
    Ok(Statement {
        sql: format!(
            "SELECT DISTINCT {column} FROM {}{null_guard} ORDER BY {column}",
            table(kind)
        ),
        binds,
    })
}

fn to_sql_integer(value: u64) -> Result<i64, StorageFailure> {
    i64::try_from(value)
        .map_err(|_| StorageFailure::invalid_filter(format!("paging value {value} is too large")))
}
