//! Backend-neutral storage value model.
//!
//! Services talk to storage in terms of [`Document`]s keyed by
//! [`EntityKind`]; the [`Record`] trait layers typed entities on top. Both
//! backends share the [`catalogue`] so they accept the same shapes.

pub mod catalogue;
mod document;
mod error;
mod filter;
mod record;
mod record_id;

pub use catalogue::{Completeness, EntityKind, FieldKind, FieldSpec};
pub use document::{Document, DocumentError, FieldValue, ID_FIELD, truncate_to_millis};
pub use error::{StorageError, StorageFailure, StorageOperation};
pub use filter::{Filter, FindOptions, Sort, SortDirection};
pub use record::{Record, Stored, find_record, find_records, insert_record, replace_record, storage_now};
pub use record_id::{ParseRecordIdError, RecordId};
