//! Shared fixtures for domain service unit tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use super::ports::{MockStorageGateway, StorageGateway};
use super::storage::{Document, ID_FIELD, Record, RecordId};

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

pub(crate) fn gateway(mock: MockStorageGateway) -> Arc<dyn StorageGateway> {
    Arc::new(mock)
}

pub(crate) fn id(value: i64) -> RecordId {
    RecordId::sequence(value)
}

/// Document as a backend would return it for `record` stored under `id`.
pub(crate) fn stored_document<T: Record>(id: RecordId, record: &T) -> Document {
    record.to_document().with(ID_FIELD, id).without_nulls()
}
