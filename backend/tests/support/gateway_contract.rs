//! Behaviour every storage gateway must share.
//!
//! Each check takes a gateway over an empty store and exercises one part of
//! the contract through the public port only, so the SQLite and MongoDB
//! suites run identical assertions. Owner rows are always created first so
//! the embedded store's foreign keys are satisfied.

use aqi_backend::domain::ports::StorageGateway;
use aqi_backend::domain::storage::{
    Document, EntityKind, FieldValue, Filter, FindOptions, ID_FIELD, RecordId, SortDirection,
    StorageError, StorageFailure, StorageOperation,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0)
        .single()
        .expect("valid fixture time")
}

fn at(minutes: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minutes)
}

fn user(tag: &str) -> Document {
    Document::new()
        .with("email", format!("{tag}@example.com"))
        .with("username", tag)
        .with("password_hash", "argon2id$fixture")
        .with("is_active", true)
        .with("created_at", base_time())
}

fn location(user_id: RecordId, name: &str) -> Document {
    Document::new()
        .with("user_id", user_id)
        .with("name", name)
        .with("latitude", 13.0827)
        .with("longitude", 80.2707)
        .with("created_at", base_time())
}

fn notification(user_id: RecordId, index: i64, priority: &str) -> Document {
    Document::new()
        .with("user_id", user_id)
        .with("title", format!("Alert {index}"))
        .with("message", "Air quality changed")
        .with("notification_type", "aqi_alert")
        .with("priority", priority)
        .with("is_read", false)
        .with("created_at", at(index))
}

async fn insert_user(gateway: &dyn StorageGateway, tag: &str) -> RecordId {
    gateway
        .insert_one(EntityKind::Users, user(tag))
        .await
        .expect("user inserts")
}

fn failure_of<T: std::fmt::Debug>(result: Result<T, StorageError>) -> (StorageOperation, StorageFailure) {
    let error = result.expect_err("call should fail");
    (error.operation(), error.failure().clone())
}

fn titles(documents: &[Document]) -> Vec<String> {
    documents
        .iter()
        .map(|document| document.require_text("title").expect("title present"))
        .collect()
}

/// Inserted documents read back with an identifier and without nulls.
pub async fn round_trips_documents(gateway: &dyn StorageGateway) {
    let id = insert_user(gateway, "asha").await;

    let found = gateway
        .find_one(EntityKind::Users, &Filter::by_id(id))
        .await
        .expect("lookup succeeds")
        .expect("user exists");

    let mut expected = user("asha");
    expected.insert(ID_FIELD, id);
    assert_eq!(found, expected);
    assert!(!found.contains("full_name"));

    let owner = id;
    let stored = gateway
        .insert_one(
            EntityKind::SavedLocations,
            location(owner, "Home").with("city", FieldValue::Null),
        )
        .await
        .expect("location inserts");
    let found = gateway
        .find_one(EntityKind::SavedLocations, &Filter::new().eq("user_id", owner))
        .await
        .expect("lookup succeeds")
        .expect("location exists");
    assert_eq!(found.id().expect("id present"), stored);
    assert!(!found.contains("city"));
    assert_eq!(found.require_float("latitude"), Ok(13.0827));
}

/// Unique keys are enforced by the store, including per-owner keys.
pub async fn rejects_duplicate_unique_keys(gateway: &dyn StorageGateway) {
    let asha = insert_user(gateway, "asha").await;
    let ravi = insert_user(gateway, "ravi").await;

    let duplicate_email = user("asha-2").with("email", "asha@example.com");
    let (operation, failure) = failure_of(gateway.insert_one(EntityKind::Users, duplicate_email).await);
    assert_eq!(operation, StorageOperation::InsertOne);
    assert!(matches!(failure, StorageFailure::Conflict { .. }), "{failure:?}");

    gateway
        .insert_one(EntityKind::SavedLocations, location(asha, "Home"))
        .await
        .expect("first home inserts");
    gateway
        .insert_one(EntityKind::SavedLocations, location(ravi, "Home"))
        .await
        .expect("another owner may reuse the name");
    let (_, failure) = failure_of(
        gateway
            .insert_one(EntityKind::SavedLocations, location(asha, "Home"))
            .await,
    );
    assert!(matches!(failure, StorageFailure::Conflict { .. }), "{failure:?}");

    let count = gateway
        .count_matching(EntityKind::SavedLocations, &Filter::new())
        .await
        .expect("count succeeds");
    assert_eq!(count, 2);
}

/// Sort, skip, and limit are applied by the store, with identifier
/// tie-breaks.
pub async fn pages_inside_the_query(gateway: &dyn StorageGateway) {
    let owner = insert_user(gateway, "asha").await;
    for index in 0..10 {
        gateway
            .insert_one(EntityKind::Notifications, notification(owner, index, "low"))
            .await
            .expect("notification inserts");
    }
    let inbox = Filter::new().eq("user_id", owner);

    let page = gateway
        .find_many(
            EntityKind::Notifications,
            &inbox,
            &FindOptions::new()
                .sort_by("created_at", SortDirection::Ascending)
                .skip(2)
                .limit(3),
        )
        .await
        .expect("page loads");
    assert_eq!(titles(&page), ["Alert 2", "Alert 3", "Alert 4"]);

    let newest = gateway
        .find_many(
            EntityKind::Notifications,
            &inbox,
            &FindOptions::new()
                .sort_by("created_at", SortDirection::Descending)
                .limit(2),
        )
        .await
        .expect("page loads");
    assert_eq!(titles(&newest), ["Alert 9", "Alert 8"]);

    let tail = gateway
        .find_many(EntityKind::Notifications, &inbox, &FindOptions::new().skip(8))
        .await
        .expect("tail loads");
    assert_eq!(titles(&tail), ["Alert 8", "Alert 9"]);

    let empty = gateway
        .find_many(EntityKind::Notifications, &inbox, &FindOptions::new().limit(0))
        .await
        .expect("zero limit loads");
    assert!(empty.is_empty());
}

/// Updates and replacements never create rows.
pub async fn writes_without_match_report_zero(gateway: &dyn StorageGateway) {
    let owner = insert_user(gateway, "asha").await;
    let missing = Filter::new().eq("user_id", owner);
    let settings = Document::new()
        .with("user_id", owner)
        .with("aqi_threshold", 100_i64)
        .with("enable_notifications", true)
        .with("notification_frequency", "daily")
        .with("preferred_units", "metric")
        .with("theme", "light")
        .with("language", "en")
        .with("updated_at", base_time());

    let replaced = gateway
        .replace_one(EntityKind::UserSettings, &missing, settings.clone())
        .await
        .expect("replace runs");
    assert_eq!(replaced, 0);
    let updated = gateway
        .update_one(
            EntityKind::UserSettings,
            &missing,
            Document::new().with("theme", "dark"),
        )
        .await
        .expect("update runs");
    assert_eq!(updated, 0);
    assert_eq!(
        gateway
            .count_matching(EntityKind::UserSettings, &Filter::new())
            .await
            .expect("count succeeds"),
        0
    );

    gateway
        .insert_one(EntityKind::UserSettings, settings.clone())
        .await
        .expect("settings insert");
    let replaced = gateway
        .replace_one(
            EntityKind::UserSettings,
            &missing,
            settings.with("theme", "dark"),
        )
        .await
        .expect("replace runs");
    assert_eq!(replaced, 1);
    let stored = gateway
        .find_one(EntityKind::UserSettings, &missing)
        .await
        .expect("lookup succeeds")
        .expect("settings exist");
    assert_eq!(stored.require_text("theme"), Ok("dark".to_owned()));
}

/// Single and bulk updates, counts, distinct values, and deletes.
pub async fn updates_counts_and_deletes(gateway: &dyn StorageGateway) {
    let owner = insert_user(gateway, "asha").await;
    for (index, priority) in ["low", "high", "low", "critical", "high"].into_iter().enumerate() {
        gateway
            .insert_one(
                EntityKind::Notifications,
                notification(owner, i64::try_from(index).expect("small index"), priority),
            )
            .await
            .expect("notification inserts");
    }
    let unread = Filter::new().eq("user_id", owner).eq("is_read", false);
    let mark_read = || Document::new().with("is_read", true);

    let changed = gateway
        .update_one(EntityKind::Notifications, &unread, mark_read())
        .await
        .expect("update runs");
    assert_eq!(changed, 1);
    assert_eq!(
        gateway
            .count_matching(EntityKind::Notifications, &unread)
            .await
            .expect("count succeeds"),
        4
    );

    let mut priorities: Vec<String> = gateway
        .distinct_values(EntityKind::Notifications, "priority", &unread)
        .await
        .expect("distinct runs")
        .into_iter()
        .map(|value| match value {
            FieldValue::Text(text) => text,
            other => panic!("unexpected value {other:?}"),
        })
        .collect();
    priorities.sort();
    assert_eq!(priorities, ["critical", "high", "low"]);

    let changed = gateway
        .update_many(EntityKind::Notifications, &unread, mark_read())
        .await
        .expect("bulk update runs");
    assert_eq!(changed, 4);
    assert_eq!(
        gateway
            .count_matching(EntityKind::Notifications, &unread)
            .await
            .expect("count succeeds"),
        0
    );

    let high = Filter::new().eq("priority", "high");
    assert_eq!(
        gateway
            .delete_one(EntityKind::Notifications, &high)
            .await
            .expect("delete runs"),
        1
    );
    assert_eq!(
        gateway
            .delete_many(EntityKind::Notifications, &Filter::new().eq("user_id", owner))
            .await
            .expect("bulk delete runs"),
        4
    );
    assert_eq!(
        gateway
            .delete_one(EntityKind::Notifications, &high)
            .await
            .expect("delete runs"),
        0
    );
}

/// Single-row writes touch the lowest-identifier match, whatever the
/// other fields say.
pub async fn single_row_writes_target_lowest_identifier(gateway: &dyn StorageGateway) {
    let owner = insert_user(gateway, "asha").await;
    // Insertion order deliberately disagrees with `created_at` order.
    let mut ids = Vec::new();
    for index in [2, 0, 1] {
        let id = gateway
            .insert_one(EntityKind::Notifications, notification(owner, index, "low"))
            .await
            .expect("notification inserts");
        ids.push(id);
    }
    let (first, second, third) = (ids[0], ids[1], ids[2]);
    let low = Filter::new().eq("priority", "low");
    let read_flag = |id: RecordId| async move {
        gateway
            .find_one(EntityKind::Notifications, &Filter::by_id(id))
            .await
            .expect("lookup succeeds")
            .expect("notification exists")
            .require_bool("is_read")
            .expect("flag present")
    };

    let changed = gateway
        .update_one(
            EntityKind::Notifications,
            &low,
            Document::new().with("is_read", true),
        )
        .await
        .expect("update runs");
    assert_eq!(changed, 1);
    assert!(read_flag(first).await);
    assert!(!read_flag(second).await);
    assert!(!read_flag(third).await);

    let deleted = gateway
        .delete_one(EntityKind::Notifications, &low)
        .await
        .expect("delete runs");
    assert_eq!(deleted, 1);
    let remaining = gateway
        .find_many(
            EntityKind::Notifications,
            &low,
            &FindOptions::new().sort_by(ID_FIELD, SortDirection::Ascending),
        )
        .await
        .expect("query runs");
    let remaining: Vec<RecordId> = remaining
        .iter()
        .map(|document| document.id().expect("id present"))
        .collect();
    assert_eq!(remaining, [second, third]);

    let replaced = gateway
        .replace_one(
            EntityKind::Notifications,
            &low,
            notification(owner, 9, "low").with("title", "Replaced"),
        )
        .await
        .expect("replace runs");
    assert_eq!(replaced, 1);
    let stored = gateway
        .find_one(EntityKind::Notifications, &Filter::by_id(second))
        .await
        .expect("lookup succeeds")
        .expect("replacement keeps the identifier");
    assert_eq!(stored.require_text("title"), Ok("Replaced".to_owned()));
    let untouched = gateway
        .find_one(EntityKind::Notifications, &Filter::by_id(third))
        .await
        .expect("lookup succeeds")
        .expect("notification exists");
    assert_eq!(untouched.require_text("title"), Ok("Alert 1".to_owned()));
}

/// Setting a field to null clears it.
pub async fn clears_fields_set_to_null(gateway: &dyn StorageGateway) {
    let owner = insert_user(gateway, "asha").await;
    let id = gateway
        .insert_one(
            EntityKind::SavedLocations,
            location(owner, "Office").with("city", "Chennai"),
        )
        .await
        .expect("location inserts");

    let changed = gateway
        .update_one(
            EntityKind::SavedLocations,
            &Filter::by_id(id),
            Document::new().with("city", FieldValue::Null),
        )
        .await
        .expect("update runs");
    assert_eq!(changed, 1);

    let found = gateway
        .find_one(EntityKind::SavedLocations, &Filter::by_id(id))
        .await
        .expect("lookup succeeds")
        .expect("location exists");
    assert!(!found.contains("city"));
    let unset = gateway
        .count_matching(
            EntityKind::SavedLocations,
            &Filter::new().eq("city", FieldValue::Null),
        )
        .await
        .expect("count succeeds");
    assert_eq!(unset, 1);
}

/// Catalogue violations fail the same way on every backend.
pub async fn rejects_unknown_and_mistyped_fields(gateway: &dyn StorageGateway) {
    let owner = insert_user(gateway, "asha").await;

    let (operation, failure) = failure_of(
        gateway
            .find_many(
                EntityKind::Users,
                &Filter::new().eq("nickname", "ash"),
                &FindOptions::new(),
            )
            .await,
    );
    assert_eq!(operation, StorageOperation::FindMany);
    assert!(matches!(failure, StorageFailure::InvalidFilter { .. }), "{failure:?}");

    let (_, failure) = failure_of(
        gateway
            .find_many(
                EntityKind::Users,
                &Filter::new(),
                &FindOptions::new().sort_by("karma", SortDirection::Ascending),
            )
            .await,
    );
    assert!(matches!(failure, StorageFailure::InvalidFilter { .. }), "{failure:?}");

    let (_, failure) = failure_of(
        gateway
            .insert_one(
                EntityKind::SavedLocations,
                location(owner, "Home").with("latitude", "north"),
            )
            .await,
    );
    assert!(matches!(failure, StorageFailure::InvalidDocument { .. }), "{failure:?}");

    let (_, failure) = failure_of(
        gateway
            .update_one(EntityKind::Users, &Filter::by_id(owner), Document::new())
            .await,
    );
    assert!(matches!(failure, StorageFailure::InvalidDocument { .. }), "{failure:?}");

    let (operation, failure) = failure_of(
        gateway
            .distinct_values(EntityKind::Users, "karma", &Filter::new())
            .await,
    );
    assert_eq!(operation, StorageOperation::DistinctValues);
    assert!(matches!(failure, StorageFailure::InvalidFilter { .. }), "{failure:?}");
}

/// Identifiers issued by the gateway survive a text round trip.
pub async fn parses_identifiers_it_issued(gateway: &dyn StorageGateway) {
    let id = insert_user(gateway, "asha").await;

    let parsed = gateway.parse_id(&id.to_string()).expect("own identifier parses");
    assert_eq!(parsed, id);
    assert!(gateway.parse_id("not-an-id").is_err());

    let found = gateway
        .find_one(EntityKind::Users, &Filter::by_id(parsed))
        .await
        .expect("lookup succeeds");
    assert!(found.is_some());
}
