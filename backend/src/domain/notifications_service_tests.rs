//! Tests for the notifications service.

use rstest::rstest;

use super::*;
use crate::domain::{DEFAULT_AQI_THRESHOLD, ErrorCode};
use crate::domain::ports::MockStorageGateway;
use crate::domain::service_fixtures::{fixture_clock, fixture_timestamp, gateway, id, stored_document};
use crate::domain::storage::{EntityKind, FieldValue};

fn make_service(mock: MockStorageGateway) -> NotificationsService {
    NotificationsService::new(gateway(mock), fixture_clock())
}

fn notification(owner: i64, is_read: bool) -> Notification {
    Notification {
        user_id: id(owner),
        title: "Forecast".to_owned(),
        message: "Haze expected tomorrow".to_owned(),
        notification_type: NotificationType::ForecastAlert,
        priority: NotificationPriority::Medium,
        location_name: None,
        aqi_value: None,
        is_read,
        created_at: fixture_timestamp(),
    }
}

fn has_clause(filter: &Filter, field: &str, expected: &FieldValue) -> bool {
    filter
        .clauses()
        .any(|(name, value)| name == field && value == expected)
}

#[tokio::test]
async fn list_applies_filters_newest_first_with_default_limit() {
    let mut mock = MockStorageGateway::new();
    mock.expect_find_many()
        .withf(|kind, filter, options| {
            *kind == EntityKind::Notifications
                && has_clause(filter, "is_read", &FieldValue::Bool(false))
                && has_clause(filter, "priority", &FieldValue::from("high"))
                && options.limit == Some(DEFAULT_NOTIFICATION_LIMIT)
                && options.skip == 10
                && options.sort.as_ref().is_some_and(|sort| {
                    sort.field == "created_at" && sort.direction == SortDirection::Descending
                })
        })
        .times(1)
        .return_once(|_, _, _| Ok(vec![stored_document(id(60), &notification(1, false))]));

    let query = NotificationQuery {
        is_read: Some(false),
        priority: Some(NotificationPriority::High),
        skip: 10,
        ..NotificationQuery::default()
    };
    let rows = make_service(mock)
        .list(id(1), &query)
        .await
        .expect("listed");
    assert_eq!(rows.len(), 1);
}

#[rstest]
#[case(0)]
#[case(101)]
#[tokio::test]
async fn list_rejects_out_of_range_limits(#[case] limit: u64) {
    let mut mock = MockStorageGateway::new();
    mock.expect_find_many().times(0);

    let query = NotificationQuery {
        limit: Some(limit),
        ..NotificationQuery::default()
    };
    let error = make_service(mock)
        .list(id(1), &query)
        .await
        .expect_err("bad limit");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn mark_read_only_targets_unread_rows() {
    let mut mock = MockStorageGateway::new();
    mock.expect_update_one()
        .withf(|_, filter, changes| {
            has_clause(filter, "is_read", &FieldValue::Bool(false))
                && changes.get("is_read") == Some(&FieldValue::Bool(true))
        })
        .times(1)
        .return_once(|_, _, _| Ok(0));
    mock.expect_find_one()
        .times(1)
        .return_once(|_, _| Ok(Some(stored_document(id(60), &notification(1, true)))));

    let stored = make_service(mock)
        .mark_read(id(1), id(60))
        .await
        .expect("already read is fine");
    assert!(stored.record.is_read);
}

#[tokio::test]
async fn mark_read_reports_missing_notification() {
    let mut mock = MockStorageGateway::new();
    mock.expect_update_one()
        .times(1)
        .return_once(|_, _, _| Ok(0));
    mock.expect_find_one().times(1).return_once(|_, _| Ok(None));

    let error = make_service(mock)
        .mark_read(id(1), id(61))
        .await
        .expect_err("absent");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn mark_all_read_uses_update_many() {
    let mut mock = MockStorageGateway::new();
    mock.expect_update_many()
        .withf(|kind, filter, _| {
            *kind == EntityKind::Notifications
                && has_clause(filter, "user_id", &FieldValue::Id(id(1)))
                && has_clause(filter, "is_read", &FieldValue::Bool(false))
        })
        .times(1)
        .return_once(|_, _, _| Ok(4));

    let changed = make_service(mock)
        .mark_all_read(id(1))
        .await
        .expect("marked");
    assert_eq!(changed, 4);
}

#[rstest]
#[case(None, 1)]
#[case(Some(true), 2)]
#[tokio::test]
async fn delete_all_optionally_filters_by_read_flag(
    #[case] is_read: Option<bool>,
    #[case] expected_clauses: usize,
) {
    let mut mock = MockStorageGateway::new();
    mock.expect_delete_many()
        .withf(move |_, filter| filter.clauses().count() == expected_clauses)
        .times(1)
        .return_once(|_, _| Ok(3));

    let deleted = make_service(mock)
        .delete_all(id(1), is_read)
        .await
        .expect("deleted");
    assert_eq!(deleted, 3);
}

#[tokio::test]
async fn create_rejects_blank_title() {
    let mut mock = MockStorageGateway::new();
    mock.expect_insert_one().times(0);

    let request = NewNotification {
        title: "  ".to_owned(),
        message: "body".to_owned(),
        notification_type: NotificationType::System,
        priority: NotificationPriority::default(),
        location_name: None,
        aqi_value: None,
    };
    let error = make_service(mock)
        .create(id(1), request)
        .await
        .expect_err("blank title");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn alert_is_skipped_at_or_below_threshold() {
    let mut mock = MockStorageGateway::new();
    mock.expect_find_one().times(1).return_once(|_, _| Ok(None));
    mock.expect_insert_one().times(0);

    let raised = make_service(mock)
        .raise_aqi_alert(id(1), "Chennai", DEFAULT_AQI_THRESHOLD)
        .await
        .expect("evaluated");
    assert!(raised.is_none());
}

#[tokio::test]
async fn alert_is_skipped_when_notifications_disabled() {
    let settings = UserSettings {
        enable_notifications: false,
        ..UserSettings::defaults_for(id(1), fixture_timestamp())
    };
    let mut mock = MockStorageGateway::new();
    mock.expect_find_one()
        .times(1)
        .return_once(move |_, _| Ok(Some(stored_document(id(20), &settings))));
    mock.expect_insert_one().times(0);

    let raised = make_service(mock)
        .raise_aqi_alert(id(1), "Chennai", 400)
        .await
        .expect("evaluated");
    assert!(raised.is_none());
}

#[rstest]
#[case(180, "high")]
#[case(320, "critical")]
#[tokio::test]
async fn alert_priority_follows_category(#[case] index: u16, #[case] priority: &'static str) {
    let mut mock = MockStorageGateway::new();
    mock.expect_find_one().times(1).return_once(|_, _| Ok(None));
    mock.expect_insert_one()
        .withf(move |kind, doc| {
            *kind == EntityKind::Notifications
                && doc.get("priority") == Some(&FieldValue::from(priority))
                && doc.get("notification_type") == Some(&FieldValue::from("aqi_alert"))
                && doc.get("aqi_value") == Some(&FieldValue::Integer(i64::from(index)))
        })
        .times(1)
        .return_once(|_, _| Ok(id(70)));

    let raised = make_service(mock)
        .raise_aqi_alert(id(1), "Chennai", index)
        .await
        .expect("evaluated")
        .expect("alert raised");
    assert_eq!(raised.record.location_name.as_deref(), Some("Chennai"));
    assert!(!raised.record.is_read);
}
