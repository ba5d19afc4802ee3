//! Startup backend selection and services running over the fallback.

use std::sync::Arc;

use aqi_backend::domain::ports::BackendKind;
use aqi_backend::domain::{
    AccountsService, ErrorCode, NewAccount, NewLocation, LocationsService, NotificationQuery,
    NotificationsService, SettingsService,
};
use aqi_backend::outbound::persistence::select_backend;
use aqi_backend::settings::StorageSettings;
use mockable::DefaultClock;

fn unreachable_primary(path: std::path::PathBuf) -> StorageSettings {
    StorageSettings {
        mongodb_url: Some("mongodb://127.0.0.1:1/?directConnection=true".to_owned()),
        database_name: Some("aqi_selection".to_owned()),
        use_local_db: false,
        sqlite_path: Some(path),
        connect_timeout_ms: Some(200),
        server_selection_timeout_ms: Some(300),
    }
}

#[tokio::test]
async fn unreachable_primary_falls_back_with_reason() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = unreachable_primary(dir.path().join("aqi.db"));

    let selection = select_backend(&settings).await.expect("fallback opens");

    assert_eq!(selection.backend(), BackendKind::Fallback);
    let reason = selection.fallback_reason().expect("reason recorded");
    assert!(reason.contains("unreachable"), "unexpected reason: {reason}");
    assert!(dir.path().join("aqi.db").exists());
}

#[tokio::test]
async fn fallback_failure_is_fatal_even_after_primary_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = unreachable_primary(dir.path().join("missing").join("aqi.db"));

    let error = select_backend(&settings).await.expect_err("nothing can open");
    assert!(error.to_string().contains("failed to open fallback database"));
}

#[tokio::test]
async fn services_share_one_fallback_gateway() {
    let dir = tempfile::tempdir().expect("temp dir");
    let selection = select_backend(&StorageSettings::local(dir.path().join("aqi.db")))
        .await
        .expect("fallback opens");
    let gateway = selection.gateway();
    let clock = Arc::new(DefaultClock);

    let accounts = AccountsService::new(Arc::clone(&gateway), clock.clone());
    let settings = SettingsService::new(Arc::clone(&gateway), clock.clone());
    let locations = LocationsService::new(Arc::clone(&gateway), clock.clone());
    let notifications = NotificationsService::new(Arc::clone(&gateway), clock);

    let account = accounts
        .register(NewAccount {
            email: "Asha@Example.com".to_owned(),
            username: "asha".to_owned(),
            full_name: Some("Asha Iyer".to_owned()),
            password_hash: "argon2id$fixture".to_owned(),
        })
        .await
        .expect("registration succeeds");
    assert_eq!(account.record.email, "asha@example.com");

    let duplicate = accounts
        .register(NewAccount {
            email: "asha@example.com".to_owned(),
            username: "asha-2".to_owned(),
            full_name: None,
            password_hash: "argon2id$fixture".to_owned(),
        })
        .await
        .expect_err("email already taken");
    assert_eq!(duplicate.code(), ErrorCode::Conflict);

    let stored_settings = settings
        .find(account.id)
        .await
        .expect("lookup succeeds")
        .expect("defaults stored at registration");
    assert_eq!(stored_settings.aqi_threshold, 100);

    let home = locations
        .create(
            account.id,
            NewLocation {
                name: "Home".to_owned(),
                latitude: 13.0827,
                longitude: 80.2707,
                city: Some("Chennai".to_owned()),
                state: None,
                country: Some("India".to_owned()),
            },
        )
        .await
        .expect("location created");
    assert_eq!(
        locations.list(account.id).await.expect("list succeeds"),
        vec![home]
    );

    let alert = notifications
        .raise_aqi_alert(account.id, "Home", 180)
        .await
        .expect("alert check succeeds");
    assert!(alert.is_some());
    assert_eq!(notifications.unread_count(account.id).await, Ok(1));
    assert_eq!(notifications.mark_all_read(account.id).await, Ok(1));
    let read = notifications
        .list(
            account.id,
            &NotificationQuery {
                is_read: Some(true),
                ..NotificationQuery::default()
            },
        )
        .await
        .expect("list succeeds");
    assert_eq!(read.len(), 1);
}
