//! Tests for current reports, provenance, and history capture.

use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rstest::rstest;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{DisabledPollutantFeed, MockPollutantFeed, MockStorageGateway};
use crate::domain::service_fixtures::{fixture_clock, fixture_timestamp, gateway, id, stored_document};
use crate::domain::storage::{EntityKind, FieldValue};

fn make_service(mock: MockStorageGateway, feed: Arc<dyn PollutantFeed>) -> AirQualityService {
    AirQualityService::with_rng(gateway(mock), feed, fixture_clock(), SmallRng::seed_from_u64(7))
}

fn feed_returning(
    result: Result<Option<FeedObservation>, PollutantFeedError>,
) -> Arc<dyn PollutantFeed> {
    let mut feed = MockPollutantFeed::new();
    feed.expect_latest().times(1).return_once(move |_, _| result);
    Arc::new(feed)
}

fn observation(values: &[(Pollutant, f64)]) -> FeedObservation {
    FeedObservation {
        concentrations: values.iter().copied().collect::<BTreeMap<_, _>>(),
        station: Some("Alandur Bus Depot".to_owned()),
        observed_at: Some(fixture_timestamp()),
    }
}

#[rstest]
fn synthetic_readings_stay_within_documented_ranges() {
    let mut rng = SmallRng::seed_from_u64(11);
    for _ in 0..200 {
        let reading = synthesize_reading(&mut rng, fixture_timestamp());
        assert!((10.0..=50.0).contains(&reading.pm25));
        assert!((15.0..=80.0).contains(&reading.pm10));
        assert!((20.0..=60.0).contains(&reading.o3));
        assert!((10.0..=40.0).contains(&reading.no2));
        assert!((0.5..=2.5).contains(&reading.co));
        assert!((5.0..=20.0).contains(&reading.so2));
    }
}

#[tokio::test]
async fn full_feed_observation_is_enriched_without_substitution() {
    let feed = feed_returning(Ok(Some(observation(&[
        (Pollutant::Pm25, 30.0),
        (Pollutant::Pm10, 431.0),
        (Pollutant::O3, 12.0),
        (Pollutant::No2, 8.0),
        (Pollutant::Co, 0.4),
        (Pollutant::So2, 3.0),
    ]))));

    let report = make_service(MockStorageGateway::new(), feed)
        .current_report(13.0, 80.2)
        .await
        .expect("report");

    assert_eq!(report.aqi, 401);
    assert_eq!(report.category, AqiCategory::Hazardous);
    assert_eq!(
        report.provenance,
        ReadingProvenance::Enriched {
            station: Some("Alandur Bus Depot".to_owned()),
            substituted: Vec::new(),
        }
    );
    assert_eq!(report.reading.timestamp, fixture_timestamp());
}

#[tokio::test]
async fn missing_and_negative_feed_values_are_substituted() {
    let feed = feed_returning(Ok(Some(observation(&[
        (Pollutant::Pm25, 42.0),
        (Pollutant::Pm10, -999.0),
    ]))));

    let report = make_service(MockStorageGateway::new(), feed)
        .current_report(13.0, 80.2)
        .await
        .expect("report");

    assert_eq!(report.reading.pm25, 42.0);
    assert!((15.0..=80.0).contains(&report.reading.pm10));
    let ReadingProvenance::Enriched { substituted, .. } = report.provenance else {
        panic!("expected enriched provenance");
    };
    assert_eq!(
        substituted,
        vec![
            Pollutant::Pm10,
            Pollutant::O3,
            Pollutant::No2,
            Pollutant::Co,
            Pollutant::So2
        ]
    );
}

#[rstest]
#[case(Ok(None), SyntheticReason::NoStation)]
#[case(
    Err(PollutantFeedError::timeout("5s elapsed")),
    SyntheticReason::FeedUnavailable("pollutant feed timeout: 5s elapsed".to_owned())
)]
#[tokio::test]
async fn feed_gaps_yield_synthetic_reports(
    #[case] result: Result<Option<FeedObservation>, PollutantFeedError>,
    #[case] reason: SyntheticReason,
) {
    let report = make_service(MockStorageGateway::new(), feed_returning(result))
        .current_report(13.0, 80.2)
        .await
        .expect("feed failures never fail the report");

    assert_eq!(report.provenance, ReadingProvenance::Synthetic { reason });
    assert_eq!(report.reading.timestamp, fixture_timestamp());
    assert_eq!(report.category, AqiCategory::from_index(report.aqi));
}

#[tokio::test]
async fn disabled_feed_is_reported_as_such() {
    let report = make_service(MockStorageGateway::new(), Arc::new(DisabledPollutantFeed))
        .current_report(0.0, 0.0)
        .await
        .expect("report");
    assert_eq!(
        report.provenance,
        ReadingProvenance::Synthetic {
            reason: SyntheticReason::FeedDisabled
        }
    );
}

#[tokio::test]
async fn invalid_coordinates_are_rejected_before_feed_lookup() {
    let mut feed = MockPollutantFeed::new();
    feed.expect_latest().times(0);

    let error = make_service(MockStorageGateway::new(), Arc::new(feed))
        .current_report(120.0, 0.0)
        .await
        .expect_err("latitude out of range");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn record_history_stores_report_for_owned_location() {
    let location = SavedLocation {
        user_id: id(1),
        name: "Marina".to_owned(),
        latitude: 13.05,
        longitude: 80.28,
        city: Some("Chennai".to_owned()),
        state: None,
        country: None,
        created_at: fixture_timestamp(),
    };
    let mut mock = MockStorageGateway::new();
    mock.expect_find_one()
        .withf(|kind, _| *kind == EntityKind::SavedLocations)
        .times(1)
        .return_once(move |_, _| Ok(Some(stored_document(id(44), &location))));
    mock.expect_insert_one()
        .withf(|kind, doc| {
            *kind == EntityKind::AirQualityHistory
                && doc.get("location_id") == Some(&FieldValue::Id(id(44)))
                && doc.get("location_name") == Some(&FieldValue::from("Marina"))
                && doc.get("aqi") == Some(&FieldValue::Integer(50))
        })
        .times(1)
        .return_once(|_, _| Ok(id(900)));
    let feed = feed_returning(Ok(Some(observation(&[
        (Pollutant::Pm25, 30.0),
        (Pollutant::Pm10, 20.0),
    ]))));

    let (stored, report) = make_service(mock, feed)
        .record_history(id(1), id(44))
        .await
        .expect("history recorded");

    assert_eq!(stored.id, id(900));
    assert_eq!(stored.record.aqi, report.aqi);
    assert_eq!(stored.record.latitude, 13.05);
}

#[tokio::test]
async fn record_history_rejects_foreign_location() {
    let mut mock = MockStorageGateway::new();
    mock.expect_find_one().times(1).return_once(|_, _| Ok(None));
    let mut feed = MockPollutantFeed::new();
    feed.expect_latest().times(0);

    let error = make_service(mock, Arc::new(feed))
        .record_history(id(2), id(44))
        .await
        .expect_err("not the owner");
    assert_eq!(error.code(), ErrorCode::NotFound);
}
