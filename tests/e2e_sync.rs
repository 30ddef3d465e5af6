//! End-to-end: Garmin mock -> SyncEngine -> ServerClient -> mock /health-data.

mod helpers;

use chrono::{DateTime, FixedOffset};
use healthsync::pipeline::RetryConfig;
use healthsync::source::{GarminConfig, GarminSource};
use healthsync::{
    run_background_tick, BackgroundFetchResult, MemoryPreferences, MetricCatalog, MetricKind,
    ServerClient, SyncCadence, SyncDuration, SyncEngine, SyncFailure, SyncPreferences, SyncState,
};
use helpers::{can_bind_loopback, free_port, spawn_mock_server, wait_for_health, GarminFixture};
use serde_json::json;
use std::time::Duration;

const API_KEY: &str = "test-api-key";

fn now() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2024-06-02T20:00:00+02:00").unwrap()
}

fn fixture() -> GarminFixture {
    GarminFixture::default()
        .with_metric(
            "steps",
            vec![
                json!({"date": "2024-05-20", "value": 999}),
                json!({"date": "2024-06-01", "value": 8342}),
                json!({"date": "2024-06-02", "value": 1200}),
            ],
        )
        .with_metric(
            "heart_rates",
            vec![json!({"date": "2024-06-01", "resting_heart_rate": 52})],
        )
        .with_metric(
            "blood_pressure",
            vec![json!({"date": "2024-06-01", "value": "121/79, 64 bpm"})],
        )
}

fn engine(base_url: &str, tokens: &str) -> SyncEngine<GarminSource, ServerClient> {
    let source = GarminSource::new(GarminConfig {
        base_url: base_url.to_string(),
        user_id: "user-1".to_string(),
        tokens: tokens.to_string(),
    })
    .unwrap();
    let client = ServerClient::new(base_url, API_KEY)
        .unwrap()
        .with_retry_config(RetryConfig::fixed(3, Duration::from_millis(10)));
    SyncEngine::new(source, client)
}

#[tokio::test]
async fn foreground_sync_posts_canonical_batch() {
    if !can_bind_loopback().await {
        eprintln!("skipping: loopback bind not permitted");
        return;
    }
    let port = free_port().await;
    let (server, base_url) = spawn_mock_server(port, fixture()).await;
    wait_for_health(&base_url).await;

    let engine = engine(&base_url, "{\"oauth\":\"t\"}");
    let result = engine
        .sync(
            &[MetricKind::Steps, MetricKind::RestingHeartRate, MetricKind::BloodPressure],
            SyncDuration::Days3,
            now(),
        )
        .await;

    assert_eq!(result.state, SyncState::Completed);
    assert!(result.success);
    assert_eq!(result.submitted_count, 5);
    assert_eq!(result.per_type_counts.get("step"), Some(&2));
    assert_eq!(result.per_type_counts.get("blood_pressure_systolic"), Some(&1));

    let batches = server.batches().await;
    assert_eq!(batches.len(), 1);
    let records = batches[0].as_array().unwrap();
    assert_eq!(
        records[0],
        json!({"type": "step", "date": "2024-06-01", "value": 8342.0, "unit": "count"})
    );
    assert_eq!(records[1]["date"], "2024-06-02");
    assert_eq!(records[2]["type"], "resting_heart_rate");
    assert_eq!(records[2]["unit"], "bpm");
    assert_eq!(records[3]["type"], "blood_pressure_systolic");
    assert_eq!(records[3]["value"], 121.0);
    assert_eq!(records[4]["type"], "blood_pressure_diastolic");

    assert_eq!(
        server.auth_headers().await,
        vec![Some(format!("Bearer {}", API_KEY))]
    );

    let garmin = server.garmin_requests().await;
    assert_eq!(garmin[0]["user_id"], "user-1");
    assert_eq!(garmin[0]["start_date"], "2024-05-31");
    assert_eq!(garmin[0]["end_date"], "2024-06-02");

    server.stop().await;
}

#[tokio::test]
async fn transient_server_error_is_retried() {
    if !can_bind_loopback().await {
        eprintln!("skipping: loopback bind not permitted");
        return;
    }
    let port = free_port().await;
    let (server, base_url) = spawn_mock_server(port, fixture()).await;
    wait_for_health(&base_url).await;
    server.fail_next(&[503]).await;

    let result = engine(&base_url, "tokens")
        .sync(&[MetricKind::Steps], SyncDuration::Today, now())
        .await;

    assert!(result.success);
    assert_eq!(result.submitted_count, 1);
    assert_eq!(server.auth_headers().await.len(), 2);
    assert_eq!(server.batches().await.len(), 1);

    server.stop().await;
}

#[tokio::test]
async fn rejected_batch_fails_but_keeps_per_type_results() {
    if !can_bind_loopback().await {
        eprintln!("skipping: loopback bind not permitted");
        return;
    }
    let port = free_port().await;
    let (server, base_url) = spawn_mock_server(port, fixture()).await;
    wait_for_health(&base_url).await;
    server.fail_next(&[400]).await;

    let result = engine(&base_url, "tokens")
        .sync(&[MetricKind::Steps, MetricKind::Hydration], SyncDuration::Days3, now())
        .await;

    assert_eq!(result.state, SyncState::Failed);
    assert!(matches!(result.failure, Some(SyncFailure::Transport(_))));
    assert_eq!(result.transformed_count, 2);
    assert_eq!(result.submitted_count, 0);
    assert_eq!(result.batch.len(), 2);
    // Hydration has no Garmin counterpart.
    assert_eq!(result.per_type_errors.len(), 1);
    assert_eq!(result.per_type_errors[0].metric, MetricKind::Hydration);
    assert_eq!(server.auth_headers().await.len(), 1);
    assert!(server.batches().await.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn missing_garmin_tokens_fail_before_any_read() {
    if !can_bind_loopback().await {
        eprintln!("skipping: loopback bind not permitted");
        return;
    }
    let port = free_port().await;
    let (server, base_url) = spawn_mock_server(port, fixture()).await;
    wait_for_health(&base_url).await;

    let result = engine(&base_url, "")
        .sync(&[MetricKind::Steps], SyncDuration::Days7, now())
        .await;

    assert_eq!(
        result.failure,
        Some(SyncFailure::Unavailable { platform: "garmin" })
    );
    assert!(server.garmin_requests().await.is_empty());
    assert!(server.auth_headers().await.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn background_tick_syncs_enabled_metrics() {
    if !can_bind_loopback().await {
        eprintln!("skipping: loopback bind not permitted");
        return;
    }
    let port = free_port().await;
    let (server, base_url) = spawn_mock_server(port, fixture()).await;
    wait_for_health(&base_url).await;

    let engine = engine(&base_url, "tokens");
    let prefs = MemoryPreferences::new();
    let catalog = MetricCatalog::builtin();
    prefs.set_metric_enabled(catalog.get(MetricKind::Steps).unwrap(), true);
    prefs.save_sync_cadence(SyncCadence::Hourly);

    let completed = std::sync::Mutex::new(Vec::new());
    let completion = |r: BackgroundFetchResult| completed.lock().unwrap().push(r);
    let outcome = run_background_tick(&engine, &prefs, now(), &completion).await;

    assert_eq!(outcome, BackgroundFetchResult::NewData);
    assert_eq!(*completed.lock().unwrap(), vec![BackgroundFetchResult::NewData]);
    assert_eq!(prefs.load_last_synced(), Some(now()));

    // The hourly window only touches 2024-06-02.
    let batches = server.batches().await;
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0],
        json!([{"type": "step", "date": "2024-06-02", "value": 1200.0, "unit": "count"}])
    );

    server.stop().await;
}
