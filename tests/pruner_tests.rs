//! Integration tests for the background pruner.

#![cfg(feature = "async")]

use access_shield::{
    AccessShield, ConfigError, Identity, PruneScheduler, QuotaConfig, StaticQuotaSource,
    Thresholds,
};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn shield() -> AccessShield {
    AccessShield::builder()
        .with_quota_source(Arc::new(StaticQuotaSource::new(QuotaConfig::per_identity(
            Thresholds::new(10, 100, 1_000),
            Thresholds::new(100, 1_000, 10_000),
        ))))
        .build()
        .unwrap()
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[tokio::test]
async fn test_pruner_releases_idle_buckets() {
    let shield = shield();

    // Two days ago by the system clock
    let stale = epoch_millis() - 2 * 86_400_000;
    for i in 0..10 {
        shield
            .check_and_record(Some(&Identity::new(format!("idle-{}", i))), stale)
            .unwrap();
    }
    assert_eq!(shield.bucket_count(), 11);

    let handle = PruneScheduler::new(shield.clone(), Duration::from_millis(10))
        .unwrap()
        .start();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(shield.bucket_count(), 0);
    assert_eq!(shield.metrics().buckets_released(), 11);

    handle.shutdown().await.expect("shutdown failed");
}

#[tokio::test]
async fn test_pruner_keeps_recent_traffic() {
    let shield = shield();
    let a = Identity::new("A");
    shield.check(Some(&a)).unwrap();

    let handle = PruneScheduler::new(shield.clone(), Duration::from_millis(10))
        .unwrap()
        .start();
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.shutdown().await.expect("shutdown failed");

    assert_eq!(shield.ledger().snapshot(Some(&a), 0), 1);
    assert_eq!(shield.telemetry_now().aggregate.minute, 1);
}

#[tokio::test]
async fn test_shutdown_stops_task() {
    let handle = PruneScheduler::new(shield(), Duration::from_secs(3600))
        .unwrap()
        .start();
    assert!(!handle.is_finished());

    tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
        .await
        .expect("shutdown timed out")
        .expect("shutdown failed");
}

#[test]
fn test_zero_interval_rejected() {
    let result = PruneScheduler::new(shield(), Duration::ZERO);
    assert!(matches!(result, Err(ConfigError::ZeroPruneInterval)));
}
