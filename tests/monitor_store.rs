use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::FixedOffset;
use solar_thermal_controller::{
    controller::{AlertEvaluator, ThermalController, ThermalMonitor, ThresholdTable},
    domain::{
        Alert, AlertCategory, AlertRecord, DeviceId, DeviceType, EnvironmentSample, ReadingRecord, SampleMetadata,
        Severity, ThermalReading,
    },
    repo::{MemoryStore, RetryPolicy, RetryingStore, StoreError, StoreResult, TimeSeriesStore},
    simulation::{PhysicalModel, SyntheticWeather, SyntheticWeatherConfig},
};
use tokio_util::sync::CancellationToken;

/// Fails the first `failures` reading appends with a transient error
struct FlakyStore {
    inner: MemoryStore,
    failures: AtomicU32,
}

impl FlakyStore {
    fn new(failures: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(failures),
        }
    }

    fn trip(&self) -> StoreResult<()> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TimeSeriesStore for FlakyStore {
    async fn append_reading(&self, reading: &ThermalReading, metadata: &SampleMetadata) -> StoreResult<ReadingRecord> {
        self.trip()?;
        self.inner.append_reading(reading, metadata).await
    }

    async fn append_alerts(&self, device_id: &DeviceId, alerts: &[Alert]) -> StoreResult<Vec<AlertRecord>> {
        self.inner.append_alerts(device_id, alerts).await
    }

    async fn latest_reading(&self, device_id: &DeviceId) -> StoreResult<Option<ReadingRecord>> {
        self.inner.latest_reading(device_id).await
    }

    async fn unresolved_alerts(&self, device_id: &DeviceId) -> StoreResult<Vec<AlertRecord>> {
        self.inner.unresolved_alerts(device_id).await
    }
}

/// Commits alerts one row at a time and drops the connection before the second row, once
struct PartialCommitStore {
    inner: MemoryStore,
    dropped: AtomicU32,
}

#[async_trait]
impl TimeSeriesStore for PartialCommitStore {
    async fn append_reading(&self, reading: &ThermalReading, metadata: &SampleMetadata) -> StoreResult<ReadingRecord> {
        self.inner.append_reading(reading, metadata).await
    }

    async fn append_alerts(&self, device_id: &DeviceId, alerts: &[Alert]) -> StoreResult<Vec<AlertRecord>> {
        let mut records = Vec::new();
        for alert in alerts {
            let second_row = self.inner.alert_count() == 1;
            if second_row && self.dropped.compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst).is_ok() {
                return Err(StoreError::Unavailable("connection reset".into()));
            }
            records.extend(self.inner.append_alerts(device_id, std::slice::from_ref(alert)).await?);
        }
        Ok(records)
    }

    async fn latest_reading(&self, device_id: &DeviceId) -> StoreResult<Option<ReadingRecord>> {
        self.inner.latest_reading(device_id).await
    }

    async fn unresolved_alerts(&self, device_id: &DeviceId) -> StoreResult<Vec<AlertRecord>> {
        self.inner.unresolved_alerts(device_id).await
    }
}

fn controller(store: Arc<dyn TimeSeriesStore>) -> Arc<ThermalController> {
    Arc::new(ThermalController::new(
        PhysicalModel::default(),
        AlertEvaluator::new(ThresholdTable::reference()),
        store,
    ))
}

fn quick_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff_ms: 1,
    }
}

fn hot_sample() -> EnvironmentSample {
    EnvironmentSample::new(50.0, 1200.0, 95.0, 0.0, 13.0)
}

#[tokio::test]
async fn retry_absorbs_transient_failures() {
    let flaky = Arc::new(FlakyStore::new(2));
    let store = Arc::new(RetryingStore::new(flaky.clone(), quick_retry(3)));
    let meta = SampleMetadata::panel("PANEL_R");

    let obs = controller(store).observe(&hot_sample(), &meta).await;

    assert!(obs.persisted);
    assert!(obs.persist_error.is_none());
    assert_eq!(flaky.inner.reading_count(), 1);
    assert_eq!(flaky.inner.alert_count(), obs.alerts.len());
}

#[tokio::test]
async fn retried_alert_batch_is_not_duplicated() {
    let partial = Arc::new(PartialCommitStore {
        inner: MemoryStore::new(),
        dropped: AtomicU32::new(0),
    });
    let store = RetryingStore::new(partial.clone(), quick_retry(3));
    let device = DeviceId::new("P1");
    let alerts = vec![
        Alert::new(DeviceType::Panel, AlertCategory::Temperature, Severity::Critical, 90.0, 85.0, "panel".into()),
        Alert::new(DeviceType::Inverter, AlertCategory::Temperature, Severity::Critical, 80.0, 70.0, "inverter".into()),
    ];

    let records = store.append_alerts(&device, &alerts).await.unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(partial.dropped.load(Ordering::SeqCst), 1);
    let stored = partial.inner.unresolved_alerts(&device).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].alert.message, "panel");
    assert_eq!(stored[1].alert.message, "inverter");
}

#[tokio::test]
async fn exhausted_retries_keep_the_reading() {
    let flaky = Arc::new(FlakyStore::new(10));
    let store = Arc::new(RetryingStore::new(flaky.clone(), quick_retry(2)));
    let meta = SampleMetadata::panel("PANEL_R");

    let obs = controller(store).observe(&hot_sample(), &meta).await;

    assert!(!obs.persisted);
    assert!(obs.persist_error.is_some());
    assert!(obs.reading_id.is_none());
    assert!(!obs.alerts.is_empty());
    assert!(obs.reading.panel_temp_c > 65.0);
    assert_eq!(flaky.inner.reading_count(), 0);
    // two attempts consumed
    assert_eq!(flaky.failures.load(Ordering::SeqCst), 8);
}

#[tokio::test(start_paused = true)]
async fn monitor_counts_failed_ticks() {
    let flaky = Arc::new(FlakyStore::new(1));
    let weather = SyntheticWeather::new(SyntheticWeatherConfig {
        random_seed: Some(7),
        ..Default::default()
    });
    let offset = FixedOffset::east_opt(330 * 60).unwrap();
    let mut monitor = ThermalMonitor::new(controller(flaky.clone()), weather, SampleMetadata::panel("PANEL_M"), offset)
        .with_max_ticks(Some(4));

    let summary = monitor.run(Duration::from_secs(30), CancellationToken::new()).await;

    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.persistence_failures, 1);
    assert_eq!(flaky.inner.reading_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn monitor_stops_on_cancel() {
    let store = Arc::new(MemoryStore::new());
    let weather = SyntheticWeather::new(SyntheticWeatherConfig {
        random_seed: Some(7),
        ..Default::default()
    });
    let offset = FixedOffset::east_opt(0).unwrap();
    let mut monitor = ThermalMonitor::new(controller(store.clone()), weather, SampleMetadata::panel("PANEL_M"), offset);

    let stop = CancellationToken::new();
    let handle = tokio::spawn({
        let stop = stop.clone();
        async move { monitor.run(Duration::from_secs(60), stop).await }
    });

    tokio::time::sleep(Duration::from_secs(150)).await;
    stop.cancel();
    let summary = handle.await.unwrap();

    // ticks at t = 0, 60, 120
    assert_eq!(summary.ticks, 3);
    assert_eq!(store.reading_count(), 3);
}
