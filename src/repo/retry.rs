//! Bounded retry around any store engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use validator::Validate;

use super::{StoreResult, TimeSeriesStore};
use crate::domain::{Alert, AlertRecord, DeviceId, ReadingRecord, SampleMetadata, ThermalReading};

/// Linear backoff: attempt `n` waits `n × backoff_ms` before the next try
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RetryPolicy {
    #[validate(range(min = 1, max = 20))]
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_ms: 100,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
        }
    }
}

/// Retries transient failures of the wrapped store; permanent errors return immediately
pub struct RetryingStore<S> {
    inner: Arc<S>,
    policy: RetryPolicy,
}

impl<S: TimeSeriesStore> RetryingStore<S> {
    pub fn new(inner: Arc<S>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn retry_operation<F, Fut, T>(&self, op: &'static str, operation: F) -> StoreResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(op, attempt, "Store operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(op, attempt, max_attempts, error = %e, "Store operation failed, retrying");
                    tokio::time::sleep(Duration::from_millis(self.policy.backoff_ms * u64::from(attempt))).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        warn!(op, max_attempts, error = %e, "Store operation failed, giving up");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[async_trait]
impl<S: TimeSeriesStore> TimeSeriesStore for RetryingStore<S> {
    async fn append_reading(
        &self,
        reading: &ThermalReading,
        metadata: &SampleMetadata,
    ) -> StoreResult<ReadingRecord> {
        self.retry_operation("append_reading", || self.inner.append_reading(reading, metadata))
            .await
    }

    /// Retried one alert at a time so a replay never repeats an already committed record
    async fn append_alerts(&self, device_id: &DeviceId, alerts: &[Alert]) -> StoreResult<Vec<AlertRecord>> {
        let mut records = Vec::with_capacity(alerts.len());
        for alert in alerts {
            let single = std::slice::from_ref(alert);
            let written = self
                .retry_operation("append_alerts", || self.inner.append_alerts(device_id, single))
                .await?;
            records.extend(written);
        }
        Ok(records)
    }

    async fn latest_reading(&self, device_id: &DeviceId) -> StoreResult<Option<ReadingRecord>> {
        self.retry_operation("latest_reading", || self.inner.latest_reading(device_id))
            .await
    }

    async fn unresolved_alerts(&self, device_id: &DeviceId) -> StoreResult<Vec<AlertRecord>> {
        self.retry_operation("unresolved_alerts", || self.inner.unresolved_alerts(device_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AlertCategory, DeviceType, EnvironmentSample, Severity};
    use crate::repo::{MockTimeSeriesStore, StoreError};
    use crate::simulation::PhysicalModel;
    use chrono::Utc;
    use mockall::Sequence;

    fn record(reading: &ThermalReading, metadata: &SampleMetadata) -> ReadingRecord {
        ReadingRecord {
            id: 1,
            recorded_at: Utc::now(),
            metadata: metadata.clone(),
            reading: reading.clone(),
        }
    }

    fn alert_records(device_id: &DeviceId, alerts: &[Alert], id: i64) -> Vec<AlertRecord> {
        alerts
            .iter()
            .map(|alert| AlertRecord {
                id,
                raised_at: Utc::now(),
                device_id: device_id.clone(),
                alert: alert.clone(),
            })
            .collect()
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff_ms: 1,
        }
    }

    fn reading() -> ThermalReading {
        PhysicalModel::default().evaluate(&EnvironmentSample::new(30.0, 700.0, 50.0, 2.0, 11.0))
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let mut mock = MockTimeSeriesStore::new();
        let mut seq = Sequence::new();
        mock.expect_append_reading()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(StoreError::Unavailable("connection reset".into())));
        mock.expect_append_reading()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|r, m| Ok(record(r, m)));

        let store = RetryingStore::new(Arc::new(mock), fast_policy(3));
        let result = store.append_reading(&reading(), &SampleMetadata::panel("P1")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let mut mock = MockTimeSeriesStore::new();
        mock.expect_append_reading()
            .times(3)
            .returning(|_, _| Err(StoreError::Unavailable("down".into())));

        let store = RetryingStore::new(Arc::new(mock), fast_policy(3));
        let result = store.append_reading(&reading(), &SampleMetadata::panel("P1")).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_alerts_are_retried_individually() {
        let alerts = vec![
            Alert::new(DeviceType::Panel, AlertCategory::Temperature, Severity::Critical, 90.0, 85.0, "hot".into()),
            Alert::new(DeviceType::Inverter, AlertCategory::Temperature, Severity::Critical, 80.0, 70.0, "hot".into()),
        ];
        let mut mock = MockTimeSeriesStore::new();
        let mut seq = Sequence::new();
        mock.expect_append_alerts()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, a| a.len() == 1 && a[0].device_type == DeviceType::Panel)
            .returning(|d, a| Ok(alert_records(d, a, 1)));
        mock.expect_append_alerts()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, a| a.len() == 1 && a[0].device_type == DeviceType::Inverter)
            .returning(|_, _| Err(StoreError::Unavailable("connection reset".into())));
        mock.expect_append_alerts()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|_, a| a.len() == 1 && a[0].device_type == DeviceType::Inverter)
            .returning(|d, a| Ok(alert_records(d, a, 2)));

        let store = RetryingStore::new(Arc::new(mock), fast_policy(3));
        let records = store.append_alerts(&"P1".into(), &alerts).await.unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let mut mock = MockTimeSeriesStore::new();
        mock.expect_unresolved_alerts()
            .times(1)
            .returning(|_| Err(StoreError::Corrupt("bad severity".into())));

        let store = RetryingStore::new(Arc::new(mock), fast_policy(5));
        let result = store.unresolved_alerts(&"P1".into()).await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }
}
