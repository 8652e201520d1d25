//! In-process store engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{AlertResolution, StoreError, StoreResult, TimeSeriesStore};
use crate::domain::{Alert, AlertRecord, DeviceId, ReadingRecord, SampleMetadata, ThermalReading};

#[derive(Default)]
struct Tables {
    readings: Vec<ReadingRecord>,
    alerts: Vec<AlertRecord>,
    next_reading_id: i64,
    next_alert_id: i64,
}

/// Append-only tables behind a single lock; ids start at 1
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading_count(&self) -> usize {
        self.tables.read().readings.len()
    }

    pub fn alert_count(&self) -> usize {
        self.tables.read().alerts.len()
    }
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn append_reading(
        &self,
        reading: &ThermalReading,
        metadata: &SampleMetadata,
    ) -> StoreResult<ReadingRecord> {
        let mut tables = self.tables.write();
        tables.next_reading_id += 1;
        let record = ReadingRecord {
            id: tables.next_reading_id,
            recorded_at: Utc::now(),
            metadata: metadata.clone(),
            reading: reading.clone(),
        };
        tables.readings.push(record.clone());
        Ok(record)
    }

    async fn append_alerts(&self, device_id: &DeviceId, alerts: &[Alert]) -> StoreResult<Vec<AlertRecord>> {
        let mut tables = self.tables.write();
        let raised_at = Utc::now();
        let mut records = Vec::with_capacity(alerts.len());
        for alert in alerts {
            tables.next_alert_id += 1;
            let record = AlertRecord {
                id: tables.next_alert_id,
                raised_at,
                device_id: device_id.clone(),
                alert: alert.clone(),
            };
            tables.alerts.push(record.clone());
            records.push(record);
        }
        Ok(records)
    }

    async fn latest_reading(&self, device_id: &DeviceId) -> StoreResult<Option<ReadingRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .readings
            .iter()
            .rev()
            .find(|r| &r.metadata.device_id == device_id)
            .cloned())
    }

    async fn unresolved_alerts(&self, device_id: &DeviceId) -> StoreResult<Vec<AlertRecord>> {
        let tables = self.tables.read();
        Ok(tables
            .alerts
            .iter()
            .filter(|a| &a.device_id == device_id && !a.alert.resolved)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AlertResolution for MemoryStore {
    async fn resolve_alert(&self, alert_id: i64, at: DateTime<Utc>) -> StoreResult<AlertRecord> {
        let mut tables = self.tables.write();
        let record = tables
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or(StoreError::UnknownAlert(alert_id))?;

        if record.alert.resolved {
            return Err(StoreError::AlreadyResolved(alert_id));
        }
        record.alert.resolved = true;
        record.alert.resolved_at = Some(at);
        Ok(record.clone())
    }
}
