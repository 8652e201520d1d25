//! # Time-Series Persistence
//!
//! Readings and alerts are append-only. Each record receives a monotonically
//! increasing id and a write-time timestamp from the engine. The only mutation is the
//! operator-driven `resolved` transition on an alert, exposed through
//! [`AlertResolution`] rather than the main store trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, StoreBackend};
use crate::domain::{Alert, AlertRecord, DeviceId, ReadingRecord, SampleMetadata, ThermalReading};

pub mod memory;
pub mod retry;

#[cfg(feature = "db")]
pub mod pg;

pub use memory::MemoryStore;
pub use retry::{RetryPolicy, RetryingStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Alert {0} not found")]
    UnknownAlert(i64),

    #[error("Alert {0} is already resolved")]
    AlreadyResolved(i64),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[cfg(feature = "db")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            #[cfg(feature = "db")]
            StoreError::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            _ => false,
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable append-only storage of thermal readings and alerts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    async fn append_reading(
        &self,
        reading: &ThermalReading,
        metadata: &SampleMetadata,
    ) -> StoreResult<ReadingRecord>;

    async fn append_alerts(&self, device_id: &DeviceId, alerts: &[Alert]) -> StoreResult<Vec<AlertRecord>>;

    async fn latest_reading(&self, device_id: &DeviceId) -> StoreResult<Option<ReadingRecord>>;

    /// Unresolved alerts of a device in insertion order
    async fn unresolved_alerts(&self, device_id: &DeviceId) -> StoreResult<Vec<AlertRecord>>;
}

/// Out-of-band operator workflow that closes an alert
#[async_trait]
pub trait AlertResolution: Send + Sync {
    async fn resolve_alert(&self, alert_id: i64, at: DateTime<Utc>) -> StoreResult<AlertRecord>;
}

/// Store handles shared by the controller and the HTTP layer
#[derive(Clone)]
pub struct Repositories {
    pub series: Arc<dyn TimeSeriesStore>,
    pub resolution: Arc<dyn AlertResolution>,
}

impl Repositories {
    pub async fn new(cfg: &Config) -> anyhow::Result<Self> {
        match cfg.store.backend {
            StoreBackend::Memory => Ok(Self::in_memory(cfg.store.retry.clone())),
            #[cfg(feature = "db")]
            StoreBackend::Postgres => {
                let store = Arc::new(pg::PgStore::connect(&cfg.db).await?);
                Ok(Self {
                    series: Arc::new(RetryingStore::new(store.clone(), cfg.store.retry.clone())),
                    resolution: store,
                })
            }
            #[cfg(not(feature = "db"))]
            StoreBackend::Postgres => {
                anyhow::bail!("store.backend = \"postgres\" requires building with the `db` feature")
            }
        }
    }

    pub fn in_memory(retry: RetryPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            series: Arc::new(RetryingStore::new(store.clone(), retry)),
            resolution: store,
        }
    }
}
