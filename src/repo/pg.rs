#![cfg(feature = "db")]
//! Postgres store engine.
//!
//! Schema lives in `migrations/`. Ids come from `BIGSERIAL` columns and write timestamps
//! from `DEFAULT now()`, so ordering is decided by the database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use super::{AlertResolution, StoreError, StoreResult, TimeSeriesStore};
use crate::config::DbConfig;
use crate::domain::{
    Alert, AlertCategory, AlertRecord, CoolingBreakdown, DeviceId, DeviceType, EnvironmentSample, GeoPoint,
    ReadingRecord, SampleMetadata, Severity, ThermalReading,
};

#[derive(Debug, Clone, sqlx::FromRow)]
struct ReadingRow {
    id: i64,
    recorded_at: DateTime<Utc>,
    captured_at: DateTime<Utc>,
    device_id: String,
    device_type: String,
    location_lat: Option<f64>,
    location_lng: Option<f64>,
    ambient_temp_c: f64,
    solar_irradiance_wm2: f64,
    humidity_percent: f64,
    wind_speed_ms: f64,
    time_of_day_h: f64,
    baseline_panel_temp_c: f64,
    panel_temp_c: f64,
    inverter_temp_c: f64,
    battery_temp_c: f64,
    efficiency: f64,
    terracotta_cooling_c: f64,
    air_cooling_c: f64,
    radiative_cooling_c: f64,
}

impl TryFrom<ReadingRow> for ReadingRecord {
    type Error = StoreError;

    fn try_from(row: ReadingRow) -> StoreResult<Self> {
        let device_type = parse_column::<DeviceType>("device_type", &row.device_type)?;
        let location = match (row.location_lat, row.location_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        };

        Ok(ReadingRecord {
            id: row.id,
            recorded_at: row.recorded_at,
            metadata: SampleMetadata {
                device_id: DeviceId(row.device_id),
                device_type,
                location,
            },
            reading: ThermalReading {
                sample: EnvironmentSample::new(
                    row.ambient_temp_c,
                    row.solar_irradiance_wm2,
                    row.humidity_percent,
                    row.wind_speed_ms,
                    row.time_of_day_h,
                ),
                baseline_panel_temp_c: row.baseline_panel_temp_c,
                panel_temp_c: row.panel_temp_c,
                inverter_temp_c: row.inverter_temp_c,
                battery_temp_c: row.battery_temp_c,
                efficiency: row.efficiency,
                cooling: CoolingBreakdown {
                    terracotta_c: row.terracotta_cooling_c,
                    air_c: row.air_cooling_c,
                    radiative_c: row.radiative_cooling_c,
                },
                captured_at: row.captured_at,
            },
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct AlertRow {
    id: i64,
    raised_at: DateTime<Utc>,
    device_id: String,
    device_type: String,
    category: String,
    severity: String,
    message: String,
    value: f64,
    limit_value: f64,
    resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<AlertRow> for AlertRecord {
    type Error = StoreError;

    fn try_from(row: AlertRow) -> StoreResult<Self> {
        Ok(AlertRecord {
            id: row.id,
            raised_at: row.raised_at,
            device_id: DeviceId(row.device_id),
            alert: Alert {
                device_type: parse_column("device_type", &row.device_type)?,
                category: parse_column::<AlertCategory>("category", &row.category)?,
                severity: parse_column::<Severity>("severity", &row.severity)?,
                message: row.message,
                value: row.value,
                limit: row.limit_value,
                resolved: row.resolved,
                resolved_at: row.resolved_at,
            },
        })
    }
}

fn parse_column<T: FromStr>(column: &str, value: &str) -> StoreResult<T> {
    T::from_str(value).map_err(|_| StoreError::Corrupt(format!("unexpected {column} value '{value}'")))
}

const ALERT_COLUMNS: &str = "id, raised_at, device_id, device_type, category, severity, message, value, \
                             limit_value, resolved, resolved_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect, retrying with exponential backoff, and apply pending migrations
    pub async fn connect(cfg: &DbConfig) -> anyhow::Result<Self> {
        let pool = Self::connect_with_retry(cfg).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Thermal store connected and migrated");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn connect_with_retry(cfg: &DbConfig) -> anyhow::Result<PgPool> {
        let max_attempts = cfg.connect_attempts.max(1);
        let mut attempt = 0;
        let mut delay = Duration::from_secs(1);

        loop {
            attempt += 1;
            let result = PgPoolOptions::new()
                .max_connections(cfg.max_connections)
                .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
                .connect(&cfg.url)
                .await;

            match result {
                Ok(pool) => return Ok(pool),
                Err(e) if attempt >= max_attempts => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("Failed to connect to database after {max_attempts} attempts")));
                }
                Err(e) => {
                    warn!(
                        "Database connection attempt {}/{} failed: {}. Retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

#[async_trait]
impl TimeSeriesStore for PgStore {
    async fn append_reading(
        &self,
        reading: &ThermalReading,
        metadata: &SampleMetadata,
    ) -> StoreResult<ReadingRecord> {
        let s = &reading.sample;
        let row = sqlx::query_as::<_, ReadingRow>(
            r#"
            INSERT INTO thermal_readings (
                captured_at, device_id, device_type, location_lat, location_lng,
                ambient_temp_c, solar_irradiance_wm2, humidity_percent, wind_speed_ms, time_of_day_h,
                baseline_panel_temp_c, panel_temp_c, inverter_temp_c, battery_temp_c, efficiency,
                terracotta_cooling_c, air_cooling_c, radiative_cooling_c
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(reading.captured_at)
        .bind(metadata.device_id.as_str())
        .bind(metadata.device_type.as_ref())
        .bind(metadata.location.map(|p| p.lat))
        .bind(metadata.location.map(|p| p.lng))
        .bind(s.ambient_temp_c)
        .bind(s.solar_irradiance_wm2)
        .bind(s.humidity_percent)
        .bind(s.wind_speed_ms)
        .bind(s.time_of_day_h)
        .bind(reading.baseline_panel_temp_c)
        .bind(reading.panel_temp_c)
        .bind(reading.inverter_temp_c)
        .bind(reading.battery_temp_c)
        .bind(reading.efficiency)
        .bind(reading.cooling.terracotta_c)
        .bind(reading.cooling.air_c)
        .bind(reading.cooling.radiative_c)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn append_alerts(&self, device_id: &DeviceId, alerts: &[Alert]) -> StoreResult<Vec<AlertRecord>> {
        let sql = format!(
            "INSERT INTO thermal_alerts (device_id, device_type, category, severity, message, value, limit_value) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {ALERT_COLUMNS}"
        );

        // One row per alert, committed together
        let mut tx = self.pool.begin().await?;
        let mut records = Vec::with_capacity(alerts.len());
        for alert in alerts {
            let row = sqlx::query_as::<_, AlertRow>(&sql)
                .bind(device_id.as_str())
                .bind(alert.device_type.as_ref())
                .bind(alert.category.as_ref())
                .bind(alert.severity.as_ref())
                .bind(&alert.message)
                .bind(alert.value)
                .bind(alert.limit)
                .fetch_one(&mut *tx)
                .await?;
            records.push(row.try_into()?);
        }
        tx.commit().await?;
        Ok(records)
    }

    async fn latest_reading(&self, device_id: &DeviceId) -> StoreResult<Option<ReadingRecord>> {
        let row = sqlx::query_as::<_, ReadingRow>(
            r#"
            SELECT *
            FROM thermal_readings
            WHERE device_id = $1
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(device_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(ReadingRecord::try_from).transpose()
    }

    async fn unresolved_alerts(&self, device_id: &DeviceId) -> StoreResult<Vec<AlertRecord>> {
        let sql = format!(
            "SELECT {ALERT_COLUMNS} FROM thermal_alerts WHERE device_id = $1 AND NOT resolved ORDER BY id ASC"
        );
        let rows = sqlx::query_as::<_, AlertRow>(&sql)
            .bind(device_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AlertRecord::try_from).collect()
    }
}

#[async_trait]
impl AlertResolution for PgStore {
    async fn resolve_alert(&self, alert_id: i64, at: DateTime<Utc>) -> StoreResult<AlertRecord> {
        let sql = format!(
            "UPDATE thermal_alerts SET resolved = TRUE, resolved_at = $2 \
             WHERE id = $1 AND NOT resolved RETURNING {ALERT_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, AlertRow>(&sql)
            .bind(alert_id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = updated {
            return row.try_into();
        }

        let exists: Option<(i64,)> = sqlx::query_as("SELECT id FROM thermal_alerts WHERE id = $1")
            .bind(alert_id)
            .fetch_optional(&self.pool)
            .await?;

        match exists {
            Some(_) => Err(StoreError::AlreadyResolved(alert_id)),
            None => Err(StoreError::UnknownAlert(alert_id)),
        }
    }
}
