//! Continuous monitoring loop.
//!
//! One evaluate-then-persist cycle per tick. The stop token is observed while waiting for
//! the next tick, so a cycle in progress always completes before the loop exits.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{Observation, ThermalController};
use crate::domain::{SampleMetadata, Severity};
use crate::simulation::SyntheticWeather;

#[derive(Debug, Clone, Serialize)]
pub struct TickOutcome {
    pub tick: u64,
    pub local_hour: f64,
    pub observation: Observation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonitorSummary {
    pub ticks: u64,
    pub alerts_raised: u64,
    pub critical_alerts: u64,
    pub persistence_failures: u64,
}

pub struct ThermalMonitor {
    controller: Arc<ThermalController>,
    weather: SyntheticWeather,
    metadata: SampleMetadata,
    utc_offset: FixedOffset,
    max_ticks: Option<u64>,
    summary: MonitorSummary,
}

impl ThermalMonitor {
    pub fn new(
        controller: Arc<ThermalController>,
        weather: SyntheticWeather,
        metadata: SampleMetadata,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            controller,
            weather,
            metadata,
            utc_offset,
            max_ticks: None,
            summary: MonitorSummary::default(),
        }
    }

    pub fn with_max_ticks(mut self, max_ticks: Option<u64>) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    pub fn summary(&self) -> &MonitorSummary {
        &self.summary
    }

    /// Site-local hour of day with fractional minutes
    pub fn local_hour(&self, now: DateTime<Utc>) -> f64 {
        let local = now.with_timezone(&self.utc_offset);
        f64::from(local.hour()) + f64::from(local.minute()) / 60.0
    }

    /// Run a single cycle for the given wall-clock instant
    pub async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        let local_hour = self.local_hour(now);
        let sample = self.weather.sample_at(local_hour);
        let observation = self.controller.observe(&sample, &self.metadata).await;

        self.summary.ticks += 1;
        self.summary.alerts_raised += observation.alerts.len() as u64;
        self.summary.critical_alerts += observation
            .alerts
            .iter()
            .filter(|a| a.severity >= Severity::Critical)
            .count() as u64;
        if !observation.persisted {
            self.summary.persistence_failures += 1;
        }

        for alert in &observation.alerts {
            warn!(
                device_id = %self.metadata.device_id,
                device_type = %alert.device_type,
                severity = %alert.severity,
                "{}",
                alert.message
            );
        }
        info!(
            device_id = %self.metadata.device_id,
            tick = self.summary.ticks,
            local_hour,
            ambient_temp_c = observation.reading.sample.ambient_temp_c,
            irradiance_wm2 = observation.reading.sample.solar_irradiance_wm2,
            panel_temp_c = observation.reading.panel_temp_c,
            efficiency = observation.reading.efficiency,
            persisted = observation.persisted,
            "monitor tick"
        );

        TickOutcome {
            tick: self.summary.ticks,
            local_hour,
            observation,
        }
    }

    /// Tick every `period` until `stop` is cancelled or the tick budget is spent
    pub async fn run(&mut self, period: Duration, stop: CancellationToken) -> MonitorSummary {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(device_id = %self.metadata.device_id, ?period, max_ticks = ?self.max_ticks, "Thermal monitor started");

        loop {
            if self.max_ticks.is_some_and(|max| self.summary.ticks >= max) {
                break;
            }

            tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                _ = interval.tick() => {}
            }

            self.tick(Utc::now()).await;
        }

        info!(
            ticks = self.summary.ticks,
            alerts = self.summary.alerts_raised,
            persistence_failures = self.summary.persistence_failures,
            "Thermal monitor stopped"
        );
        self.summary.clone()
    }
}
