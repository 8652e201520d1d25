//! # Daily Cycle Simulation
//!
//! Sweeps the load-linked cooling model across a synthetic day sampled on a fixed grid
//! (half-hour by default):
//!
//! - Ambient: `min + (max − min)·sin(π(h−6)/12)`, clamped to `[min, max]`
//! - Solar load: `max(0, peak·sin(π(h−6)/12))`
//! - Humidity: `mean + amplitude·sin(πh/24)` (humid at night)
//! - Wind: `mean + amplitude·sin(π(h−12)/12)` (afternoon peak)
//!
//! Steps whose solar load does not exceed the productive threshold are skipped. The
//! retained steps are folded into a [`DailySummary`] weighted by the step length.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;
use validator::{Validate, ValidationError};

use super::cooling::{CoolingConditions, CoolingResult, CoolingSimulator};

/// Shape of the synthetic diurnal profile
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_profile"))]
pub struct DiurnalProfileConfig {
    /// Sampling interval; must divide the day evenly
    #[validate(range(min = 1, max = 720))]
    pub step_minutes: u32,
    /// Night-time ambient floor (°C)
    pub min_temp_c: f64,
    /// Midday ambient ceiling (°C)
    pub max_temp_c: f64,
    /// Solar thermal load at solar noon (kW)
    #[validate(range(min = 0.0))]
    pub peak_solar_load_kw: f64,
    pub humidity_mean_percent: f64,
    pub humidity_amplitude_percent: f64,
    pub wind_mean_ms: f64,
    pub wind_amplitude_ms: f64,
    /// Steps at or below this load are not productive (kW)
    #[validate(range(min = 0.0))]
    pub productive_threshold_kw: f64,
    /// Date used when the caller gives none
    pub default_date: NaiveDate,
}

impl Default for DiurnalProfileConfig {
    fn default() -> Self {
        Self {
            step_minutes: 30,
            min_temp_c: 22.0,
            max_temp_c: 42.0,
            peak_solar_load_kw: 80.0,
            humidity_mean_percent: 65.0,
            humidity_amplitude_percent: 15.0,
            wind_mean_ms: 3.0,
            wind_amplitude_ms: 5.0,
            productive_threshold_kw: 5.0,
            default_date: NaiveDate::from_ymd_opt(2025, 10, 5).unwrap_or_default(),
        }
    }
}

fn validate_profile(profile: &DiurnalProfileConfig) -> Result<(), ValidationError> {
    if profile.step_minutes == 0 || MINUTES_PER_DAY % profile.step_minutes != 0 {
        let mut err = ValidationError::new("step_does_not_divide_day");
        err.add_param("step_minutes".into(), &profile.step_minutes);
        return Err(err);
    }
    Ok(())
}

const MINUTES_PER_DAY: u32 = 24 * 60;

impl DiurnalProfileConfig {
    /// Step length in hours
    pub fn step_hours(&self) -> f64 {
        f64::from(self.step_minutes.max(1)) / 60.0
    }

    pub fn steps_per_day(&self) -> u32 {
        MINUTES_PER_DAY / self.step_minutes.max(1)
    }

    pub fn step_at(&self, hour: f64) -> ProfileStep {
        let day_phase = (PI * (hour - 6.0) / 12.0).sin();
        let span = self.max_temp_c - self.min_temp_c;

        ProfileStep {
            hour,
            ambient_temp_c: (self.min_temp_c + span * day_phase).clamp(self.min_temp_c, self.max_temp_c),
            solar_load_kw: (self.peak_solar_load_kw * day_phase).max(0.0),
            humidity_percent: self.humidity_mean_percent + self.humidity_amplitude_percent * (PI * hour / 24.0).sin(),
            wind_speed_ms: self.wind_mean_ms + self.wind_amplitude_ms * (PI * (hour - 12.0) / 12.0).sin(),
        }
    }
}

/// Conditions at one grid point of the synthetic day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileStep {
    pub hour: f64,
    pub ambient_temp_c: f64,
    pub solar_load_kw: f64,
    pub humidity_percent: f64,
    pub wind_speed_ms: f64,
}

impl ProfileStep {
    pub fn conditions(&self) -> CoolingConditions {
        CoolingConditions {
            ambient_temp_c: self.ambient_temp_c,
            solar_load_kw: self.solar_load_kw,
            humidity_percent: self.humidity_percent,
            wind_speed_ms: self.wind_speed_ms,
        }
    }
}

/// Finite iterator over the grid points of one day
#[derive(Debug, Clone)]
pub struct DiurnalProfile {
    config: DiurnalProfileConfig,
    index: u32,
}

impl DiurnalProfile {
    pub fn new(config: DiurnalProfileConfig) -> Self {
        Self { config, index: 0 }
    }
}

impl Iterator for DiurnalProfile {
    type Item = ProfileStep;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.config.steps_per_day() {
            return None;
        }
        let hour = f64::from(self.index) * self.config.step_hours();
        self.index += 1;
        Some(self.config.step_at(hour))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.config.steps_per_day().saturating_sub(self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DiurnalProfile {}

/// One productive step of the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyResult {
    pub hour: f64,
    pub ambient_temp: f64,
    pub solar_load: f64,
    #[serde(flatten)]
    pub result: CoolingResult,
}

/// Interval-weighted totals over the productive steps.
///
/// Means are `None` when no step was productive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub total_energy_gain_kwh: f64,
    pub total_water_saved_liters: f64,
    pub average_temp_reduction: Option<f64>,
    /// Percentage points
    pub average_efficiency_gain: Option<f64>,
    pub estimated_revenue_gain: f64,
    pub productive_steps: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyCycleReport {
    pub date: NaiveDate,
    pub hourly_results: Vec<HourlyResult>,
    pub daily_summary: DailySummary,
}

pub struct DailyCycleSimulator {
    profile: DiurnalProfileConfig,
    cooling: CoolingSimulator,
}

impl DailyCycleSimulator {
    pub fn new(profile: DiurnalProfileConfig, cooling: CoolingSimulator) -> Self {
        Self { profile, cooling }
    }

    pub fn profile(&self) -> &DiurnalProfileConfig {
        &self.profile
    }

    /// Fresh iterator over the whole day, productive or not
    pub fn steps(&self) -> DiurnalProfile {
        DiurnalProfile::new(self.profile.clone())
    }

    /// Lazily evaluated productive steps
    pub fn productive_results(&self) -> impl Iterator<Item = HourlyResult> + '_ {
        let threshold = self.profile.productive_threshold_kw;
        self.steps()
            .filter(move |step| step.solar_load_kw > threshold)
            .map(move |step| HourlyResult {
                hour: step.hour,
                ambient_temp: step.ambient_temp_c,
                solar_load: step.solar_load_kw,
                result: self.cooling.simulate(&step.conditions()),
            })
    }

    pub fn simulate_day(&self, date: NaiveDate) -> DailyCycleReport {
        let weight = self.profile.step_hours();
        let hourly_results: Vec<HourlyResult> = self.productive_results().collect();

        let mut energy_kwh = 0.0;
        let mut water_l = 0.0;
        let mut reduction_sum = 0.0;
        let mut gain_sum = 0.0;
        for step in &hourly_results {
            energy_kwh += step.result.power_gain_kw * weight;
            water_l += step.result.water_saved * weight;
            reduction_sum += step.result.temp_reduction;
            gain_sum += step.result.efficiency_gain;
        }

        let n = hourly_results.len();
        let mean = |sum: f64| (n > 0).then(|| sum / n as f64);

        let daily_summary = DailySummary {
            total_energy_gain_kwh: energy_kwh,
            total_water_saved_liters: water_l,
            average_temp_reduction: mean(reduction_sum),
            average_efficiency_gain: mean(gain_sum),
            estimated_revenue_gain: energy_kwh * self.cooling.tariff_per_kwh(),
            productive_steps: n,
        };

        debug!(
            %date,
            productive_steps = n,
            energy_kwh = daily_summary.total_energy_gain_kwh,
            water_l = daily_summary.total_water_saved_liters,
            "Simulated daily cycle"
        );

        DailyCycleReport {
            date,
            hourly_results,
            daily_summary,
        }
    }
}

impl Default for DailyCycleSimulator {
    fn default() -> Self {
        Self::new(DiurnalProfileConfig::default(), CoolingSimulator::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 5).unwrap()
    }

    #[test]
    fn test_profile_has_48_half_hour_steps() {
        let sim = DailyCycleSimulator::default();
        let steps: Vec<_> = sim.steps().collect();
        assert_eq!(steps.len(), 48);
        assert_eq!(steps[0].hour, 0.0);
        assert_eq!(steps[47].hour, 23.5);
        assert_eq!(sim.steps().len(), 48);
    }

    #[test]
    fn test_step_must_divide_the_day() {
        let mut cfg = DiurnalProfileConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.step_minutes = 15;
        assert!(cfg.validate().is_ok());
        cfg.step_minutes = 7;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_profile_shape() {
        let cfg = DiurnalProfileConfig::default();
        let noon = cfg.step_at(12.0);
        assert!((noon.ambient_temp_c - 42.0).abs() < 1e-9);
        assert!((noon.solar_load_kw - 80.0).abs() < 1e-9);

        let midnight = cfg.step_at(0.0);
        assert_eq!(midnight.ambient_temp_c, 22.0);
        assert_eq!(midnight.solar_load_kw, 0.0);

        // Wind peaks in the afternoon
        assert!(cfg.step_at(18.0).wind_speed_ms > cfg.step_at(6.0).wind_speed_ms);
    }

    #[test]
    fn test_only_productive_steps_are_kept() {
        let sim = DailyCycleSimulator::default();
        let report = sim.simulate_day(date());
        assert!(!report.hourly_results.is_empty());
        assert!(report.hourly_results.iter().all(|r| r.solar_load > 5.0));
        assert!(report.hourly_results.iter().all(|r| r.hour > 6.0 && r.hour < 18.0));
        assert_eq!(report.daily_summary.productive_steps, report.hourly_results.len());
    }

    #[test]
    fn test_energy_is_interval_weighted() {
        let sim = DailyCycleSimulator::default();
        let report = sim.simulate_day(date());
        let expected: f64 = report.hourly_results.iter().map(|r| r.result.power_gain_kw * 0.5).sum();
        assert!((report.daily_summary.total_energy_gain_kwh - expected).abs() < 1e-9);

        let water: f64 = report.hourly_results.iter().map(|r| r.result.water_saved * 0.5).sum();
        assert!((report.daily_summary.total_water_saved_liters - water).abs() < 1e-9);
        assert!((report.daily_summary.estimated_revenue_gain - expected * 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_simulation_is_restartable() {
        let sim = DailyCycleSimulator::default();
        assert_eq!(sim.simulate_day(date()), sim.simulate_day(date()));
    }

    #[test]
    fn test_dark_day_has_null_means() {
        let profile = DiurnalProfileConfig {
            peak_solar_load_kw: 4.0,
            ..Default::default()
        };
        let sim = DailyCycleSimulator::new(profile, CoolingSimulator::default());
        let report = sim.simulate_day(date());

        assert!(report.hourly_results.is_empty());
        assert_eq!(report.daily_summary.total_energy_gain_kwh, 0.0);
        assert_eq!(report.daily_summary.average_temp_reduction, None);
        assert_eq!(report.daily_summary.average_efficiency_gain, None);
    }

    #[test]
    fn test_report_serializes_with_flattened_results() {
        let report = DailyCycleSimulator::default().simulate_day(date());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["date"], "2025-10-05");
        let first = &json["hourly_results"][0];
        assert!(first.get("hour").is_some());
        assert!(first.get("solar_load").is_some());
        assert!(first.get("baseline_temp").is_some());
        assert!(first.get("revenue_gain_daily").is_some());
        assert!(json["daily_summary"].get("total_energy_gain_kwh").is_some());
    }
}
