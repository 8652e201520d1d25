//! # Component Temperature Model
//!
//! Maps one [`EnvironmentSample`] to panel, inverter and battery temperatures.
//!
//! ## Panel
//!
//! The uncooled panel temperature follows the NOCT relation
//!
//! T_panel = T_ambient + ((NOCT − 20) / 800) × G × (1 − η_ref) / (1 + k_wind × v)
//!
//! Where:
//! - G = plane-of-array irradiance (W/m²)
//! - η_ref = reference panel efficiency
//! - v = wind speed (m/s)
//!
//! The waterless cooling stack then pulls the panel back toward ambient, never below it.
//!
//! ## Balance of system
//!
//! - Inverter: ambient + offset × load factor, load factor = min(G / 1000, 1)
//! - Battery: ambient + base offset + smaller load-scaled offset
//!
//! Inputs outside their physical range are clamped, so evaluation cannot fail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::cooling::CoolingStack;
use super::efficiency::EfficiencyCurve;
use crate::domain::{EnvironmentSample, ThermalReading};

/// Model constants for component temperatures
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PhysicalModelConfig {
    /// Nominal Operating Cell Temperature (°C)
    #[validate(range(min = 20.0, max = 80.0))]
    pub noct_c: f64,
    /// Panel efficiency at reference conditions; the rest of the irradiance becomes heat
    #[validate(range(min = 0.0, max = 1.0))]
    pub panel_efficiency_ref: f64,
    /// Wind cooling factor per m/s
    #[validate(range(min = 0.0))]
    pub wind_coeff: f64,
    /// Irradiance corresponding to full inverter load (W/m²)
    #[validate(range(min = 1.0))]
    pub full_load_irradiance_wm2: f64,
    /// Inverter rise above ambient at full load (°C)
    pub inverter_offset_c: f64,
    /// Battery rise above ambient at idle (°C)
    pub battery_base_offset_c: f64,
    /// Additional battery rise at full load (°C)
    pub battery_load_offset_c: f64,
    /// Relative efficiency curve applied to the cooled panel temperature
    pub efficiency: EfficiencyCurve,
}

impl Default for PhysicalModelConfig {
    fn default() -> Self {
        Self {
            noct_c: 45.0,
            panel_efficiency_ref: 0.20,
            wind_coeff: 0.05,
            full_load_irradiance_wm2: 1000.0,
            inverter_offset_c: 12.0,
            battery_base_offset_c: 3.0,
            battery_load_offset_c: 2.0,
            efficiency: EfficiencyCurve::relative(),
        }
    }
}

/// Pure, total mapping from site conditions to component temperatures
#[derive(Debug, Clone)]
pub struct PhysicalModel {
    config: PhysicalModelConfig,
    cooling: CoolingStack,
}

impl PhysicalModel {
    pub fn new(config: PhysicalModelConfig, cooling: CoolingStack) -> Self {
        Self { config, cooling }
    }

    pub fn config(&self) -> &PhysicalModelConfig {
        &self.config
    }

    /// Evaluate a sample, stamping the reading with the current time
    pub fn evaluate(&self, sample: &EnvironmentSample) -> ThermalReading {
        self.evaluate_at(sample, Utc::now())
    }

    /// Evaluate a sample with an explicit capture timestamp
    pub fn evaluate_at(&self, sample: &EnvironmentSample, captured_at: DateTime<Utc>) -> ThermalReading {
        let s = sample.clamped();

        let baseline = self.baseline_panel_temp(&s);
        let (panel_temp, cooling) =
            self.cooling
                .apply(baseline, s.ambient_temp_c, s.humidity_percent, s.wind_speed_ms);

        let load = self.load_factor(&s);
        let inverter_temp = s.ambient_temp_c + self.config.inverter_offset_c * load;
        let battery_temp =
            s.ambient_temp_c + self.config.battery_base_offset_c + self.config.battery_load_offset_c * load;

        ThermalReading {
            sample: s,
            baseline_panel_temp_c: baseline,
            panel_temp_c: panel_temp,
            inverter_temp_c: inverter_temp,
            battery_temp_c: battery_temp,
            efficiency: self.config.efficiency.at(panel_temp),
            cooling,
            captured_at,
        }
    }

    /// Uncooled panel temperature from the NOCT relation
    pub fn baseline_panel_temp(&self, sample: &EnvironmentSample) -> f64 {
        let c = &self.config;
        let wind_factor = c.wind_coeff * sample.wind_speed_ms;
        let rise = ((c.noct_c - 20.0) / 800.0) * sample.solar_irradiance_wm2 * (1.0 - c.panel_efficiency_ref)
            / (1.0 + wind_factor);
        sample.ambient_temp_c + rise.max(0.0)
    }

    /// Inverter load estimated from irradiance (0-1)
    pub fn load_factor(&self, sample: &EnvironmentSample) -> f64 {
        (sample.solar_irradiance_wm2 / self.config.full_load_irradiance_wm2).clamp(0.0, 1.0)
    }
}

impl Default for PhysicalModel {
    fn default() -> Self {
        Self::new(PhysicalModelConfig::default(), CoolingStack::default())
    }
}
